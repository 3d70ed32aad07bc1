// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Save data: snapshots, previews, and battery SRAM
//!
//! # Components
//!
//! - [`state`]: the snapshot data model and its metadata sidecar
//! - [`store`]: storage trait seams and the filesystem implementations
//! - [`manager`]: the gated operations a session exposes (slots, auto save,
//!   quick save, SRAM) and the restore retry procedure

pub mod manager;
pub mod state;
pub mod store;

#[cfg(test)]
mod tests;

pub use manager::{auto_save_enabled, SaveStateManager, MAX_SLOTS};
pub use state::{SaveState, SlotInfo, StateMetadata};
pub use store::{
    FsPreviewStore, FsSramStore, FsStateStore, PreviewStore, SaveStores, SramStore, StateStore,
};
