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

//! The emulation core seam and the service that owns it
//!
//! # Components
//!
//! - [`handle`]: the [`RetroCore`](handle::RetroCore) trait the platform
//!   layer implements, plus the fault and event types it reports through
//! - [`service`]: the single-owner worker thread that serializes all core
//!   access, and the cloneable [`CoreHandle`](service::CoreHandle) other
//!   components talk to it with
//! - [`variables`]: core configuration variables resolved from per-system
//!   defaults and user settings

pub mod handle;
pub mod service;
pub mod variables;

#[cfg(test)]
pub mod testing;

pub use handle::{CoreEvent, CoreFault, GameFiles, RetroCore, VirtualFile};
pub use service::{CoreHandle, CoreService, DiskInfo, StartPlan};
pub use variables::{variable_pref_key, variables_for_core, CoreVariable};
