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

//! Configuration: system catalog and user settings
//!
//! # Components
//!
//! - [`system`]: static per-system profiles (core, state format version,
//!   firmware, controllers, default variables)
//! - [`settings`]: read-only settings trait plus TOML and in-memory
//!   implementations

pub mod settings;
pub mod system;

pub use settings::{key_fragment, FileSettings, MemorySettings, Settings, AUTO_SAVE_ENABLED_KEY};
pub use system::{profile, ControllerConfig, SystemId, SystemProfile};
