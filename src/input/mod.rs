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

//! Input handling: devices, bindings, ports, shortcuts, and routing
//!
//! Raw key and motion events from the platform layer enter here and leave as
//! core-directed commands on the right player port, with menu keys and chord
//! shortcuts filtered out along the way.
//!
//! # Architecture
//!
//! - [`device`]: device descriptors, hot-plug classification, raw events
//! - [`keys`]: the platform-neutral key/axis vocabulary
//! - [`port_mapper`]: stable device to player-port assignment
//! - [`bindings`]: per-device raw-to-logical key tables
//! - [`shortcut`]: chord detection on the first controller
//! - [`router`]: the sequential worker tying it all together
//!
//! Everything upstream of [`router`] is a pure data structure; the router is
//! the only component with a thread. It folds events, hot-plug notifications,
//! and configuration updates in arrival order, so an event queued before a
//! port or binding change is always resolved against the older snapshot.

pub mod bindings;
pub mod device;
pub mod keys;
pub mod port_mapper;
pub mod router;
pub mod shortcut;

#[cfg(test)]
mod tests;

pub use bindings::BindingSnapshot;
pub use device::{DeviceId, DeviceSources, InputDevice, KeyEvent, MotionEvent};
pub use keys::{Axis, GamepadKey, KeyAction, MotionSource};
pub use port_mapper::{PortMapper, PortMapping};
pub use router::{InputRouter, RouterInput, RouterSender};
pub use shortcut::{ShortcutAction, ShortcutDetector, ShortcutSpec};
