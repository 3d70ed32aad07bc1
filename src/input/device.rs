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

//! Input device descriptors and raw event types
//!
//! The platform layer observes controllers coming and going (hot-plug) and
//! describes each one with an [`InputDevice`]. Classification into
//! supported / enabled-by-default devices happens here; which devices are
//! actually enabled is ultimately a settings question answered per device.

use std::collections::HashSet;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::settings::key_fragment;
use crate::input::keys::{Axis, GamepadKey, KeyAction};

/// Device names that must never be treated as gamepads
///
/// These show up with gamepad source bits on some phones (search remotes,
/// fingerprint readers) but produce garbage input.
const BLACKLISTED_DEVICE_NAMES: &[&str] = &["virtual-search", "uinput-fpc"];

/// Settings key holding the user's enable/disable choice for a device
///
/// Absent means [`InputDevice::is_enabled_by_default`] decides.
pub fn device_enabled_pref_key(device_name: &str) -> String {
    format!("input_device_enabled_{}", key_fragment(device_name))
}

/// Stable identifier the platform layer assigns to a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub i32);

bitflags! {
    /// Source classes a device advertises
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceSources: u8 {
        const GAMEPAD = 1 << 0;
        const JOYSTICK = 1 << 1;
        const DPAD = 1 << 2;
        const KEYBOARD = 1 << 3;
    }
}

/// Description of a connected input device
#[derive(Debug, Clone)]
pub struct InputDevice {
    /// Platform-assigned id, stable while the device stays connected
    pub id: DeviceId,

    /// Human-readable device name
    pub name: String,

    /// Player slot the device itself declares, 0 when undeclared
    pub controller_number: u8,

    /// Advertised source classes
    pub sources: DeviceSources,

    /// Keys the device reports as present
    pub keys: HashSet<GamepadKey>,

    /// Virtual devices are synthesized by the OS, not physical pads
    pub is_virtual: bool,
}

impl InputDevice {
    /// Check whether the device advertises every key in `required`
    pub fn has_keys(&self, required: &[GamepadKey]) -> bool {
        required.iter().all(|key| self.keys.contains(key))
    }

    /// Whether this device can drive a game at all
    ///
    /// Requires a gamepad source class, the four face buttons, a declared
    /// player slot, and a physical device.
    pub fn is_supported(&self) -> bool {
        self.sources.contains(DeviceSources::GAMEPAD)
            && self.has_keys(&[GamepadKey::A, GamepadKey::B, GamepadKey::X, GamepadKey::Y])
            && !self.is_virtual
            && self.controller_number > 0
    }

    /// Whether the device should be enabled without the user opting in
    ///
    /// On top of [`InputDevice::is_supported`] this requires Start and
    /// Select (menus are unusable without them) and a name that is not
    /// blacklisted.
    pub fn is_enabled_by_default(&self) -> bool {
        self.is_supported()
            && self.has_keys(&[GamepadKey::Start, GamepadKey::Select])
            && !BLACKLISTED_DEVICE_NAMES.contains(&self.name.as_str())
    }
}

/// Raw key transition reported by the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub device: DeviceId,
    pub action: KeyAction,
    pub key: GamepadKey,
    /// Auto-repeat counter; only the initial press (0) is routed
    pub repeat: u32,
}

impl KeyEvent {
    /// First press of a key
    pub fn down(device: DeviceId, key: GamepadKey) -> Self {
        KeyEvent {
            device,
            action: KeyAction::Down,
            key,
            repeat: 0,
        }
    }

    /// Release of a key
    pub fn up(device: DeviceId, key: GamepadKey) -> Self {
        KeyEvent {
            device,
            action: KeyAction::Up,
            key,
            repeat: 0,
        }
    }
}

/// Snapshot of axis positions from one motion report
///
/// Axes not present in the report read as 0.0, matching how the platform
/// APIs behave for axes a device does not have.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionEvent {
    pub device: DeviceId,
    axes: Vec<(Axis, f32)>,
}

impl MotionEvent {
    /// Build a motion event from explicit axis readings
    pub fn new(device: DeviceId, axes: &[(Axis, f32)]) -> Self {
        MotionEvent {
            device,
            axes: axes.to_vec(),
        }
    }

    /// Current position of `axis`, 0.0 when the report does not include it
    pub fn axis_value(&self, axis: Axis) -> f32 {
        self.axes
            .iter()
            .find(|(a, _)| *a == axis)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}
