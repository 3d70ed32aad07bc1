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

//! Per-device key binding tables
//!
//! A [`BindingSnapshot`] is an immutable view of every connected device's
//! raw-to-logical key table. Snapshots are rebuilt whenever the device set
//! or the user's overrides change and travel through the router queue, so
//! each event is resolved against the table that was current when it was
//! queued.
//!
//! Resolution is a single map lookup with identity fallback: an unbound key
//! passes through unchanged.

use std::collections::HashMap;

use crate::config::settings::{key_fragment, Settings};
use crate::input::device::{DeviceId, InputDevice};
use crate::input::keys::GamepadKey;

/// Settings key holding the JSON override map for a device
pub fn bindings_pref_key(device_name: &str) -> String {
    format!("input_bindings_{}", key_fragment(device_name))
}

/// Default table for a gamepad-class device
///
/// Identity for every advertised key, except the face buttons: pads report
/// A/B and X/Y in swapped positions relative to the retro layout, so the
/// defaults swap them back.
pub fn default_bindings(device: &InputDevice) -> HashMap<GamepadKey, GamepadKey> {
    let mut table: HashMap<GamepadKey, GamepadKey> =
        device.keys.iter().map(|&key| (key, key)).collect();

    table.insert(GamepadKey::A, GamepadKey::B);
    table.insert(GamepadKey::B, GamepadKey::A);
    table.insert(GamepadKey::X, GamepadKey::Y);
    table.insert(GamepadKey::Y, GamepadKey::X);

    table
}

/// Immutable binding tables for a set of devices
#[derive(Debug, Clone, Default)]
pub struct BindingSnapshot {
    tables: HashMap<DeviceId, HashMap<GamepadKey, GamepadKey>>,
}

impl BindingSnapshot {
    /// Snapshot with no devices; every key resolves to itself
    pub fn empty() -> Self {
        BindingSnapshot::default()
    }

    /// Build tables for `devices`: class defaults merged with the user's
    /// stored overrides
    ///
    /// Malformed override records are logged and ignored; the device keeps
    /// its defaults.
    pub fn build(devices: &[InputDevice], settings: &dyn Settings) -> Self {
        let mut tables = HashMap::new();

        for device in devices {
            let mut table = default_bindings(device);

            if let Some(raw) = settings.get_string(&bindings_pref_key(&device.name)) {
                match serde_json::from_str::<HashMap<GamepadKey, GamepadKey>>(&raw) {
                    Ok(overrides) => table.extend(overrides),
                    Err(err) => log::warn!(
                        "Ignoring malformed binding overrides for '{}': {}",
                        device.name,
                        err
                    ),
                }
            }

            tables.insert(device.id, table);
        }

        BindingSnapshot { tables }
    }

    /// Resolve a raw key to its bound logical key
    ///
    /// Unknown devices and unbound keys resolve to the raw key itself.
    pub fn resolve(&self, device: DeviceId, key: GamepadKey) -> GamepadKey {
        self.tables
            .get(&device)
            .and_then(|table| table.get(&key))
            .copied()
            .unwrap_or(key)
    }

    /// Full table for a device, for display in a remapping UI
    pub fn table(&self, device: DeviceId) -> Option<&HashMap<GamepadKey, GamepadKey>> {
        self.tables.get(&device)
    }
}
