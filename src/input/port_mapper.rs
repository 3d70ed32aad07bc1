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

//! Device to player-port assignment
//!
//! Every enabled controller gets a dense port index starting at 0, which is
//! what the core addresses in `send_key_event` / `send_motion_event`. The
//! mapper is deterministic and keeps assignments stable across hot-plug
//! churn: a pad that briefly disconnects gets its old port back as long as
//! nobody claimed it in the meantime.

use std::collections::{HashMap, HashSet};

use crate::input::device::{DeviceId, InputDevice};

/// Immutable snapshot of the current device to port assignment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMapping {
    ports: HashMap<DeviceId, u8>,
}

impl PortMapping {
    /// Port assigned to `device`, if any
    pub fn port(&self, device: DeviceId) -> Option<u8> {
        self.ports.get(&device).copied()
    }

    /// Device currently holding `port`, if any
    pub fn device_at(&self, port: u8) -> Option<DeviceId> {
        self.ports
            .iter()
            .find(|(_, p)| **p == port)
            .map(|(id, _)| *id)
    }

    /// Number of assigned devices
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// True when no device is assigned
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Iterate over (device, port) pairs in port order
    pub fn iter_by_port(&self) -> impl Iterator<Item = (DeviceId, u8)> {
        let mut pairs: Vec<(DeviceId, u8)> = self.ports.iter().map(|(d, p)| (*d, *p)).collect();
        pairs.sort_by_key(|(_, p)| *p);
        pairs.into_iter()
    }
}

/// Assigns ports to the enabled device set
///
/// Assignment rules, applied on every recompute:
///
/// 1. Devices that held a port before reclaim it, if still free.
/// 2. Remaining devices take the lowest free ports in priority order:
///    declared controller numbers first (ascending), then discovery order.
///
/// Removal frees a port immediately; the surviving devices keep theirs.
pub struct PortMapper {
    remembered: HashMap<DeviceId, u8>,
}

impl PortMapper {
    pub fn new() -> Self {
        PortMapper {
            remembered: HashMap::new(),
        }
    }

    /// Rebuild the mapping for the given enabled devices
    ///
    /// The slice order is the discovery order. Returns a fresh snapshot;
    /// the previous one stays valid for events already queued against it.
    pub fn recompute(&mut self, devices: &[InputDevice]) -> PortMapping {
        let ordered = priority_order(devices);

        let mut ports: HashMap<DeviceId, u8> = HashMap::new();
        let mut taken: HashSet<u8> = HashSet::new();

        // Reclaim pass: returning devices get their old port if still free
        for device in &ordered {
            if let Some(&port) = self.remembered.get(&device.id) {
                if taken.insert(port) {
                    ports.insert(device.id, port);
                }
            }
        }

        // Fill pass: everyone else takes the lowest free port
        for device in &ordered {
            if ports.contains_key(&device.id) {
                continue;
            }
            let port = lowest_free_port(&taken);
            taken.insert(port);
            ports.insert(device.id, port);
        }

        // Remember current assignments; stale entries for absent devices are
        // kept on purpose so a re-added device can find its way back.
        for (id, port) in &ports {
            self.remembered.insert(*id, *port);
        }

        log::debug!("Port mapping recomputed: {} device(s)", ports.len());
        PortMapping { ports }
    }
}

impl Default for PortMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Order devices by declared controller number, then discovery order
fn priority_order(devices: &[InputDevice]) -> Vec<&InputDevice> {
    let mut indexed: Vec<(usize, &InputDevice)> = devices.iter().enumerate().collect();
    indexed.sort_by_key(|(idx, device)| {
        if device.controller_number > 0 {
            (0u8, device.controller_number as usize, *idx)
        } else {
            (1u8, 0, *idx)
        }
    });
    indexed.into_iter().map(|(_, device)| device).collect()
}

fn lowest_free_port(taken: &HashSet<u8>) -> u8 {
    (0..=u8::MAX)
        .find(|port| !taken.contains(port))
        .unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::device::DeviceSources;
    use crate::input::keys::GamepadKey;
    use proptest::prelude::*;
    use std::collections::HashSet as KeySet;

    fn pad(id: i32, controller_number: u8) -> InputDevice {
        InputDevice {
            id: DeviceId(id),
            name: format!("pad-{}", id),
            controller_number,
            sources: DeviceSources::GAMEPAD,
            keys: KeySet::from([GamepadKey::A, GamepadKey::B, GamepadKey::X, GamepadKey::Y]),
            is_virtual: false,
        }
    }

    #[test]
    fn test_declared_numbers_take_priority_over_discovery_order() {
        let mut mapper = PortMapper::new();
        // Discovered second, but declares player 1
        let mapping = mapper.recompute(&[pad(10, 2), pad(20, 1)]);

        assert_eq!(mapping.port(DeviceId(20)), Some(0));
        assert_eq!(mapping.port(DeviceId(10)), Some(1));
    }

    #[test]
    fn test_undeclared_devices_follow_discovery_order() {
        let mut mapper = PortMapper::new();
        let mapping = mapper.recompute(&[pad(10, 0), pad(20, 0), pad(30, 0)]);

        assert_eq!(mapping.port(DeviceId(10)), Some(0));
        assert_eq!(mapping.port(DeviceId(20)), Some(1));
        assert_eq!(mapping.port(DeviceId(30)), Some(2));
    }

    #[test]
    fn test_same_input_yields_same_mapping() {
        let devices = [pad(10, 1), pad(20, 0), pad(30, 2)];

        let mut first = PortMapper::new();
        let mut second = PortMapper::new();
        assert_eq!(first.recompute(&devices), second.recompute(&devices));
    }

    #[test]
    fn test_removal_keeps_surviving_ports() {
        let mut mapper = PortMapper::new();
        mapper.recompute(&[pad(10, 1), pad(20, 2), pad(30, 3)]);

        // Player 1 unplugs; the others must not shift down
        let mapping = mapper.recompute(&[pad(20, 2), pad(30, 3)]);
        assert_eq!(mapping.port(DeviceId(20)), Some(1));
        assert_eq!(mapping.port(DeviceId(30)), Some(2));
        assert_eq!(mapping.port(DeviceId(10)), None);
    }

    #[test]
    fn test_readded_device_reclaims_its_port() {
        let mut mapper = PortMapper::new();
        mapper.recompute(&[pad(10, 1), pad(20, 2)]);
        mapper.recompute(&[pad(20, 2)]);

        let mapping = mapper.recompute(&[pad(10, 1), pad(20, 2)]);
        assert_eq!(mapping.port(DeviceId(10)), Some(0));
        assert_eq!(mapping.port(DeviceId(20)), Some(1));
    }

    #[test]
    fn test_newcomer_takes_freed_port_before_returning_device() {
        let mut mapper = PortMapper::new();
        mapper.recompute(&[pad(10, 0), pad(20, 0)]);

        // Device 10 leaves and a newcomer arrives while it is gone
        mapper.recompute(&[pad(20, 0), pad(30, 0)]);

        // The newcomer claimed port 0, so the returning device moves on
        let mapping = mapper.recompute(&[pad(20, 0), pad(30, 0), pad(10, 0)]);
        assert_eq!(mapping.port(DeviceId(30)), Some(0));
        assert_eq!(mapping.port(DeviceId(20)), Some(1));
        assert_eq!(mapping.port(DeviceId(10)), Some(2));
    }

    #[test]
    fn test_duplicate_declared_numbers_break_ties_by_discovery() {
        let mut mapper = PortMapper::new();
        let mapping = mapper.recompute(&[pad(10, 1), pad(20, 1)]);

        assert_eq!(mapping.port(DeviceId(10)), Some(0));
        assert_eq!(mapping.port(DeviceId(20)), Some(1));
    }

    #[test]
    fn test_device_at_is_the_reverse_lookup() {
        let mut mapper = PortMapper::new();
        let mapping = mapper.recompute(&[pad(10, 1), pad(20, 2)]);

        assert_eq!(mapping.device_at(0), Some(DeviceId(10)));
        assert_eq!(mapping.device_at(1), Some(DeviceId(20)));
        assert_eq!(mapping.device_at(5), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any device set maps deterministically and densely: two fresh
        /// mappers agree, and the assigned ports are exactly 0..N
        #[test]
        fn test_any_device_set_maps_deterministically_and_densely(
            raw in proptest::collection::vec((0i32..20, 0u8..=4u8), 0..12)
        ) {
            let mut seen = KeySet::new();
            let devices: Vec<InputDevice> = raw
                .into_iter()
                .filter(|(id, _)| seen.insert(*id))
                .map(|(id, number)| pad(id, number))
                .collect();

            let first = PortMapper::new().recompute(&devices);
            let second = PortMapper::new().recompute(&devices);
            prop_assert_eq!(&first, &second);

            let mut ports: Vec<u8> = devices
                .iter()
                .map(|device| first.port(device.id).expect("every device is assigned"))
                .collect();
            ports.sort_unstable();
            let expected: Vec<u8> = (0..devices.len() as u8).collect();
            prop_assert_eq!(ports, expected);
        }
    }
}
