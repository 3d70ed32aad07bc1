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

//! Chord shortcuts on the first controller
//!
//! Holding a small key combo on the port-0 pad triggers a session action:
//! open the menu, quick save, quick load, or toggle fast forward. Each
//! action resolves to a chord per device, either a stored user combo or the
//! first default candidate the device can physically press.
//!
//! The detector latches per shortcut: a chord fires on the key-down that
//! completes it and stays silent until at least one of its keys is released
//! and the chord is completed again.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::settings::{key_fragment, Settings};
use crate::input::device::InputDevice;
use crate::input::keys::{GamepadKey, KeyAction};

/// Session action a chord can trigger, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShortcutAction {
    Menu,
    QuickSave,
    QuickLoad,
    ToggleFastForward,
}

impl ShortcutAction {
    /// All actions, highest priority first
    pub const ALL: [ShortcutAction; 4] = [
        ShortcutAction::Menu,
        ShortcutAction::QuickSave,
        ShortcutAction::QuickLoad,
        ShortcutAction::ToggleFastForward,
    ];

    /// Display name
    pub fn label(self) -> &'static str {
        match self {
            ShortcutAction::Menu => "Menu",
            ShortcutAction::QuickSave => "Quick Save",
            ShortcutAction::QuickLoad => "Quick Load",
            ShortcutAction::ToggleFastForward => "Fast Forward",
        }
    }

    /// Fragment used in settings keys
    pub fn pref_fragment(self) -> &'static str {
        match self {
            ShortcutAction::Menu => "menu",
            ShortcutAction::QuickSave => "quick_save",
            ShortcutAction::QuickLoad => "quick_load",
            ShortcutAction::ToggleFastForward => "toggle_fast_forward",
        }
    }

    /// Default chord candidates, tried in order against the device's keys
    fn candidates(self) -> &'static [&'static [GamepadKey]] {
        match self {
            ShortcutAction::Menu => &[
                &[GamepadKey::ThumbL, GamepadKey::ThumbR],
                &[GamepadKey::Select, GamepadKey::Start],
            ],
            ShortcutAction::QuickSave => &[&[GamepadKey::Select, GamepadKey::R1]],
            ShortcutAction::QuickLoad => &[&[GamepadKey::Select, GamepadKey::L1]],
            ShortcutAction::ToggleFastForward => &[&[GamepadKey::Select, GamepadKey::R2]],
        }
    }
}

/// Settings key holding a device's stored combo for an action
pub fn shortcut_pref_key(device_name: &str, action: ShortcutAction) -> String {
    format!(
        "input_shortcut_{}_{}",
        key_fragment(device_name),
        action.pref_fragment()
    )
}

/// A chord bound to an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutSpec {
    pub action: ShortcutAction,
    pub chord: Vec<GamepadKey>,
}

impl ShortcutSpec {
    /// Human-readable chord, e.g. "L3 + R3"
    pub fn label(&self) -> String {
        self.chord
            .iter()
            .map(|key| key.name())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Resolve the shortcut set for one device
///
/// A stored user combo (JSON two-key pair) wins over the defaults. Without
/// one, the first candidate chord whose keys the device advertises is used;
/// actions with no pressable chord are dropped for that device.
pub fn shortcuts_for_device(device: &InputDevice, settings: &dyn Settings) -> Vec<ShortcutSpec> {
    ShortcutAction::ALL
        .iter()
        .filter_map(|&action| {
            if let Some(raw) = settings.get_string(&shortcut_pref_key(&device.name, action)) {
                match serde_json::from_str::<(GamepadKey, GamepadKey)>(&raw) {
                    Ok((first, second)) => {
                        return Some(ShortcutSpec {
                            action,
                            chord: vec![first, second],
                        });
                    }
                    Err(err) => log::warn!(
                        "Ignoring malformed shortcut combo for '{}' {}: {}",
                        device.name,
                        action.pref_fragment(),
                        err
                    ),
                }
            }

            action
                .candidates()
                .iter()
                .find(|chord| device.has_keys(chord))
                .map(|chord| ShortcutSpec {
                    action,
                    chord: chord.to_vec(),
                })
        })
        .collect()
}

/// Latching chord detector for the port-0 key stream
pub struct ShortcutDetector {
    shortcuts: Vec<ShortcutSpec>,
    pressed: HashSet<GamepadKey>,
    latched: HashSet<ShortcutAction>,
}

impl ShortcutDetector {
    pub fn new() -> Self {
        ShortcutDetector {
            shortcuts: Vec::new(),
            pressed: HashSet::new(),
            latched: HashSet::new(),
        }
    }

    /// Replace the shortcut set (port-0 device changed); clears all state
    pub fn set_shortcuts(&mut self, shortcuts: Vec<ShortcutSpec>) {
        self.shortcuts = shortcuts;
        self.reset();
    }

    /// Forget held keys and latches (input stream restarted)
    pub fn reset(&mut self) {
        self.pressed.clear();
        self.latched.clear();
    }

    /// Feed one raw port-0 key transition
    ///
    /// Returns the action to fire when this transition completes a chord.
    /// The caller is expected to consume the completing key-down instead of
    /// forwarding it.
    pub fn on_key(&mut self, key: GamepadKey, action: KeyAction) -> Option<ShortcutAction> {
        match action {
            KeyAction::Down => {
                self.pressed.insert(key);
            }
            KeyAction::Up => {
                self.pressed.remove(&key);
            }
        }

        let mut fired = None;
        for spec in &self.shortcuts {
            let contained =
                !spec.chord.is_empty() && spec.chord.iter().all(|k| self.pressed.contains(k));
            let was_latched = self.latched.contains(&spec.action);

            if contained && !was_latched {
                // Latch every newly completed chord, fire only the first
                self.latched.insert(spec.action);
                if fired.is_none() {
                    fired = Some(spec.action);
                }
            } else if !contained && was_latched {
                self.latched.remove(&spec.action);
            }
        }

        fired
    }
}

impl Default for ShortcutDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::MemorySettings;
    use crate::input::device::{DeviceId, DeviceSources};

    fn device_with(keys: &[GamepadKey]) -> InputDevice {
        InputDevice {
            id: DeviceId(1),
            name: "pad".to_string(),
            controller_number: 1,
            sources: DeviceSources::GAMEPAD,
            keys: keys.iter().copied().collect(),
            is_virtual: false,
        }
    }

    fn full_pad() -> InputDevice {
        device_with(&[
            GamepadKey::A,
            GamepadKey::B,
            GamepadKey::X,
            GamepadKey::Y,
            GamepadKey::Start,
            GamepadKey::Select,
            GamepadKey::L1,
            GamepadKey::R1,
            GamepadKey::L2,
            GamepadKey::R2,
            GamepadKey::ThumbL,
            GamepadKey::ThumbR,
        ])
    }

    #[test]
    fn test_full_pad_gets_stick_click_menu_chord() {
        let shortcuts = shortcuts_for_device(&full_pad(), &MemorySettings::new());

        let menu = shortcuts
            .iter()
            .find(|s| s.action == ShortcutAction::Menu)
            .unwrap();
        assert_eq!(menu.chord, vec![GamepadKey::ThumbL, GamepadKey::ThumbR]);
        assert_eq!(menu.label(), "L3 + R3");
    }

    #[test]
    fn test_pad_without_stick_clicks_falls_back_to_select_start() {
        let device = device_with(&[
            GamepadKey::A,
            GamepadKey::B,
            GamepadKey::X,
            GamepadKey::Y,
            GamepadKey::Start,
            GamepadKey::Select,
        ]);
        let shortcuts = shortcuts_for_device(&device, &MemorySettings::new());

        let menu = shortcuts
            .iter()
            .find(|s| s.action == ShortcutAction::Menu)
            .unwrap();
        assert_eq!(menu.chord, vec![GamepadKey::Select, GamepadKey::Start]);

        // No R1 means no quick-save chord at all
        assert!(!shortcuts
            .iter()
            .any(|s| s.action == ShortcutAction::QuickSave));
    }

    #[test]
    fn test_stored_combo_overrides_default() {
        let settings = MemorySettings::new().with(
            &shortcut_pref_key("pad", ShortcutAction::Menu),
            r#"["Select","L1"]"#,
        );
        let shortcuts = shortcuts_for_device(&full_pad(), &settings);

        let menu = shortcuts
            .iter()
            .find(|s| s.action == ShortcutAction::Menu)
            .unwrap();
        assert_eq!(menu.chord, vec![GamepadKey::Select, GamepadKey::L1]);
    }

    #[test]
    fn test_chord_fires_once_per_full_hold() {
        let mut detector = ShortcutDetector::new();
        detector.set_shortcuts(shortcuts_for_device(&full_pad(), &MemorySettings::new()));

        assert_eq!(detector.on_key(GamepadKey::ThumbL, KeyAction::Down), None);
        assert_eq!(
            detector.on_key(GamepadKey::ThumbR, KeyAction::Down),
            Some(ShortcutAction::Menu)
        );

        // Still held: unrelated activity must not re-trigger
        assert_eq!(detector.on_key(GamepadKey::A, KeyAction::Down), None);
        assert_eq!(detector.on_key(GamepadKey::A, KeyAction::Up), None);
    }

    #[test]
    fn test_chord_rearms_after_release() {
        let mut detector = ShortcutDetector::new();
        detector.set_shortcuts(shortcuts_for_device(&full_pad(), &MemorySettings::new()));

        detector.on_key(GamepadKey::ThumbL, KeyAction::Down);
        assert!(detector.on_key(GamepadKey::ThumbR, KeyAction::Down).is_some());

        assert_eq!(detector.on_key(GamepadKey::ThumbR, KeyAction::Up), None);
        assert_eq!(
            detector.on_key(GamepadKey::ThumbR, KeyAction::Down),
            Some(ShortcutAction::Menu)
        );
    }

    #[test]
    fn test_reset_forgets_held_keys() {
        let mut detector = ShortcutDetector::new();
        detector.set_shortcuts(shortcuts_for_device(&full_pad(), &MemorySettings::new()));

        detector.on_key(GamepadKey::ThumbL, KeyAction::Down);
        detector.reset();

        // After a stream restart the half-held chord must not complete
        assert_eq!(detector.on_key(GamepadKey::ThumbR, KeyAction::Down), None);
    }

    #[test]
    fn test_overlapping_chords_fire_highest_priority_only() {
        let mut detector = ShortcutDetector::new();
        detector.set_shortcuts(vec![
            ShortcutSpec {
                action: ShortcutAction::Menu,
                chord: vec![GamepadKey::Select, GamepadKey::Start],
            },
            ShortcutSpec {
                action: ShortcutAction::QuickSave,
                chord: vec![GamepadKey::Select, GamepadKey::Start],
            },
        ]);

        detector.on_key(GamepadKey::Select, KeyAction::Down);
        assert_eq!(
            detector.on_key(GamepadKey::Start, KeyAction::Down),
            Some(ShortcutAction::Menu)
        );
        // The lower-priority chord latched silently and must stay quiet
        assert_eq!(detector.on_key(GamepadKey::B, KeyAction::Down), None);
    }
}
