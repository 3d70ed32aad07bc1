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

//! Gamepad input vocabulary
//!
//! Platform-neutral key, axis, and motion-source identifiers shared by the
//! binding tables, the shortcut detector, and the input router. The
//! embedding layer translates its native key/axis codes into these before
//! feeding events to the session.

use serde::{Deserialize, Serialize};

/// Logical gamepad key
///
/// Covers the standard retro pad layout plus the extra buttons some pads
/// report. [`GamepadKey::Mode`] is the dedicated menu key (the "home" or
/// "guide" button on most pads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamepadKey {
    A,
    B,
    X,
    Y,
    Start,
    Select,
    L1,
    R1,
    L2,
    R2,
    /// Left stick click (L3)
    ThumbL,
    /// Right stick click (R3)
    ThumbR,
    /// Menu / home / guide button
    Mode,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    C,
    Z,
    Back,
    /// Placeholder for keys this crate does not model
    Unknown,
}

impl GamepadKey {
    /// Display name for menus and log lines
    pub fn name(self) -> &'static str {
        match self {
            GamepadKey::A => "A",
            GamepadKey::B => "B",
            GamepadKey::X => "X",
            GamepadKey::Y => "Y",
            GamepadKey::Start => "Start",
            GamepadKey::Select => "Select",
            GamepadKey::L1 => "L1",
            GamepadKey::R1 => "R1",
            GamepadKey::L2 => "L2",
            GamepadKey::R2 => "R2",
            GamepadKey::ThumbL => "L3",
            GamepadKey::ThumbR => "R3",
            GamepadKey::Mode => "Menu",
            GamepadKey::DpadUp => "Up",
            GamepadKey::DpadDown => "Down",
            GamepadKey::DpadLeft => "Left",
            GamepadKey::DpadRight => "Right",
            GamepadKey::C => "C",
            GamepadKey::Z => "Z",
            GamepadKey::Back => "Back",
            GamepadKey::Unknown => "Unknown",
        }
    }
}

/// Key transition direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAction {
    Down,
    Up,
}

/// Raw motion axis as reported by the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Left stick horizontal
    X,
    /// Left stick vertical
    Y,
    /// Right stick horizontal
    Z,
    /// Right stick vertical
    Rz,
    /// D-pad hat horizontal
    HatX,
    /// D-pad hat vertical
    HatY,
    Brake,
    Gas,
    LTrigger,
    RTrigger,
}

/// Analog source slot on the core side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionSource {
    Dpad,
    AnalogLeft,
    AnalogRight,
}

/// Trigger-class axes and the digital button each one synthesizes
///
/// Split triggers and combined brake/gas pedals both collapse onto L2/R2,
/// matching what libretro cores expect from a standard pad.
pub const TRIGGER_AXES: [(Axis, GamepadKey); 4] = [
    (Axis::Brake, GamepadKey::L2),
    (Axis::Gas, GamepadKey::R2),
    (Axis::LTrigger, GamepadKey::L2),
    (Axis::RTrigger, GamepadKey::R2),
];

/// Threshold above which a trigger axis counts as pressed
pub const TRIGGER_PRESS_THRESHOLD: f32 = 0.5;
