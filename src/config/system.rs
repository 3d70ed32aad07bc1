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

//! Static system catalog
//!
//! One [`SystemProfile`] per emulated system, resolved through a plain
//! lookup table built at compile time. The profile carries everything the
//! session needs to know about a system: which core runs it, the save-state
//! format version, firmware requirements, controller configurations, and
//! default core variables.

use serde::{Deserialize, Serialize};

use crate::config::settings::Settings;

/// libretro device id for a digital joypad
pub const DEVICE_JOYPAD: u32 = 1;
/// libretro device id for an analog pad
pub const DEVICE_ANALOG: u32 = 5;

/// Identifier of an emulated system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemId {
    Nes,
    Snes,
    Gb,
    Gbc,
    Gba,
    Genesis,
    N64,
    Psx,
    Psp,
    Nds,
}

impl SystemId {
    /// Stable lowercase id used in settings keys and directory names
    pub fn id(self) -> &'static str {
        match self {
            SystemId::Nes => "nes",
            SystemId::Snes => "snes",
            SystemId::Gb => "gb",
            SystemId::Gbc => "gbc",
            SystemId::Gba => "gba",
            SystemId::Genesis => "genesis",
            SystemId::N64 => "n64",
            SystemId::Psx => "psx",
            SystemId::Psp => "psp",
            SystemId::Nds => "nds",
        }
    }

    /// Parse the stable id back into a [`SystemId`]
    pub fn from_id(id: &str) -> Option<SystemId> {
        match id {
            "nes" => Some(SystemId::Nes),
            "snes" => Some(SystemId::Snes),
            "gb" => Some(SystemId::Gb),
            "gbc" => Some(SystemId::Gbc),
            "gba" => Some(SystemId::Gba),
            "genesis" => Some(SystemId::Genesis),
            "n64" => Some(SystemId::N64),
            "psx" => Some(SystemId::Psx),
            "psp" => Some(SystemId::Psp),
            "nds" => Some(SystemId::Nds),
            _ => None,
        }
    }

    /// Profile for this system
    pub fn profile(self) -> &'static SystemProfile {
        profile(self)
    }
}

/// One selectable controller layout for a system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Name used for settings lookups ("standard", "dualshock", ...)
    pub name: &'static str,

    /// libretro device id passed to `set_controller_type`
    pub libretro_id: u32,

    /// Send left-stick motion through the d-pad source as well, for cores
    /// whose systems never had an analog stick
    pub merge_dpad_and_left_stick: bool,
}

/// Everything the session controller needs to know about a system
#[derive(Debug, Clone, Copy)]
pub struct SystemProfile {
    pub system: SystemId,

    /// Name of the libretro core that runs this system; also the
    /// subdirectory save states live under
    pub core_name: &'static str,

    /// Serialization format version; bumped when the core breaks its
    /// save-state layout. States recorded under a different version are
    /// refused on load.
    pub states_version: u32,

    /// Whether the core supports serialization well enough for auto saves
    pub supports_auto_save: bool,

    /// Whether games may span multiple discs
    pub supports_multi_disk: bool,

    /// Firmware files that must exist before the core can start
    pub required_firmware: &'static [&'static str],

    /// Selectable controller configurations; the first entry is the default
    pub controllers: &'static [ControllerConfig],

    /// Core variables applied when the user has not overridden them
    pub default_variables: &'static [(&'static str, &'static str)],

    /// Core variables the user may override from settings, beyond the keys
    /// already listed in `default_variables`
    pub exposed_variables: &'static [&'static str],
}

impl SystemProfile {
    /// Settings key selecting the controller configuration for a port
    pub fn controller_pref_key(&self, port: u8) -> String {
        format!("controller_type_{}_{}", self.system.id(), port)
    }

    /// Controller configuration in effect for a port
    ///
    /// The user's selection (stored by name) wins when it names one of the
    /// profile's configurations; otherwise the first configuration is the
    /// default. Profiles always declare at least one configuration.
    pub fn controller_for_port(&self, settings: &dyn Settings, port: u8) -> &'static ControllerConfig {
        let selected = settings.get_string(&self.controller_pref_key(port));
        selected
            .and_then(|name| self.controllers.iter().find(|c| c.name == name))
            .unwrap_or(&self.controllers[0])
    }
}

const JOYPAD_MERGED: ControllerConfig = ControllerConfig {
    name: "default",
    libretro_id: DEVICE_JOYPAD,
    merge_dpad_and_left_stick: true,
};

const JOYPAD_PLAIN: ControllerConfig = ControllerConfig {
    name: "default",
    libretro_id: DEVICE_JOYPAD,
    merge_dpad_and_left_stick: false,
};

static NES: SystemProfile = SystemProfile {
    system: SystemId::Nes,
    core_name: "fceumm",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[JOYPAD_MERGED],
    default_variables: &[],
    exposed_variables: &[],
};

static SNES: SystemProfile = SystemProfile {
    system: SystemId::Snes,
    core_name: "snes9x",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[JOYPAD_MERGED],
    default_variables: &[],
    exposed_variables: &[],
};

static GB: SystemProfile = SystemProfile {
    system: SystemId::Gb,
    core_name: "gambatte",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[JOYPAD_MERGED],
    default_variables: &[("gambatte_gb_colorization", "auto")],
    exposed_variables: &["gambatte_gb_colorization", "gambatte_mix_frames"],
};

static GBC: SystemProfile = SystemProfile {
    system: SystemId::Gbc,
    core_name: "gambatte",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[JOYPAD_MERGED],
    default_variables: &[],
    exposed_variables: &["gambatte_mix_frames"],
};

static GBA: SystemProfile = SystemProfile {
    system: SystemId::Gba,
    core_name: "mgba",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[JOYPAD_MERGED],
    default_variables: &[],
    exposed_variables: &["mgba_frameskip", "mgba_color_correction"],
};

static GENESIS: SystemProfile = SystemProfile {
    system: SystemId::Genesis,
    core_name: "genesis_plus_gx",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[
        ControllerConfig {
            name: "default_6",
            // RETRO_DEVICE_SUBCLASS(JOYPAD, 1): MD six-button pad
            libretro_id: 513,
            merge_dpad_and_left_stick: true,
        },
        ControllerConfig {
            name: "default_3",
            // RETRO_DEVICE_SUBCLASS(JOYPAD, 0): MD three-button pad
            libretro_id: 257,
            merge_dpad_and_left_stick: true,
        },
    ],
    default_variables: &[],
    exposed_variables: &["genesis_plus_gx_blargg_ntsc_filter"],
};

static N64: SystemProfile = SystemProfile {
    system: SystemId::N64,
    core_name: "mupen64plus_next",
    // The core changed its serialization layout; older states are refused
    states_version: 2,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[JOYPAD_PLAIN],
    default_variables: &[],
    exposed_variables: &["mupen64plus-cpucore", "mupen64plus-43screensize"],
};

static PSX: SystemProfile = SystemProfile {
    system: SystemId::Psx,
    core_name: "pcsx_rearmed",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: true,
    required_firmware: &["scph5500.bin", "scph5501.bin", "scph5502.bin"],
    controllers: &[
        ControllerConfig {
            name: "standard",
            libretro_id: DEVICE_JOYPAD,
            merge_dpad_and_left_stick: true,
        },
        ControllerConfig {
            name: "dualshock",
            // RETRO_DEVICE_SUBCLASS(ANALOG, 0)
            libretro_id: 261,
            merge_dpad_and_left_stick: false,
        },
    ],
    default_variables: &[("pcsx_rearmed_drc", "disabled")],
    exposed_variables: &["pcsx_rearmed_frameskip_type", "pcsx_rearmed_dithering"],
};

static PSP: SystemProfile = SystemProfile {
    system: SystemId::Psp,
    core_name: "ppsspp",
    states_version: 1,
    supports_auto_save: false,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[ControllerConfig {
        name: "default",
        libretro_id: DEVICE_ANALOG,
        merge_dpad_and_left_stick: false,
    }],
    default_variables: &[],
    exposed_variables: &["ppsspp_frameskip", "ppsspp_internal_resolution"],
};

static NDS: SystemProfile = SystemProfile {
    system: SystemId::Nds,
    core_name: "desmume",
    states_version: 1,
    supports_auto_save: true,
    supports_multi_disk: false,
    required_firmware: &[],
    controllers: &[JOYPAD_PLAIN],
    default_variables: &[("desmume_pointer_type", "touch")],
    exposed_variables: &["desmume_frameskip", "desmume_screens_layout"],
};

/// Look up the profile for a system
pub fn profile(system: SystemId) -> &'static SystemProfile {
    match system {
        SystemId::Nes => &NES,
        SystemId::Snes => &SNES,
        SystemId::Gb => &GB,
        SystemId::Gbc => &GBC,
        SystemId::Gba => &GBA,
        SystemId::Genesis => &GENESIS,
        SystemId::N64 => &N64,
        SystemId::Psx => &PSX,
        SystemId::Psp => &PSP,
        SystemId::Nds => &NDS,
    }
}
