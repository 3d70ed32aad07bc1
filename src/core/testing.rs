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

//! Scripted core double for session tests
//!
//! [`ScriptedCore`] records every call it receives and can be programmed to
//! fail specific operations. Clones share the recording, so a test keeps one
//! clone while the service worker owns the other.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::handle::{CoreFault, GameFiles, RetroCore};
use crate::core::variables::CoreVariable;
use crate::input::{GamepadKey, KeyAction, MotionSource};

#[derive(Clone)]
pub struct ScriptedCore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    load_core_fault: Option<CoreFault>,
    load_game_fault: Option<CoreFault>,
    load_core_calls: usize,
    load_game_calls: usize,
    loaded_library: Option<PathBuf>,
    loaded_files: Option<GameFiles>,
    sram_seed: Option<Vec<u8>>,
    state_payload: Option<Vec<u8>>,
    sram_payload: Vec<u8>,
    screenshot: Option<Vec<u8>>,
    screenshot_calls: usize,
    unserialize_failures_left: u32,
    unserialize_payloads: Vec<Vec<u8>>,
    key_events: Vec<(KeyAction, GamepadKey, u8)>,
    motion_events: Vec<(MotionSource, f32, f32, u8)>,
    controller_types: Vec<(u8, u32)>,
    variable_pushes: Vec<Vec<CoreVariable>>,
    disk_changes: Vec<u32>,
    current_disk: u32,
    available_disks: u32,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            load_core_fault: None,
            load_game_fault: None,
            load_core_calls: 0,
            load_game_calls: 0,
            loaded_library: None,
            loaded_files: None,
            sram_seed: None,
            state_payload: Some(vec![0xAB; 8]),
            sram_payload: Vec::new(),
            screenshot: None,
            screenshot_calls: 0,
            unserialize_failures_left: 0,
            unserialize_payloads: Vec::new(),
            key_events: Vec::new(),
            motion_events: Vec::new(),
            controller_types: Vec::new(),
            variable_pushes: Vec::new(),
            disk_changes: Vec::new(),
            current_disk: 0,
            available_disks: 1,
        }
    }
}

impl ScriptedCore {
    pub fn new() -> Self {
        ScriptedCore {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner)
    }

    // Scripting

    pub fn fail_load_core(&self, fault: CoreFault) {
        self.with(|i| i.load_core_fault = Some(fault));
    }

    pub fn fail_load_game(&self, fault: CoreFault) {
        self.with(|i| i.load_game_fault = Some(fault));
    }

    /// Make the next `count` unserialize calls fail before succeeding
    pub fn fail_unserialize_times(&self, count: u32) {
        self.with(|i| i.unserialize_failures_left = count);
    }

    pub fn set_state_payload(&self, payload: Vec<u8>) {
        self.with(|i| i.state_payload = Some(payload));
    }

    /// Make serialize_state return `None`
    pub fn decline_serialize(&self) {
        self.with(|i| i.state_payload = None);
    }

    pub fn set_sram_payload(&self, payload: Vec<u8>) {
        self.with(|i| i.sram_payload = payload);
    }

    pub fn set_screenshot(&self, image: Option<Vec<u8>>) {
        self.with(|i| i.screenshot = image);
    }

    pub fn set_disks(&self, current: u32, available: u32) {
        self.with(|i| {
            i.current_disk = current;
            i.available_disks = available;
        });
    }

    // Recordings

    pub fn load_core_calls(&self) -> usize {
        self.with(|i| i.load_core_calls)
    }

    pub fn load_game_calls(&self) -> usize {
        self.with(|i| i.load_game_calls)
    }

    pub fn loaded_library(&self) -> Option<PathBuf> {
        self.with(|i| i.loaded_library.clone())
    }

    pub fn loaded_files(&self) -> Option<GameFiles> {
        self.with(|i| i.loaded_files.clone())
    }

    pub fn sram_seed(&self) -> Option<Vec<u8>> {
        self.with(|i| i.sram_seed.clone())
    }

    pub fn unserialize_calls(&self) -> usize {
        self.with(|i| i.unserialize_payloads.len())
    }

    pub fn unserialize_payloads(&self) -> Vec<Vec<u8>> {
        self.with(|i| i.unserialize_payloads.clone())
    }

    pub fn key_events(&self) -> Vec<(KeyAction, GamepadKey, u8)> {
        self.with(|i| i.key_events.clone())
    }

    pub fn motion_events(&self) -> Vec<(MotionSource, f32, f32, u8)> {
        self.with(|i| i.motion_events.clone())
    }

    pub fn controller_types(&self) -> Vec<(u8, u32)> {
        self.with(|i| i.controller_types.clone())
    }

    pub fn variable_pushes(&self) -> Vec<Vec<CoreVariable>> {
        self.with(|i| i.variable_pushes.clone())
    }

    pub fn disk_changes(&self) -> Vec<u32> {
        self.with(|i| i.disk_changes.clone())
    }

    pub fn screenshot_calls(&self) -> usize {
        self.with(|i| i.screenshot_calls)
    }
}

impl Default for ScriptedCore {
    fn default() -> Self {
        ScriptedCore::new()
    }
}

impl RetroCore for ScriptedCore {
    fn load_core(&mut self, library: &Path) -> Result<(), CoreFault> {
        self.with(|i| {
            i.load_core_calls += 1;
            i.loaded_library = Some(library.to_path_buf());
            match i.load_core_fault {
                Some(fault) => Err(fault),
                None => Ok(()),
            }
        })
    }

    fn load_game(&mut self, files: &GameFiles, sram: Option<&[u8]>) -> Result<(), CoreFault> {
        self.with(|i| {
            i.load_game_calls += 1;
            i.loaded_files = Some(files.clone());
            i.sram_seed = sram.map(<[u8]>::to_vec);
            match i.load_game_fault {
                Some(fault) => Err(fault),
                None => Ok(()),
            }
        })
    }

    fn send_key_event(&mut self, action: KeyAction, key: GamepadKey, port: u8) {
        self.with(|i| i.key_events.push((action, key, port)));
    }

    fn send_motion_event(&mut self, source: MotionSource, x: f32, y: f32, port: u8) {
        self.with(|i| i.motion_events.push((source, x, y, port)));
    }

    fn serialize_state(&mut self) -> Option<Vec<u8>> {
        self.with(|i| i.state_payload.clone())
    }

    fn unserialize_state(&mut self, data: &[u8]) -> bool {
        self.with(|i| {
            i.unserialize_payloads.push(data.to_vec());
            if i.unserialize_failures_left > 0 {
                i.unserialize_failures_left -= 1;
                false
            } else {
                true
            }
        })
    }

    fn serialize_sram(&mut self) -> Vec<u8> {
        self.with(|i| i.sram_payload.clone())
    }

    fn current_disk(&self) -> u32 {
        self.with(|i| i.current_disk)
    }

    fn available_disks(&self) -> u32 {
        self.with(|i| i.available_disks)
    }

    fn change_disk(&mut self, index: u32) {
        self.with(|i| {
            i.disk_changes.push(index);
            if index < i.available_disks {
                i.current_disk = index;
            }
        });
    }

    fn set_controller_type(&mut self, port: u8, controller_id: u32) {
        self.with(|i| i.controller_types.push((port, controller_id)));
    }

    fn update_variables(&mut self, variables: &[CoreVariable]) {
        self.with(|i| i.variable_pushes.push(variables.to_vec()));
    }

    fn screenshot(&mut self) -> Option<Vec<u8>> {
        self.with(|i| {
            i.screenshot_calls += 1;
            i.screenshot.clone()
        })
    }
}
