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

//! Emulation core handle trait
//!
//! This module defines the trait-based abstraction over a loaded emulation
//! core. The session controller drives any core (libretro glue, a native
//! implementation, a scripted test double) through the same interface.
//!
//! # Design Goals
//!
//! - **Decoupling**: the session layer never links against a concrete core
//! - **Single ownership**: exactly one thread calls the handle (see
//!   [`crate::core::service`]); implementations need `Send` but not `Sync`
//! - **Testability**: sessions can be exercised end to end with a scripted
//!   core double
//!
//! # Events
//!
//! Calls into the core are synchronous, but the core also reports things on
//! its own schedule: the first rendered frame (the readiness signal) and
//! fatal faults. Those travel as [`CoreEvent`] values on a channel supplied
//! alongside the handle, and the service worker folds them into the session
//! state.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use retrodock::core::{CoreFault, CoreVariable, GameFiles, RetroCore};
//! use retrodock::input::{GamepadKey, KeyAction, MotionSource};
//!
//! struct NullCore;
//!
//! impl RetroCore for NullCore {
//!     fn load_core(&mut self, _library: &Path) -> Result<(), CoreFault> {
//!         Ok(())
//!     }
//!
//!     fn load_game(&mut self, _files: &GameFiles, _sram: Option<&[u8]>) -> Result<(), CoreFault> {
//!         Ok(())
//!     }
//!
//!     fn send_key_event(&mut self, _action: KeyAction, _key: GamepadKey, _port: u8) {}
//!
//!     fn send_motion_event(&mut self, _source: MotionSource, _x: f32, _y: f32, _port: u8) {}
//!
//!     fn serialize_state(&mut self) -> Option<Vec<u8>> {
//!         None
//!     }
//!
//!     fn unserialize_state(&mut self, _data: &[u8]) -> bool {
//!         false
//!     }
//!
//!     fn serialize_sram(&mut self) -> Vec<u8> {
//!         Vec::new()
//!     }
//!
//!     fn set_controller_type(&mut self, _port: u8, _controller_id: u32) {}
//!
//!     fn update_variables(&mut self, _variables: &[CoreVariable]) {}
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::core::variables::CoreVariable;
use crate::error::LoadError;
use crate::input::{GamepadKey, KeyAction, MotionSource};

/// Game content handed to the core
///
/// Most games are plain files on disk. Content inside archives the platform
/// cannot extract (or document-provider storage) is exposed through virtual
/// file descriptors instead; the core sees a synthetic path per descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameFiles {
    /// Regular filesystem paths, first entry is the primary content file
    Standard(Vec<PathBuf>),
    /// Descriptor-backed files for content without a real path
    Virtual(Vec<VirtualFile>),
}

impl GameFiles {
    /// Number of content files (multi-disk games have several)
    pub fn len(&self) -> usize {
        match self {
            GameFiles::Standard(files) => files.len(),
            GameFiles::Virtual(files) => files.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A descriptor-backed content file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    /// Synthetic path the core addresses the file by
    pub virtual_path: String,
    /// Open file descriptor owned by the platform layer
    pub fd: i32,
}

/// Fatal fault codes reported by a core implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreFault {
    /// The rendering surface cannot satisfy the core's requirements
    SurfaceIncompatible,
    /// The core library failed to load
    LoadLibrary,
    /// The core rejected the game content
    LoadGame,
    /// The core's serialization channel broke down
    Serialization,
}

impl From<CoreFault> for LoadError {
    fn from(fault: CoreFault) -> Self {
        match fault {
            CoreFault::SurfaceIncompatible => LoadError::SurfaceIncompatible,
            CoreFault::LoadLibrary => LoadError::Core,
            CoreFault::LoadGame => LoadError::Game,
            CoreFault::Serialization => LoadError::Saves,
        }
    }
}

/// Asynchronous notifications from the core
///
/// Delivered on a channel created next to the handle. The service worker is
/// the only consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreEvent {
    /// The first frame reached the screen; the core is ready for state
    /// restores and configuration
    FirstFrameRendered,
    /// Unrecoverable fault; the session transitions to its error state
    Fatal(CoreFault),
}

/// Trait for emulation core implementations
///
/// All methods are called from the core service worker thread, never
/// concurrently. Implementations therefore need no internal locking.
///
/// # Call Order
///
/// `load_core` is called exactly once, then `load_game` exactly once. No
/// other method is called before both have returned `Ok`. After that, calls
/// arrive in session order until the handle is dropped at teardown.
///
/// # Failure Conventions
///
/// Input injection and configuration pushes are fire-and-forget. Snapshot
/// methods signal "nothing to give" with `None` or an empty buffer rather
/// than an error; callers treat that as a no-op. `unserialize_state` returns
/// `false` on transient failure and is retried by the caller.
pub trait RetroCore: Send {
    /// Load the core library from `library`
    ///
    /// # Errors
    ///
    /// [`CoreFault::SurfaceIncompatible`] if the rendering surface cannot
    /// host this core, [`CoreFault::LoadLibrary`] if the library itself
    /// fails to load.
    fn load_core(&mut self, library: &Path) -> Result<(), CoreFault>;

    /// Load game content, optionally seeding battery-backed RAM
    ///
    /// `sram` carries the persisted battery save when one exists; the core
    /// must apply it before emulation starts.
    ///
    /// # Errors
    ///
    /// [`CoreFault::LoadGame`] if the core rejects the content.
    fn load_game(&mut self, files: &GameFiles, sram: Option<&[u8]>) -> Result<(), CoreFault>;

    /// Inject a digital button transition for `port`
    fn send_key_event(&mut self, action: KeyAction, key: GamepadKey, port: u8);

    /// Inject a two-axis motion sample for `port`
    ///
    /// `source` selects the dpad, left-analog, or right-analog input on the
    /// emulated controller. Values are normalized to `[-1.0, 1.0]`.
    fn send_motion_event(&mut self, source: MotionSource, x: f32, y: f32, port: u8);

    /// Capture the full emulation state
    ///
    /// # Returns
    ///
    /// The serialized state, or `None` if the core cannot produce one right
    /// now (callers skip the save).
    fn serialize_state(&mut self) -> Option<Vec<u8>>;

    /// Restore a previously captured state
    ///
    /// # Returns
    ///
    /// `true` on success. `false` signals a transient failure; the caller
    /// retries with a delay.
    fn unserialize_state(&mut self, data: &[u8]) -> bool;

    /// Capture battery-backed RAM
    ///
    /// An empty buffer means the game has no battery save; callers skip
    /// persistence for it.
    fn serialize_sram(&mut self) -> Vec<u8>;

    /// Index of the disk currently inserted
    ///
    /// Single-disk cores keep the default.
    fn current_disk(&self) -> u32 {
        0
    }

    /// Number of disks the loaded game provides
    fn available_disks(&self) -> u32 {
        1
    }

    /// Insert the disk at `index`
    ///
    /// Called before state restores whose snapshot was taken on a different
    /// disk. Out-of-range indices are ignored.
    fn change_disk(&mut self, index: u32) {
        let _ = index;
    }

    /// Configure the emulated controller type plugged into `port`
    ///
    /// `controller_id` is the core-specific device id from the system
    /// profile's controller config.
    fn set_controller_type(&mut self, port: u8, controller_id: u32);

    /// Replace the core's variable set
    ///
    /// The slice is the complete desired configuration; variables absent
    /// from it revert to core defaults. Applying the same set twice must be
    /// harmless.
    fn update_variables(&mut self, variables: &[CoreVariable]);

    /// Capture the current frame as an encoded image
    ///
    /// Used for save-state previews. `None` when the core cannot provide
    /// one; callers swallow the failure.
    fn screenshot(&mut self) -> Option<Vec<u8>> {
        None
    }
}
