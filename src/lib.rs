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

//! retrodock: an emulation session controller for retro-game frontends
//!
//! This crate runs the interactive part of a libretro-style frontend: it
//! takes a game, a core implementation, and the user's settings, and drives
//! one emulation session from load to teardown. The frontend keeps the
//! screen and the widgets; retrodock keeps the session semantics.
//!
//! # Architecture
//!
//! - [`session`]: the [`SessionController`] orchestrating one session, its
//!   state machine, and the side-effect stream frontends react to
//! - [`core`]: the [`RetroCore`](core::RetroCore) seam the platform layer
//!   implements, and the worker thread that serializes all access to it
//! - [`input`]: gamepad hot-plug handling, port assignment, key bindings,
//!   chord shortcuts, and the router that turns raw events into
//!   core-directed commands
//! - [`saves`]: save-state slots, auto save, quick save, SRAM, and the
//!   stores they persist through
//! - [`config`]: the per-system catalog (cores, controllers, firmware,
//!   variables) and the user-settings seam
//!
//! # Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! use retrodock::config::{FileSettings, SystemId};
//! use retrodock::saves::SaveStores;
//! use retrodock::session::{
//!     GameInfo, LoadRequest, SessionController, SessionPaths, SessionState,
//! };
//! # use retrodock::core::{CoreFault, CoreVariable, GameFiles, RetroCore};
//! # use retrodock::input::{GamepadKey, KeyAction, MotionSource};
//! # struct NullCore;
//! # impl RetroCore for NullCore {
//! #     fn load_core(&mut self, _: &Path) -> Result<(), CoreFault> { Ok(()) }
//! #     fn load_game(&mut self, _: &GameFiles, _: Option<&[u8]>) -> Result<(), CoreFault> { Ok(()) }
//! #     fn send_key_event(&mut self, _: KeyAction, _: GamepadKey, _: u8) {}
//! #     fn send_motion_event(&mut self, _: MotionSource, _: f32, _: f32, _: u8) {}
//! #     fn serialize_state(&mut self) -> Option<Vec<u8>> { None }
//! #     fn unserialize_state(&mut self, _: &[u8]) -> bool { false }
//! #     fn serialize_sram(&mut self) -> Vec<u8> { Vec::new() }
//! #     fn set_controller_type(&mut self, _: u8, _: u32) {}
//! #     fn update_variables(&mut self, _: &[CoreVariable]) {}
//! # }
//!
//! let settings = Arc::new(FileSettings::load("settings.toml")?);
//! let stores = SaveStores::filesystem(Path::new("data"));
//! let paths = SessionPaths {
//!     cores_dir: PathBuf::from("cores"),
//!     system_dir: PathBuf::from("system"),
//! };
//!
//! // The platform layer implements RetroCore and reports readiness and
//! // faults through the event channel.
//! let (_core_events_tx, core_events) = crossbeam_channel::unbounded();
//!
//! let mut session = SessionController::new(paths, settings, stores);
//! session.load(
//!     Box::new(NullCore),
//!     core_events,
//!     LoadRequest {
//!         game: GameInfo {
//!             id: "super-game".into(),
//!             title: "Super Game".into(),
//!             system: SystemId::Snes,
//!             content_paths: vec![PathBuf::from("roms/super-game.sfc")],
//!         },
//!         load_auto_save: true,
//!         resume_state: None,
//!     },
//! )?;
//!
//! // Block until emulation is actually running
//! session.state().wait_for(|s| *s == SessionState::Running);
//! # Ok::<(), retrodock::SessionError>(())
//! ```
//!
//! # Threading
//!
//! Two worker threads per session: the core service (sole owner of the
//! core) and the input router (sequential event fold). Everything else runs
//! on caller threads and is safe to call from any of them.
//!
//! # Error Handling
//!
//! Fallible operations return [`Result<T>`], an alias for
//! `Result<T, SessionError>`. Load-pipeline failures are the [`LoadError`]
//! subset; they are terminal and move the session into its error state.

pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod saves;
pub mod session;

// Re-export commonly used types
pub use error::{LoadError, Result, SessionError};
pub use session::{SessionController, SessionState, SideEffect};
