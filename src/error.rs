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

//! Error types for the session controller
//!
//! [`SessionError`] covers everything a running session can report.
//! Load-pipeline failures have their own [`LoadError`] taxonomy because they
//! are terminal: once one occurs the session enters an error state and stays
//! there. Everything else (save/restore problems, storage hiccups) is
//! recoverable and surfaces as a user-visible message at worst.

use thiserror::Error;

/// Result type alias using [`SessionError`]
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur during an emulation session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Terminal failure while bringing the session up
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A stored state was produced with a different serialization format
    #[error("Save state has an incompatible format")]
    IncompatibleState,

    /// Restoring a state kept failing after exhausting the retry budget
    #[error("Failed to restore save state after {attempts} attempts")]
    RestoreFailed {
        /// Number of unserialize attempts made
        attempts: u32,
    },

    /// Quick load was requested but nothing was quick saved this session
    #[error("No quick save available")]
    NoQuickSave,

    /// Slot index outside the fixed slot range
    #[error("Save slot {index} does not exist")]
    SlotOutOfRange {
        /// The rejected index
        index: usize,
    },

    /// The core service worker is gone (teardown or panic)
    #[error("Emulation core is not available")]
    CoreUnavailable,

    /// The operation was interrupted by session teardown
    #[error("Operation cancelled")]
    Cancelled,

    /// Filesystem error from one of the stores
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed metadata or binding record
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed settings file
    #[error("Settings error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Terminal errors from the load pipeline
///
/// Each variant maps to a user-presentable message. These are the only
/// errors that move the session into the terminal error state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The rendering surface does not meet the core's requirements
    #[error("This device's graphics driver is not compatible with the selected core")]
    SurfaceIncompatible,

    /// The core library could not be loaded
    #[error("Failed to load the emulation core")]
    Core,

    /// The game content could not be loaded by the core
    #[error("Failed to load the game")]
    Game,

    /// Battery save or state data could not be read during startup
    #[error("Failed to read saved data for this game")]
    Saves,

    /// One or more required firmware files are missing
    #[error("Missing required firmware: {}", .0.join(", "))]
    MissingFirmware(Vec<String>),
}
