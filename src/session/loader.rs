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

//! Staged load pipeline
//!
//! [`GameLoader`] turns a [`LoadRequest`] into everything the core service
//! needs to start: the core library path, the game files, and the prefetched
//! save data. The pipeline runs in fixed stages, publishing a progress
//! message through the session's state cell at each one:
//!
//! ```text
//! Locating core ─► Checking firmware ─► Preparing game ─► Reading saved data
//! ```
//!
//! Any stage failure is terminal for the session; the error taxonomy is
//! [`LoadError`], whose variants each carry a user-presentable message.
//!
//! Prefetched data is not returned to the caller. SRAM and the pending
//! restore snapshot go into the session's [`TransientMailboxes`] instead,
//! because their consumers run later and on other threads: SRAM is consumed
//! when the core loads the game, the pending snapshot when the core signals
//! readiness. A snapshot carried over from a previous session of the same
//! game takes precedence over the stored auto save.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info};

use crate::config::settings::Settings;
use crate::config::system::{SystemId, SystemProfile};
use crate::core::handle::GameFiles;
use crate::error::LoadError;
use crate::saves::manager::auto_save_enabled;
use crate::saves::state::SaveState;
use crate::saves::store::SaveStores;
use crate::session::mailbox::Mailbox;
use crate::session::state::{SessionState, StateCell};

/// The game a session was asked to run
#[derive(Debug, Clone)]
pub struct GameInfo {
    /// Stable identifier; also the base name of the game's save files
    pub id: String,
    /// Display title
    pub title: String,
    pub system: SystemId,
    /// ROM or disc image paths, in the order the core should receive them
    pub content_paths: Vec<PathBuf>,
}

/// Everything needed to start a session
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub game: GameInfo,
    /// Restore the stored auto save once the core is ready
    pub load_auto_save: bool,
    /// Snapshot carried over from a previous session of this game; wins
    /// over the stored auto save
    pub resume_state: Option<SaveState>,
}

/// Host directories a session reads from
#[derive(Debug, Clone)]
pub struct SessionPaths {
    /// Directory containing core libraries
    pub cores_dir: PathBuf,
    /// Directory containing firmware images
    pub system_dir: PathBuf,
}

/// Single-slot handoffs from the load pipeline to the running session
#[derive(Debug, Default)]
pub struct TransientMailboxes {
    /// Snapshot to restore once the core is ready
    pub pending_restore: Mailbox<SaveState>,
    /// SRAM to seed the core with at game load
    pub pending_sram: Mailbox<Vec<u8>>,
}

/// Product of a successful load: what the core service starts from
#[derive(Debug)]
pub struct LoadedGame {
    pub core_library: PathBuf,
    pub game_files: GameFiles,
}

/// Runs the staged load pipeline
pub struct GameLoader {
    paths: SessionPaths,
    settings: Arc<dyn Settings>,
    stores: SaveStores,
}

impl GameLoader {
    pub fn new(paths: SessionPaths, settings: Arc<dyn Settings>, stores: SaveStores) -> Self {
        GameLoader {
            paths,
            settings,
            stores,
        }
    }

    /// Run every stage for `request`
    ///
    /// Progress messages are published through `state`; prefetched save data
    /// is stashed into `mailboxes`.
    ///
    /// # Errors
    ///
    /// A [`LoadError`] naming the failed stage. The caller is responsible
    /// for moving the session into its error state.
    pub fn load(
        &self,
        request: &LoadRequest,
        state: &StateCell<SessionState>,
        mailboxes: &TransientMailboxes,
    ) -> Result<LoadedGame, LoadError> {
        let profile = request.game.system.profile();
        info!(
            "Loader: loading {} ({} on {})",
            request.game.id,
            request.game.title,
            profile.core_name
        );

        stage(state, "Locating core");
        let core_library = match self.find_core_library(profile.core_name) {
            Some(path) => path,
            None => {
                error!("Loader: no {} library under {:?}", profile.core_name, self.paths.cores_dir);
                return Err(LoadError::Core);
            }
        };

        stage(state, "Checking firmware");
        self.check_firmware(profile)?;

        stage(state, "Preparing game");
        let game_files = self.prepare_game_files(request)?;

        stage(state, "Reading saved data");
        self.prefetch_saves(request, profile, mailboxes)?;

        Ok(LoadedGame {
            core_library,
            game_files,
        })
    }

    /// Locate the library implementing `core_name` in the cores directory
    fn find_core_library(&self, core_name: &str) -> Option<PathBuf> {
        let entries = fs::read_dir(&self.paths.cores_dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if name.contains(core_name) && is_library(name) {
                debug!("Loader: using core library {:?}", path);
                return Some(path);
            }
        }
        None
    }

    fn check_firmware(&self, profile: &SystemProfile) -> Result<(), LoadError> {
        let missing: Vec<String> = profile
            .required_firmware
            .iter()
            .filter(|name| !self.paths.system_dir.join(name).exists())
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        error!("Loader: missing firmware: {}", missing.join(", "));
        Err(LoadError::MissingFirmware(missing))
    }

    fn prepare_game_files(&self, request: &LoadRequest) -> Result<GameFiles, LoadError> {
        if request.game.content_paths.is_empty() {
            error!("Loader: request for {} carries no content", request.game.id);
            return Err(LoadError::Game);
        }
        for path in &request.game.content_paths {
            if !path.exists() {
                error!("Loader: content file {:?} does not exist", path);
                return Err(LoadError::Game);
            }
        }
        Ok(GameFiles::Standard(request.game.content_paths.clone()))
    }

    /// Stash SRAM and the pending restore snapshot for the session
    fn prefetch_saves(
        &self,
        request: &LoadRequest,
        profile: &SystemProfile,
        mailboxes: &TransientMailboxes,
    ) -> Result<(), LoadError> {
        match self.stores.sram.load_sram(&request.game.id) {
            Ok(Some(data)) => {
                debug!("Loader: prefetched {} bytes of SRAM", data.len());
                mailboxes.pending_sram.stash(data);
            }
            Ok(None) => {}
            Err(err) => {
                error!("Loader: SRAM read failed: {}", err);
                return Err(LoadError::Saves);
            }
        }

        if let Some(resume) = &request.resume_state {
            debug!("Loader: resuming from a carried-over snapshot");
            mailboxes.pending_restore.stash(resume.clone());
            return Ok(());
        }

        if request.load_auto_save && auto_save_enabled(profile, self.settings.as_ref()) {
            match self.stores.states.load_auto(&request.game.id, profile.core_name) {
                Ok(Some(state)) => {
                    debug!("Loader: prefetched the auto save");
                    mailboxes.pending_restore.stash(state);
                }
                Ok(None) => {}
                Err(err) => {
                    error!("Loader: auto save read failed: {}", err);
                    return Err(LoadError::Saves);
                }
            }
        }
        Ok(())
    }
}

/// Publish a load-stage message, unless the session was already torn down
fn stage(state: &StateCell<SessionState>, message: &str) {
    state.set_if(
        |s| !s.is_terminal(),
        SessionState::Loading(message.to_string()),
    );
}

fn is_library(name: &str) -> bool {
    name.ends_with(".so") || name.ends_with(".dll") || name.ends_with(".dylib")
}
