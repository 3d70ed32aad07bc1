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

//! Persistent storage for save states, previews, and SRAM
//!
//! Three small trait seams keep the save-state manager independent of where
//! snapshots actually live, so tests can substitute in-memory stores and
//! frontends can bring their own backends. The bundled filesystem
//! implementations lay files out under a data root:
//!
//! ```text
//! <root>/states/<core>/<game>.slot<N>            slot payload (N = index + 1)
//! <root>/states/<core>/<game>.slot<N>.metadata   JSON sidecar
//! <root>/states/<core>/<game>.state              auto-save payload (+ sidecar)
//! <root>/state-previews/<core>/<game>.slot<N>.jpg
//! <root>/saves/<game>.srm                        battery-backed SRAM
//! ```
//!
//! `game` is the caller's stable game identifier and `core` the producing
//! core's name; keying on both keeps snapshots from one core out of another
//! core's restore path. Filesystem operations are retried a fixed number of
//! times before the error is reported, since removable and network-backed
//! storage fails transiently.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::error::Result;
use crate::saves::state::{SaveState, SlotInfo, StateMetadata};

/// Attempts made for each filesystem operation before giving up
const FILE_ACCESS_RETRIES: u32 = 3;

/// Storage for slot and auto-save snapshots
pub trait StateStore: Send + Sync {
    /// Write `state` to the numbered slot, replacing any previous snapshot
    fn save_slot(&self, game: &str, core: &str, index: usize, state: &SaveState) -> Result<()>;

    /// Read the numbered slot, or `None` when it was never written
    fn load_slot(&self, game: &str, core: &str, index: usize) -> Result<Option<SaveState>>;

    /// Existence and capture time of the numbered slot
    fn slot_info(&self, game: &str, core: &str, index: usize) -> Result<SlotInfo>;

    /// Write the reserved auto-save snapshot
    fn save_auto(&self, game: &str, core: &str, state: &SaveState) -> Result<()>;

    /// Read the reserved auto-save snapshot, or `None` when absent
    fn load_auto(&self, game: &str, core: &str) -> Result<Option<SaveState>>;
}

/// Storage for slot preview images
pub trait PreviewStore: Send + Sync {
    /// Write the preview image for the numbered slot
    fn save_preview(&self, game: &str, core: &str, index: usize, image: &[u8]) -> Result<()>;

    /// Read the preview image for the numbered slot, or `None` when absent
    fn load_preview(&self, game: &str, core: &str, index: usize) -> Result<Option<Vec<u8>>>;
}

/// Storage for battery-backed SRAM
pub trait SramStore: Send + Sync {
    /// Persist the game's SRAM; empty data is skipped
    fn save_sram(&self, game: &str, data: &[u8]) -> Result<()>;

    /// Read the game's SRAM, or `None` when absent or empty
    fn load_sram(&self, game: &str) -> Result<Option<Vec<u8>>>;
}

/// The three stores a session persists through, bundled for wiring
#[derive(Clone)]
pub struct SaveStores {
    pub states: Arc<dyn StateStore>,
    pub previews: Arc<dyn PreviewStore>,
    pub sram: Arc<dyn SramStore>,
}

impl SaveStores {
    /// Filesystem-backed stores laid out under a single data root
    pub fn filesystem(root: &Path) -> SaveStores {
        SaveStores {
            states: Arc::new(FsStateStore::new(root.join("states"))),
            previews: Arc::new(FsPreviewStore::new(root.join("state-previews"))),
            sram: Arc::new(FsSramStore::new(root.join("saves"))),
        }
    }
}

/// Snapshot storage rooted at a states directory
pub struct FsStateStore {
    root: PathBuf,
}

impl FsStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStateStore { root: root.into() }
    }

    fn slot_path(&self, game: &str, core: &str, index: usize) -> PathBuf {
        // Slot files are numbered from one; indices are zero-based.
        self.root.join(core).join(format!("{}.slot{}", game, index + 1))
    }

    fn auto_path(&self, game: &str, core: &str) -> PathBuf {
        self.root.join(core).join(format!("{}.state", game))
    }

    fn write_state(&self, path: &Path, state: &SaveState) -> Result<()> {
        let sidecar = metadata_path(path);
        let metadata = serde_json::to_vec(&state.metadata)?;
        with_retries("State write", || {
            ensure_parent(path)?;
            fs::write(path, &state.payload)?;
            fs::write(&sidecar, &metadata)
        })
    }

    fn read_state(&self, path: &Path) -> Result<Option<SaveState>> {
        if !path.exists() {
            return Ok(None);
        }
        let payload = with_retries("State read", || fs::read(path))?;
        let metadata = read_metadata(path).unwrap_or_default();
        Ok(Some(SaveState { payload, metadata }))
    }
}

impl StateStore for FsStateStore {
    fn save_slot(&self, game: &str, core: &str, index: usize, state: &SaveState) -> Result<()> {
        self.write_state(&self.slot_path(game, core, index), state)
    }

    fn load_slot(&self, game: &str, core: &str, index: usize) -> Result<Option<SaveState>> {
        self.read_state(&self.slot_path(game, core, index))
    }

    fn slot_info(&self, game: &str, core: &str, index: usize) -> Result<SlotInfo> {
        let path = self.slot_path(game, core, index);
        if !path.exists() {
            return Ok(SlotInfo {
                index,
                exists: false,
                saved_at: None,
            });
        }
        let saved_at = match read_metadata(&path) {
            Some(metadata) => metadata.saved_at,
            // Snapshots that predate the sidecar only have a file time.
            None => modified_time(&path)?,
        };
        Ok(SlotInfo {
            index,
            exists: true,
            saved_at: Some(saved_at),
        })
    }

    fn save_auto(&self, game: &str, core: &str, state: &SaveState) -> Result<()> {
        self.write_state(&self.auto_path(game, core), state)
    }

    fn load_auto(&self, game: &str, core: &str) -> Result<Option<SaveState>> {
        self.read_state(&self.auto_path(game, core))
    }
}

/// Preview-image storage rooted at a previews directory
pub struct FsPreviewStore {
    root: PathBuf,
}

impl FsPreviewStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsPreviewStore { root: root.into() }
    }

    fn preview_path(&self, game: &str, core: &str, index: usize) -> PathBuf {
        self.root
            .join(core)
            .join(format!("{}.slot{}.jpg", game, index + 1))
    }
}

impl PreviewStore for FsPreviewStore {
    fn save_preview(&self, game: &str, core: &str, index: usize, image: &[u8]) -> Result<()> {
        let path = self.preview_path(game, core, index);
        with_retries("Preview write", || {
            ensure_parent(&path)?;
            fs::write(&path, image)
        })
    }

    fn load_preview(&self, game: &str, core: &str, index: usize) -> Result<Option<Vec<u8>>> {
        let path = self.preview_path(game, core, index);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(with_retries("Preview read", || fs::read(&path))?))
    }
}

/// SRAM storage rooted at a saves directory
pub struct FsSramStore {
    root: PathBuf,
}

impl FsSramStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsSramStore { root: root.into() }
    }

    fn sram_path(&self, game: &str) -> PathBuf {
        self.root.join(format!("{}.srm", game))
    }
}

impl SramStore for FsSramStore {
    fn save_sram(&self, game: &str, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            debug!("Saves: skipping empty SRAM for {}", game);
            return Ok(());
        }
        let path = self.sram_path(game);
        with_retries("SRAM write", || {
            ensure_parent(&path)?;
            fs::write(&path, data)
        })
    }

    fn load_sram(&self, game: &str) -> Result<Option<Vec<u8>>> {
        let path = self.sram_path(game);
        if !path.exists() {
            return Ok(None);
        }
        let data = with_retries("SRAM read", || fs::read(&path))?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(data))
    }
}

/// Run `operation`, retrying transient filesystem failures
fn with_retries<T>(operation: &str, mut f: impl FnMut() -> io::Result<T>) -> Result<T> {
    let mut attempt = 1;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < FILE_ACCESS_RETRIES => {
                warn!(
                    "Saves: {} failed (attempt {}/{}): {}",
                    operation, attempt, FILE_ACCESS_RETRIES, err
                );
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

/// Sidecar path for a payload file: the payload name plus `.metadata`
fn metadata_path(payload: &Path) -> PathBuf {
    let mut name = payload.as_os_str().to_owned();
    name.push(".metadata");
    PathBuf::from(name)
}

/// Read and parse a payload's sidecar; `None` when missing or malformed
fn read_metadata(payload: &Path) -> Option<StateMetadata> {
    let raw = fs::read(metadata_path(payload)).ok()?;
    match serde_json::from_slice(&raw) {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            debug!("Saves: ignoring malformed sidecar for {:?}: {}", payload, err);
            None
        }
    }
}

fn modified_time(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}
