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

//! Save-state lifecycle: slots, auto save, quick save, SRAM
//!
//! [`SaveStateManager`] is the one component allowed to move snapshots
//! between the core and the stores. Every operation is gated on the session
//! state: while the session cannot accept saves (loading, terminated, failed)
//! the operation is a silent no-op rather than an error, because save
//! requests race lifecycle transitions routinely and punishing the loser
//! helps nobody.
//!
//! Slot saves and loads additionally share a single-flight guard. Slot
//! operations come from menu taps; a double tap must not interleave two
//! captures or two restores on the core.
//!
//! # Restoring
//!
//! Cores reject `unserialize` while they are still settling, so a restore is
//! a retry loop: up to ten attempts with a fixed delay between them, each
//! attempt re-checking the inserted disk first on multi-disk systems. The
//! delay sleeps on the session's [`CancelToken`] so teardown interrupts a
//! restore mid-loop instead of waiting out the budget. Two checks run before
//! the first attempt ever reaches the core: a snapshot whose format version
//! differs from the current core's is refused outright, and an auto-save
//! restore first blocks until the core has signalled readiness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use crate::config::settings::{Settings, AUTO_SAVE_ENABLED_KEY};
use crate::config::system::SystemProfile;
use crate::core::service::CoreHandle;
use crate::error::{Result, SessionError};
use crate::saves::state::{SaveState, SlotInfo, StateMetadata};
use crate::saves::store::SaveStores;
use crate::session::cancel::CancelToken;
use crate::session::effects::EffectSender;
use crate::session::state::{SessionState, StateCell};

/// Number of numbered save slots per game
pub const MAX_SLOTS: usize = 4;

/// Unserialize attempts made before a restore is reported as failed
const RESTORE_ATTEMPTS: u32 = 10;

/// Delay between restore attempts
const RESTORE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Whether auto saves apply to this session
///
/// The system profile must support coherent snapshots and the user must not
/// have disabled the preference.
pub fn auto_save_enabled(profile: &SystemProfile, settings: &dyn Settings) -> bool {
    profile.supports_auto_save && settings.get_bool(AUTO_SAVE_ENABLED_KEY, true)
}

/// Moves snapshots between the running core and the stores
pub struct SaveStateManager {
    game_id: String,
    profile: &'static SystemProfile,
    core: CoreHandle,
    state: Arc<StateCell<SessionState>>,
    cancel: CancelToken,
    effects: EffectSender,
    settings: Arc<dyn Settings>,
    stores: SaveStores,
    /// Single-flight guard for slot operations
    busy: AtomicBool,
    /// Session-scoped in-memory snapshot
    quick_save: Mutex<Option<SaveState>>,
    retry_delay: Duration,
}

impl SaveStateManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        game_id: impl Into<String>,
        profile: &'static SystemProfile,
        core: CoreHandle,
        state: Arc<StateCell<SessionState>>,
        cancel: CancelToken,
        effects: EffectSender,
        settings: Arc<dyn Settings>,
        stores: SaveStores,
    ) -> Self {
        SaveStateManager {
            game_id: game_id.into(),
            profile,
            core,
            state,
            cancel,
            effects,
            settings,
            stores,
            busy: AtomicBool::new(false),
            quick_save: Mutex::new(None),
            retry_delay: RESTORE_RETRY_DELAY,
        }
    }

    /// Override the delay between restore attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Capture the current core state into a numbered slot
    ///
    /// A no-op when the session cannot accept saves, when another slot
    /// operation is in flight, or when the core declines to serialize. The
    /// slot preview is captured on a background thread; preview failures
    /// never fail the save.
    ///
    /// # Errors
    ///
    /// [`SessionError::SlotOutOfRange`] for indices past [`MAX_SLOTS`],
    /// storage errors from the state store.
    pub fn save_slot(&self, index: usize) -> Result<()> {
        self.check_slot(index)?;
        if !self.state.get().accepts_saves() {
            debug!("Saves: session not accepting saves, slot save skipped");
            return Ok(());
        }
        let _busy = match self.begin_slot_operation() {
            Some(guard) => guard,
            None => {
                debug!("Saves: slot operation already in flight");
                return Ok(());
            }
        };

        let state = match self.capture_state()? {
            Some(state) => state,
            None => return Ok(()),
        };
        self.stores
            .states
            .save_slot(&self.game_id, self.profile.core_name, index, &state)?;
        info!("Saves: wrote slot {} for {}", index + 1, self.game_id);
        self.capture_preview(index);
        Ok(())
    }

    /// Restore the snapshot in a numbered slot
    ///
    /// A no-op when the session cannot accept saves, when another slot
    /// operation is in flight, or when the slot is empty.
    ///
    /// # Errors
    ///
    /// [`SessionError::SlotOutOfRange`] for indices past [`MAX_SLOTS`],
    /// [`SessionError::IncompatibleState`] for a version mismatch,
    /// [`SessionError::RestoreFailed`] when the retry budget is exhausted,
    /// storage errors from the state store.
    pub fn load_slot(&self, index: usize) -> Result<()> {
        self.check_slot(index)?;
        if !self.state.get().accepts_saves() {
            debug!("Saves: session not accepting saves, slot load skipped");
            return Ok(());
        }
        let _busy = match self.begin_slot_operation() {
            Some(guard) => guard,
            None => {
                debug!("Saves: slot operation already in flight");
                return Ok(());
            }
        };

        let state = match self
            .stores
            .states
            .load_slot(&self.game_id, self.profile.core_name, index)?
        {
            Some(state) => state,
            None => {
                debug!("Saves: slot {} is empty", index + 1);
                return Ok(());
            }
        };
        self.restore_state(state)
    }

    /// Capture the current core state into the reserved auto slot
    ///
    /// A no-op unless auto saves apply to this session and the session
    /// accepts saves.
    pub fn save_auto_save(&self) -> Result<()> {
        if !self.auto_save_applies() {
            return Ok(());
        }
        if !self.state.get().accepts_saves() {
            return Ok(());
        }
        let state = match self.capture_state()? {
            Some(state) => state,
            None => return Ok(()),
        };
        self.stores
            .states
            .save_auto(&self.game_id, self.profile.core_name, &state)?;
        info!("Saves: auto save written for {}", self.game_id);
        Ok(())
    }

    /// Restore the reserved auto slot, waiting for core readiness first
    ///
    /// A no-op unless auto saves apply and a stored auto save exists.
    pub fn restore_auto_save(&self) -> Result<()> {
        if !self.auto_save_applies() {
            return Ok(());
        }
        self.wait_until_ready()?;
        let state = match self
            .stores
            .states
            .load_auto(&self.game_id, self.profile.core_name)?
        {
            Some(state) => state,
            None => return Ok(()),
        };
        self.restore_state(state)
    }

    /// Restore a snapshot handed over from the load pipeline
    ///
    /// Waits for core readiness first; used for the prefetched auto save and
    /// for a quick save carried across a session recreation.
    pub fn restore_pending(&self, state: SaveState) -> Result<()> {
        self.wait_until_ready()?;
        self.restore_state(state)
    }

    /// Capture the current core state into the in-memory quick-save slot
    ///
    /// Overwrites any previous quick save. Session scoped: the snapshot is
    /// gone when the manager is.
    pub fn save_quick_save(&self) -> Result<()> {
        if !self.state.get().accepts_saves() {
            return Ok(());
        }
        let state = match self.capture_state()? {
            Some(state) => state,
            None => return Ok(()),
        };
        let mut slot = self.quick_save.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(state);
        debug!("Saves: quick save captured");
        Ok(())
    }

    /// Restore the in-memory quick-save slot
    ///
    /// # Errors
    ///
    /// [`SessionError::NoQuickSave`] when nothing was quick saved this
    /// session; the user message is emitted on the effect stream before the
    /// error returns. Restore errors as for [`SaveStateManager::load_slot`].
    pub fn load_quick_save(&self) -> Result<()> {
        if !self.state.get().accepts_saves() {
            return Ok(());
        }
        let state = self
            .quick_save
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match state {
            Some(state) => self.restore_state(state),
            None => {
                let err = SessionError::NoQuickSave;
                self.effects.toast(err.to_string());
                Err(err)
            }
        }
    }

    /// Move the quick save out of the manager, for handover to a new session
    pub fn take_quick_save(&self) -> Option<SaveState> {
        self.quick_save
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Persist the core's battery-backed SRAM
    ///
    /// Empty SRAM is skipped by the store, so cartridges without battery
    /// saves never produce files.
    pub fn save_sram(&self) -> Result<()> {
        if !self.state.get().accepts_saves() {
            return Ok(());
        }
        let data = self.core.serialize_sram()?;
        self.stores.sram.save_sram(&self.game_id, &data)
    }

    /// Existence and capture time for every numbered slot, in slot order
    pub fn slots_info(&self) -> Result<Vec<SlotInfo>> {
        (0..MAX_SLOTS)
            .map(|index| {
                self.stores
                    .states
                    .slot_info(&self.game_id, self.profile.core_name, index)
            })
            .collect()
    }

    /// Preview image for a numbered slot, when one was captured
    pub fn slot_preview(&self, index: usize) -> Result<Option<Vec<u8>>> {
        self.check_slot(index)?;
        self.stores
            .previews
            .load_preview(&self.game_id, self.profile.core_name, index)
    }

    fn check_slot(&self, index: usize) -> Result<()> {
        if index >= MAX_SLOTS {
            return Err(SessionError::SlotOutOfRange { index });
        }
        Ok(())
    }

    fn auto_save_applies(&self) -> bool {
        auto_save_enabled(self.profile, self.settings.as_ref())
    }

    fn begin_slot_operation(&self) -> Option<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(BusyGuard { flag: &self.busy })
        } else {
            None
        }
    }

    /// Block until the session accepts saves
    ///
    /// Returns [`SessionError::Cancelled`] when the session reaches a
    /// terminal state instead.
    fn wait_until_ready(&self) -> Result<()> {
        let observed = self
            .state
            .wait_for(|s| s.accepts_saves() || s.is_terminal());
        if observed.is_terminal() {
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    /// Serialize the core and wrap the payload with current metadata
    ///
    /// `None` when the core declines; a declined capture is not an error.
    fn capture_state(&self) -> Result<Option<SaveState>> {
        let payload = match self.core.serialize_state()? {
            Some(payload) => payload,
            None => {
                debug!("Saves: core declined to serialize");
                return Ok(None);
            }
        };
        Ok(Some(SaveState {
            payload,
            metadata: StateMetadata {
                disk_index: self.current_disk_index()?,
                version: self.profile.states_version,
                saved_at: Utc::now(),
            },
        }))
    }

    fn current_disk_index(&self) -> Result<u32> {
        if !self.profile.supports_multi_disk {
            return Ok(0);
        }
        let info = self.core.disk_info()?;
        // Single-disk games on multi-disk systems always record disk zero
        Ok(if info.available > 1 { info.current } else { 0 })
    }

    fn restore_state(&self, state: SaveState) -> Result<()> {
        if state.metadata.version != self.profile.states_version {
            warn!(
                "Saves: refusing snapshot with format version {} (current is {})",
                state.metadata.version, self.profile.states_version
            );
            let err = SessionError::IncompatibleState;
            self.effects.toast(err.to_string());
            return Err(err);
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            self.switch_disk_if_needed(state.metadata.disk_index)?;
            if self.core.unserialize_state(state.payload.clone())? {
                info!("Saves: state restored after {} attempt(s)", attempts);
                return Ok(());
            }
            if attempts >= RESTORE_ATTEMPTS {
                let err = SessionError::RestoreFailed { attempts };
                self.effects.toast(err.to_string());
                return Err(err);
            }
            debug!("Saves: core refused the snapshot, retrying");
            if !self.cancel.sleep(self.retry_delay) {
                return Err(SessionError::Cancelled);
            }
        }
    }

    /// Re-insert the snapshot's disk before an unserialize attempt
    fn switch_disk_if_needed(&self, target: u32) -> Result<()> {
        if !self.profile.supports_multi_disk {
            return Ok(());
        }
        let info = self.core.disk_info()?;
        if info.available > 1 && target < info.available && target != info.current {
            debug!("Saves: switching to disk {} before restore", target);
            self.core.change_disk(target);
        }
        Ok(())
    }

    /// Grab a screenshot and store it as the slot's preview, off-thread
    ///
    /// Fire and forget: a session may end while the screenshot is in flight,
    /// and a missing preview is strictly cosmetic.
    fn capture_preview(&self, index: usize) {
        let core = self.core.clone();
        let previews = Arc::clone(&self.stores.previews);
        let game = self.game_id.clone();
        let core_name = self.profile.core_name;
        thread::spawn(move || {
            let image = match core.screenshot() {
                Ok(Some(image)) => image,
                Ok(None) | Err(_) => return,
            };
            if let Err(err) = previews.save_preview(&game, core_name, index, &image) {
                warn!("Saves: preview capture for slot {} failed: {}", index + 1, err);
            }
        });
    }
}

/// Clears the single-flight flag when the slot operation ends
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
