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

//! Session orchestration
//!
//! [`SessionController`] owns one emulation session end to end: it runs the
//! load pipeline, spawns the core service and the input router, applies the
//! configuration the core only accepts once it is ready, and tears
//! everything down in an order that loses no saves.
//!
//! # Architecture
//!
//! ```text
//!                SessionController
//!                       │ load()
//!        ┌──────────────┼───────────────────┐
//!        ▼              ▼                   ▼
//!   GameLoader     CoreService         InputRouter
//!  (caller thread) (worker thread)    (worker thread)
//!        │              ▲ ▲                 │
//!        │   CoreHandle │ │  key / motion   │
//!        │              │ └─────────────────┘
//!   mailboxes           │
//!        │       SaveStateManager ◄── frontend / ready worker
//!        └──────────────┘
//! ```
//!
//! Observation happens over two channels the frontend polls or blocks on:
//! the session state cell (a latest-value watch) and the side-effect stream.
//! Control methods are blocking-capable and run on the caller's thread.
//!
//! # Readiness
//!
//! A freshly loaded core rejects controller types, variables, and state
//! restores until it has rendered a frame. The controller therefore defers
//! that work to a small worker that blocks on the state cell: when the state
//! reaches `Ready` it applies per-port controller types, pushes the core
//! variables, restores any snapshot the load pipeline left in the mailbox,
//! and finally moves the session to `Running`. If the session dies first the
//! worker just exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel as cb;
use log::{debug, error, info, warn};

use crate::config::settings::Settings;
use crate::config::system::SystemProfile;
use crate::core::handle::{CoreEvent, RetroCore};
use crate::core::service::{CoreHandle, CoreService, StartPlan};
use crate::core::variables::variables_for_core;
use crate::error::Result;
use crate::input::{InputRouter, RouterSender};
use crate::saves::manager::SaveStateManager;
use crate::saves::store::SaveStores;
use crate::session::cancel::CancelToken;
use crate::session::effects::{self, EffectSender, SideEffect};
use crate::session::loader::{GameLoader, LoadRequest, SessionPaths, TransientMailboxes};
use crate::session::state::{SessionState, StateCell};

/// Controller ports configured at readiness
const CONTROLLER_PORTS: u8 = 4;

/// Owns and orchestrates one emulation session
pub struct SessionController {
    paths: SessionPaths,
    settings: Arc<dyn Settings>,
    stores: SaveStores,
    state: Arc<StateCell<SessionState>>,
    cancel: CancelToken,
    effects: EffectSender,
    effects_rx: cb::Receiver<SideEffect>,
    mailboxes: Arc<TransientMailboxes>,
    profile: Option<&'static SystemProfile>,
    core: Option<CoreHandle>,
    service: Option<CoreService>,
    router: Option<InputRouter>,
    saves: Option<Arc<SaveStateManager>>,
    ready_worker: Option<JoinHandle<()>>,
    finish_requested: AtomicBool,
    finished: AtomicBool,
    torn_down: bool,
    /// Restore retry delay handed to the save-state manager
    retry_delay: Option<Duration>,
}

impl SessionController {
    pub fn new(paths: SessionPaths, settings: Arc<dyn Settings>, stores: SaveStores) -> Self {
        let (effects, effects_rx) = effects::channel();
        SessionController {
            paths,
            settings,
            stores,
            state: Arc::new(StateCell::default()),
            cancel: CancelToken::new(),
            effects,
            effects_rx,
            mailboxes: Arc::new(TransientMailboxes::default()),
            profile: None,
            core: None,
            service: None,
            router: None,
            saves: None,
            ready_worker: None,
            finish_requested: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            torn_down: false,
            retry_delay: None,
        }
    }

    /// Override the delay between state-restore attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Watch handle for the session state
    ///
    /// The cell is latest-value-wins: a slow observer sees the current state,
    /// not every intermediate one.
    pub fn state(&self) -> Arc<StateCell<SessionState>> {
        Arc::clone(&self.state)
    }

    /// The session's side-effect stream
    ///
    /// Consume it from one place: receivers cloned from this one compete for
    /// messages rather than each seeing all of them.
    pub fn effects(&self) -> cb::Receiver<SideEffect> {
        self.effects_rx.clone()
    }

    /// Producer handle for platform input events, once loaded
    pub fn input_sender(&self) -> Option<RouterSender> {
        self.router.as_ref().map(|router| router.sender())
    }

    /// The session's save-state manager, once loaded
    pub fn saves(&self) -> Option<Arc<SaveStateManager>> {
        self.saves.as_ref().map(Arc::clone)
    }

    /// Run the load pipeline and bring the session up
    ///
    /// `core` is the platform's core implementation; `core_events` is where
    /// that implementation reports readiness and fatal faults from its own
    /// threads. Returns once the core service is spawned; progress continues
    /// asynchronously and is published through the state cell.
    ///
    /// A second load request on the same controller is ignored.
    ///
    /// # Errors
    ///
    /// Load-pipeline failures. The session is already in its terminal error
    /// state when this returns an error.
    pub fn load(
        &mut self,
        core: Box<dyn RetroCore>,
        core_events: cb::Receiver<CoreEvent>,
        request: LoadRequest,
    ) -> Result<()> {
        if self.state.get() != SessionState::Uninitialized {
            warn!("Session: load requested twice, ignoring");
            return Ok(());
        }

        let profile = request.game.system.profile();
        let loader = GameLoader::new(
            self.paths.clone(),
            Arc::clone(&self.settings),
            self.stores.clone(),
        );
        let loaded = match loader.load(&request, &self.state, &self.mailboxes) {
            Ok(loaded) => loaded,
            Err(err) => {
                self.effects.emit(SideEffect::FinishFailed(err.to_string()));
                self.state
                    .set_if(|s| !s.is_terminal(), SessionState::Error(err.clone()));
                return Err(err.into());
            }
        };

        let plan = StartPlan {
            core_library: loaded.core_library,
            game_files: loaded.game_files,
            sram: self.mailboxes.pending_sram.take_and_clear(),
        };
        let service = CoreService::spawn(
            core,
            plan,
            core_events,
            Arc::clone(&self.state),
            self.effects.clone(),
        );
        let handle = service.handle();

        let router = InputRouter::spawn(
            profile,
            Arc::clone(&self.settings),
            handle.clone(),
            self.effects.clone(),
        );

        let mut manager = SaveStateManager::new(
            request.game.id.clone(),
            profile,
            handle.clone(),
            Arc::clone(&self.state),
            self.cancel.clone(),
            self.effects.clone(),
            Arc::clone(&self.settings),
            self.stores.clone(),
        );
        if let Some(delay) = self.retry_delay {
            manager = manager.with_retry_delay(delay);
        }
        let saves = Arc::new(manager);

        let ready_worker = {
            let state = Arc::clone(&self.state);
            let handle = handle.clone();
            let saves = Arc::clone(&saves);
            let settings = Arc::clone(&self.settings);
            let mailboxes = Arc::clone(&self.mailboxes);
            thread::spawn(move || {
                ready_thread_main(profile, state, handle, saves, settings, mailboxes)
            })
        };

        self.profile = Some(profile);
        self.core = Some(handle);
        self.service = Some(service);
        self.router = Some(router);
        self.saves = Some(saves);
        self.ready_worker = Some(ready_worker);
        info!("Session: load pipeline done, waiting for the core");
        Ok(())
    }

    /// Suspend emulation, clearing transient input state
    ///
    /// No-op unless the session is running.
    pub fn pause(&self) {
        if self
            .state
            .set_if(|s| *s == SessionState::Running, SessionState::Paused)
        {
            if let Some(router) = &self.router {
                router.reset();
            }
            info!("Session: paused");
        }
    }

    /// Resume a paused session
    ///
    /// Core variables are pushed again because settings may have changed
    /// while the session was paused, and the input fold state is reset so no
    /// key is considered held across the gap.
    pub fn resume(&self) {
        if self
            .state
            .set_if(|s| *s == SessionState::Paused, SessionState::Running)
        {
            if let (Some(profile), Some(core)) = (self.profile, &self.core) {
                core.update_variables(variables_for_core(profile, self.settings.as_ref()));
            }
            if let Some(router) = &self.router {
                router.reset();
            }
            info!("Session: resumed");
        }
    }

    /// Persist everything and announce an orderly finish
    ///
    /// Flushes SRAM and the auto save, then emits
    /// [`SideEffect::FinishedSuccessfully`]. Persistence failures are logged
    /// and do not block the finish. Only the first request acts; repeats are
    /// ignored so a double-tap on "quit" cannot flush twice.
    pub fn request_finish(&self) {
        if self.finish_requested.swap(true, Ordering::SeqCst) {
            debug!("Session: finish already requested");
            return;
        }
        info!("Session: finishing");
        if let Some(saves) = &self.saves {
            if let Err(err) = saves.save_sram() {
                warn!("Session: SRAM save at finish failed: {}", err);
            }
            if let Err(err) = saves.save_auto_save() {
                warn!("Session: auto save at finish failed: {}", err);
            }
        }
        self.finished.store(true, Ordering::SeqCst);
        self.effects.emit(SideEffect::FinishedSuccessfully);
    }

    /// Tear the session down and join every worker
    ///
    /// Idempotent. If the finish path has not already persisted, SRAM and
    /// the auto save are flushed before the core goes away. Any restore
    /// sleeping between attempts is interrupted rather than waited out.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!("Session: tearing down");

        self.cancel.cancel();

        if !self.finished.load(Ordering::SeqCst) && self.state.get().accepts_saves() {
            if let Some(saves) = &self.saves {
                if let Err(err) = saves.save_sram() {
                    warn!("Session: SRAM save at teardown failed: {}", err);
                }
                if let Err(err) = saves.save_auto_save() {
                    warn!("Session: auto save at teardown failed: {}", err);
                }
            }
        }

        // Terminal state wakes the ready worker and every state waiter
        self.state
            .set_if(|s| !s.is_terminal(), SessionState::Terminated);

        if let Some(mut router) = self.router.take() {
            router.shutdown();
            router.join();
        }
        if let Some(mut service) = self.service.take() {
            service.handle().shutdown();
            service.join();
        }
        if let Some(worker) = self.ready_worker.take() {
            if worker.join().is_err() {
                error!("Session: ready worker panicked");
            }
        }
        debug!("Session: teardown complete");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Applies deferred configuration once the core signals readiness
fn ready_thread_main(
    profile: &'static SystemProfile,
    state: Arc<StateCell<SessionState>>,
    core: CoreHandle,
    saves: Arc<SaveStateManager>,
    settings: Arc<dyn Settings>,
    mailboxes: Arc<TransientMailboxes>,
) {
    let observed = state.wait_for(|s| *s == SessionState::Ready || s.is_terminal());
    if observed.is_terminal() {
        debug!("Session: core never became ready");
        return;
    }

    for port in 0..CONTROLLER_PORTS {
        let config = profile.controller_for_port(settings.as_ref(), port);
        core.set_controller_type(port, config.libretro_id);
    }
    core.update_variables(variables_for_core(profile, settings.as_ref()));

    if let Some(pending) = mailboxes.pending_restore.take_and_clear() {
        if let Err(err) = saves.restore_pending(pending) {
            warn!("Session: pending restore failed: {}", err);
        }
    }

    if state.set_if(|s| *s == SessionState::Ready, SessionState::Running) {
        info!("Session: running");
    }
}
