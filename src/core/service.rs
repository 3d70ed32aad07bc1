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

//! Single-owner core service worker
//!
//! Exactly one thread may call into a [`RetroCore`]. This module provides
//! that thread: a worker that owns the boxed core, performs the load
//! sequence, and then folds commands and core events until shutdown.
//! Everyone else talks to the core through a cloneable [`CoreHandle`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ commands  ┌─────────────────────────┐
//! │ CoreHandle   │ ────────► │ service worker thread   │
//! │ (any thread) │           │   owns Box<dyn RetroCore>│
//! └──────────────┘           │   load core → load game │
//! ┌──────────────┐  events   │   fold commands/events  │
//! │ core impl    │ ────────► │   publish SessionState  │
//! └──────────────┘           └─────────────────────────┘
//! ```
//!
//! RPC-style commands (serialize, unserialize, disk queries, screenshot)
//! carry a `bounded(1)` reply sender; the caller blocks on the reply. After
//! the worker exits, every handle call reports
//! [`SessionError::CoreUnavailable`].

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel as cb;
use log::{debug, error, info};

use crate::core::handle::{CoreEvent, GameFiles, RetroCore};
use crate::core::variables::CoreVariable;
use crate::error::{LoadError, Result, SessionError};
use crate::input::{GamepadKey, KeyAction, MotionSource};
use crate::session::effects::{EffectSender, SideEffect};
use crate::session::state::{SessionState, StateCell};

/// Everything the worker needs to bring the core up
#[derive(Debug, Clone)]
pub struct StartPlan {
    /// Resolved path of the core library to load
    pub core_library: PathBuf,
    /// Game content, one entry per disk
    pub game_files: GameFiles,
    /// Battery save to seed the core with, when one was found
    pub sram: Option<Vec<u8>>,
}

/// Commands accepted by the service worker
enum CoreCommand {
    Key {
        action: KeyAction,
        key: GamepadKey,
        port: u8,
    },
    Motion {
        source: MotionSource,
        x: f32,
        y: f32,
        port: u8,
    },
    SerializeState {
        reply: cb::Sender<Option<Vec<u8>>>,
    },
    UnserializeState {
        data: Vec<u8>,
        reply: cb::Sender<bool>,
    },
    SerializeSram {
        reply: cb::Sender<Vec<u8>>,
    },
    DiskInfo {
        reply: cb::Sender<DiskInfo>,
    },
    ChangeDisk {
        index: u32,
    },
    SetControllerType {
        port: u8,
        controller_id: u32,
    },
    UpdateVariables {
        variables: Vec<CoreVariable>,
    },
    Screenshot {
        reply: cb::Sender<Option<Vec<u8>>>,
    },
    Shutdown,
}

/// Disk drive status reported by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskInfo {
    pub current: u32,
    pub available: u32,
}

/// Cloneable front door to the service worker
///
/// Input injection methods are fire-and-forget; after teardown they turn
/// into no-ops. Query methods block on the worker's reply and report
/// [`SessionError::CoreUnavailable`] once the worker is gone.
#[derive(Clone)]
pub struct CoreHandle {
    tx: cb::Sender<CoreCommand>,
}

impl CoreHandle {
    pub fn send_key(&self, action: KeyAction, key: GamepadKey, port: u8) {
        self.send(CoreCommand::Key { action, key, port });
    }

    pub fn send_motion(&self, source: MotionSource, x: f32, y: f32, port: u8) {
        self.send(CoreCommand::Motion { source, x, y, port });
    }

    /// Capture the full emulation state
    ///
    /// `Ok(None)` means the core declined (not an error, the caller skips
    /// the save).
    pub fn serialize_state(&self) -> Result<Option<Vec<u8>>> {
        self.rpc(|reply| CoreCommand::SerializeState { reply })
    }

    /// Restore a captured state; `Ok(false)` is a transient failure
    pub fn unserialize_state(&self, data: Vec<u8>) -> Result<bool> {
        self.rpc(|reply| CoreCommand::UnserializeState { data, reply })
    }

    pub fn serialize_sram(&self) -> Result<Vec<u8>> {
        self.rpc(|reply| CoreCommand::SerializeSram { reply })
    }

    pub fn disk_info(&self) -> Result<DiskInfo> {
        self.rpc(|reply| CoreCommand::DiskInfo { reply })
    }

    pub fn change_disk(&self, index: u32) {
        self.send(CoreCommand::ChangeDisk { index });
    }

    pub fn set_controller_type(&self, port: u8, controller_id: u32) {
        self.send(CoreCommand::SetControllerType { port, controller_id });
    }

    pub fn update_variables(&self, variables: Vec<CoreVariable>) {
        self.send(CoreCommand::UpdateVariables { variables });
    }

    pub fn screenshot(&self) -> Result<Option<Vec<u8>>> {
        self.rpc(|reply| CoreCommand::Screenshot { reply })
    }

    /// Ask the worker to exit; idempotent
    pub fn shutdown(&self) {
        self.send(CoreCommand::Shutdown);
    }

    fn send(&self, command: CoreCommand) {
        if self.tx.send(command).is_err() {
            debug!("Core service: command dropped, worker is gone");
        }
    }

    fn rpc<R>(&self, command: impl FnOnce(cb::Sender<R>) -> CoreCommand) -> Result<R> {
        let (reply_tx, reply_rx) = cb::bounded(1);
        self.tx
            .send(command(reply_tx))
            .map_err(|_| SessionError::CoreUnavailable)?;
        reply_rx.recv().map_err(|_| SessionError::CoreUnavailable)
    }
}

/// Owner of the worker thread
///
/// Dropping the service shuts the worker down and joins it.
pub struct CoreService {
    handle: CoreHandle,
    worker: Option<JoinHandle<()>>,
}

impl CoreService {
    /// Spawn the worker and start the load sequence
    ///
    /// The worker publishes `Loading` stages, then `Ready` on the core's
    /// first-frame event, or a terminal `Error` if any load step fails.
    ///
    /// # Arguments
    ///
    /// * `core` - The core implementation; the worker takes sole ownership
    /// * `plan` - Library path, game content, and optional SRAM seed
    /// * `events` - Channel the core implementation reports on
    /// * `state` - Session state cell the worker publishes into
    /// * `effects` - Side-effect stream for fatal-failure notifications
    pub fn spawn(
        core: Box<dyn RetroCore>,
        plan: StartPlan,
        events: cb::Receiver<CoreEvent>,
        state: Arc<StateCell<SessionState>>,
        effects: EffectSender,
    ) -> Self {
        let (tx, rx) = cb::unbounded();
        let worker = thread::spawn(move || {
            service_thread_main(core, plan, rx, events, state, effects);
        });

        CoreService {
            handle: CoreHandle { tx },
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> CoreHandle {
        self.handle.clone()
    }

    /// Block until the worker has exited
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Core service: worker panicked");
            }
        }
    }
}

impl Drop for CoreService {
    fn drop(&mut self) {
        self.handle.shutdown();
        self.join();
    }
}

fn service_thread_main(
    mut core: Box<dyn RetroCore>,
    plan: StartPlan,
    commands: cb::Receiver<CoreCommand>,
    events: cb::Receiver<CoreEvent>,
    state: Arc<StateCell<SessionState>>,
    effects: EffectSender,
) {
    let fail = |error: LoadError| {
        error!("Core service: load failed: {error}");
        effects.emit(SideEffect::FinishFailed(error.to_string()));
        state.set_if(|s| !s.is_terminal(), SessionState::Error(error));
    };

    // Stage writes are guarded so a teardown that races the load is never
    // overwritten with a Loading state.
    state.set_if(
        |s| !s.is_terminal(),
        SessionState::Loading("Loading core".to_string()),
    );
    if let Err(fault) = core.load_core(&plan.core_library) {
        fail(fault.into());
        return;
    }

    state.set_if(
        |s| !s.is_terminal(),
        SessionState::Loading("Loading game".to_string()),
    );
    if let Err(fault) = core.load_game(&plan.game_files, plan.sram.as_deref()) {
        fail(fault.into());
        return;
    }

    info!(
        "Core service: {} loaded, waiting for first frame",
        plan.core_library.display()
    );
    state.set_if(
        |s| !s.is_terminal(),
        SessionState::Loading("Starting emulation".to_string()),
    );

    let mut events = events;
    loop {
        cb::select! {
            recv(commands) -> command => match command {
                Ok(CoreCommand::Shutdown) => break,
                Ok(command) => handle_command(core.as_mut(), command),
                // Every handle is gone; nothing can reach the core anymore
                Err(_) => break,
            },
            recv(events) -> event => match event {
                Ok(CoreEvent::FirstFrameRendered) => {
                    if state.set_if(
                        |s| matches!(s, SessionState::Loading(_)),
                        SessionState::Ready,
                    ) {
                        debug!("Core service: first frame rendered");
                    }
                }
                Ok(CoreEvent::Fatal(fault)) => {
                    fail(fault.into());
                    break;
                }
                Err(_) => {
                    // Event producer dropped; keep serving commands
                    events = cb::never();
                }
            },
        }
    }

    debug!("Core service: worker exiting");
}

fn handle_command(core: &mut dyn RetroCore, command: CoreCommand) {
    match command {
        CoreCommand::Key { action, key, port } => core.send_key_event(action, key, port),
        CoreCommand::Motion { source, x, y, port } => core.send_motion_event(source, x, y, port),
        CoreCommand::SerializeState { reply } => {
            // A vanished caller is fine, the reply is just dropped
            let _ = reply.send(core.serialize_state());
        }
        CoreCommand::UnserializeState { data, reply } => {
            let _ = reply.send(core.unserialize_state(&data));
        }
        CoreCommand::SerializeSram { reply } => {
            let _ = reply.send(core.serialize_sram());
        }
        CoreCommand::DiskInfo { reply } => {
            let _ = reply.send(DiskInfo {
                current: core.current_disk(),
                available: core.available_disks(),
            });
        }
        CoreCommand::ChangeDisk { index } => core.change_disk(index),
        CoreCommand::SetControllerType {
            port,
            controller_id,
        } => core.set_controller_type(port, controller_id),
        CoreCommand::UpdateVariables { variables } => core.update_variables(&variables),
        CoreCommand::Screenshot { reply } => {
            let _ = reply.send(core.screenshot());
        }
        CoreCommand::Shutdown => unreachable!("handled by the worker loop"),
    }
}
