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

//! Session controller tests
//!
//! Each fixture builds a complete host layout in a temp directory (cores,
//! firmware, game content, data root) and drives a [`SessionController`]
//! through load, play, and teardown with a [`ScriptedCore`] recording what
//! reaches the core.
//!
//! Configuration applied at readiness travels through the core service queue
//! as fire-and-forget commands, so anything not ordered before an RPC is
//! asserted by polling with a deadline.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel as cb;

use crate::config::settings::MemorySettings;
use crate::config::system::SystemId;
use crate::core::handle::CoreEvent;
use crate::core::testing::ScriptedCore;
use crate::core::variables::CoreVariable;
use crate::error::{LoadError, SessionError};
use crate::input::device::{DeviceId, InputDevice, KeyEvent};
use crate::input::keys::{GamepadKey, KeyAction};
use crate::input::DeviceSources;
use crate::saves::state::{SaveState, StateMetadata};
use crate::saves::store::SaveStores;
use crate::session::controller::SessionController;
use crate::session::effects::SideEffect;
use crate::session::loader::{GameInfo, LoadRequest, SessionPaths};
use crate::session::state::{SessionState, StateCell};

const GAME: &str = "game";

/// Poll `condition` until it holds or a generous deadline passes
fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {description}"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

struct Fixture {
    controller: SessionController,
    core: ScriptedCore,
    core_name: &'static str,
    events_tx: cb::Sender<CoreEvent>,
    events_rx: Option<cb::Receiver<CoreEvent>>,
    state: Arc<StateCell<SessionState>>,
    effects_rx: cb::Receiver<SideEffect>,
    stores: SaveStores,
    game: GameInfo,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new(system: SystemId) -> Self {
        Fixture::build(system, MemorySettings::new(), true)
    }

    fn without_core_library(system: SystemId) -> Self {
        Fixture::build(system, MemorySettings::new(), false)
    }

    fn build(system: SystemId, settings: MemorySettings, install_core: bool) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let dir = tempfile::tempdir().expect("tempdir");
        let cores_dir = dir.path().join("cores");
        let system_dir = dir.path().join("system");
        fs::create_dir_all(&cores_dir).expect("cores dir");
        fs::create_dir_all(&system_dir).expect("system dir");

        let profile = system.profile();
        if install_core {
            fs::write(
                cores_dir.join(format!("{}_libretro.so", profile.core_name)),
                b"elf",
            )
            .expect("core library");
        }
        for firmware in profile.required_firmware {
            fs::write(system_dir.join(firmware), b"bios").expect("firmware");
        }
        let game_path = dir.path().join("game.bin");
        fs::write(&game_path, b"rom").expect("game file");

        let stores = SaveStores::filesystem(dir.path());
        let controller = SessionController::new(
            SessionPaths {
                cores_dir,
                system_dir,
            },
            Arc::new(settings),
            stores.clone(),
        )
        .with_retry_delay(Duration::from_millis(5));
        let state = controller.state();
        let effects_rx = controller.effects();
        let (events_tx, events_rx) = cb::unbounded();

        Fixture {
            controller,
            core: ScriptedCore::new(),
            core_name: profile.core_name,
            events_tx,
            events_rx: Some(events_rx),
            state,
            effects_rx,
            stores,
            game: GameInfo {
                id: GAME.into(),
                title: "Game".into(),
                system,
                content_paths: vec![game_path],
            },
            _dir: dir,
        }
    }

    fn request(&self) -> LoadRequest {
        LoadRequest {
            game: self.game.clone(),
            load_auto_save: true,
            resume_state: None,
        }
    }

    fn load_request(&mut self, request: LoadRequest) -> crate::error::Result<()> {
        let events_rx = self.events_rx.take().expect("one load per fixture");
        self.controller
            .load(Box::new(self.core.clone()), events_rx, request)
    }

    fn load(&mut self) {
        let request = self.request();
        self.load_request(request).expect("load");
    }

    /// Signal the first frame and wait until the ready worker hands the
    /// session over to `Running`
    fn first_frame(&self) {
        self.events_tx
            .send(CoreEvent::FirstFrameRendered)
            .expect("core worker alive");
        self.state
            .wait_for(|s| *s == SessionState::Running || s.is_terminal());
    }

    fn run(&mut self) {
        self.load();
        self.first_frame();
        assert_eq!(self.state.get(), SessionState::Running);
    }
}

fn seeded_state(payload: Vec<u8>, version: u32) -> SaveState {
    SaveState {
        payload,
        metadata: StateMetadata {
            disk_index: 0,
            version,
            saved_at: Utc::now(),
        },
    }
}

fn pad(id: i32, number: u8) -> InputDevice {
    InputDevice {
        id: DeviceId(id),
        name: format!("pad-{id}"),
        controller_number: number,
        sources: DeviceSources::GAMEPAD | DeviceSources::JOYSTICK,
        keys: HashSet::from([
            GamepadKey::A,
            GamepadKey::B,
            GamepadKey::X,
            GamepadKey::Y,
            GamepadKey::Start,
            GamepadKey::Select,
        ]),
        is_virtual: false,
    }
}

#[test]
fn test_load_reaches_running_with_deferred_configuration() {
    let mut fixture = Fixture::new(SystemId::Gb);
    fixture.run();

    assert_eq!(fixture.core.load_core_calls(), 1);
    assert_eq!(fixture.core.load_game_calls(), 1);
    assert!(fixture
        .core
        .loaded_library()
        .expect("library recorded")
        .to_string_lossy()
        .contains("gambatte_libretro.so"));

    // Controller types and variables are queued at readiness
    wait_until("controller types", || {
        fixture.core.controller_types().len() == 4
    });
    assert_eq!(
        fixture.core.controller_types(),
        vec![(0, 1), (1, 1), (2, 1), (3, 1)]
    );
    wait_until("variable push", || !fixture.core.variable_pushes().is_empty());
    assert!(fixture.core.variable_pushes()[0]
        .contains(&CoreVariable::new("gambatte_gb_colorization", "auto")));
}

#[test]
fn test_load_restores_the_stored_auto_save_before_running() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture
        .stores
        .states
        .save_auto(GAME, fixture.core_name, &seeded_state(vec![5, 5], 1))
        .expect("seed auto save");

    fixture.run();

    // The ready worker restores the prefetched snapshot before it flips the
    // session to Running, so the calls are already recorded here
    assert_eq!(fixture.core.unserialize_payloads(), vec![vec![5, 5]]);
}

#[test]
fn test_carried_over_snapshot_wins_over_the_auto_save() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture
        .stores
        .states
        .save_auto(GAME, fixture.core_name, &seeded_state(vec![1, 1], 1))
        .expect("seed auto save");

    let mut request = fixture.request();
    request.resume_state = Some(seeded_state(vec![3, 3], 1));
    fixture.load_request(request).expect("load");
    fixture.first_frame();

    assert_eq!(fixture.core.unserialize_payloads(), vec![vec![3, 3]]);
}

#[test]
fn test_prefetched_sram_seeds_the_core() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture
        .stores
        .sram
        .save_sram(GAME, &[9, 9])
        .expect("seed sram");

    fixture.run();

    assert_eq!(fixture.core.sram_seed(), Some(vec![9, 9]));
}

#[test]
fn test_load_failure_is_terminal_and_announced() {
    let mut fixture = Fixture::without_core_library(SystemId::Snes);

    let request = fixture.request();
    let result = fixture.load_request(request);

    assert!(matches!(
        result,
        Err(SessionError::Load(LoadError::Core))
    ));
    assert_eq!(fixture.state.get(), SessionState::Error(LoadError::Core));
    assert_eq!(
        fixture.effects_rx.try_recv(),
        Ok(SideEffect::FinishFailed(LoadError::Core.to_string()))
    );
}

#[test]
fn test_second_load_request_is_ignored() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture.run();

    let (_tx, rx) = cb::unbounded();
    let request = fixture.request();
    fixture
        .controller
        .load(Box::new(fixture.core.clone()), rx, request)
        .expect("ignored load");

    assert_eq!(fixture.state.get(), SessionState::Running);
    assert_eq!(fixture.core.load_core_calls(), 1);
}

#[test]
fn test_pause_and_resume_republish_variables() {
    let mut fixture = Fixture::new(SystemId::Gb);
    fixture.run();
    wait_until("readiness variable push", || {
        fixture.core.variable_pushes().len() == 1
    });

    fixture.controller.pause();
    assert_eq!(fixture.state.get(), SessionState::Paused);
    // Pausing twice stays paused
    fixture.controller.pause();
    assert_eq!(fixture.state.get(), SessionState::Paused);

    fixture.controller.resume();
    assert_eq!(fixture.state.get(), SessionState::Running);
    wait_until("variable push on resume", || {
        fixture.core.variable_pushes().len() == 2
    });
}

#[test]
fn test_resume_without_pause_is_a_no_op() {
    let mut fixture = Fixture::new(SystemId::Gb);
    fixture.run();

    fixture.controller.resume();

    assert_eq!(fixture.state.get(), SessionState::Running);
}

#[test]
fn test_finish_flushes_saves_and_announces_once() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture.run();
    fixture.core.set_sram_payload(vec![8, 8]);
    fixture.core.set_state_payload(vec![1]);

    fixture.controller.request_finish();

    assert_eq!(
        fixture.stores.sram.load_sram(GAME).expect("read back"),
        Some(vec![8, 8])
    );
    let auto = fixture
        .stores
        .states
        .load_auto(GAME, fixture.core_name)
        .expect("read back")
        .expect("auto save written");
    assert_eq!(auto.payload, vec![1]);
    assert_eq!(
        fixture.effects_rx.try_recv(),
        Ok(SideEffect::FinishedSuccessfully)
    );

    // A second request must not flush or announce again
    fixture.controller.request_finish();
    assert!(fixture.effects_rx.try_recv().is_err());
}

#[test]
fn test_shutdown_flushes_saves_when_finish_was_never_requested() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture.run();
    fixture.core.set_sram_payload(vec![2, 2]);
    fixture.core.set_state_payload(vec![4]);

    fixture.controller.shutdown();

    assert_eq!(fixture.state.get(), SessionState::Terminated);
    assert_eq!(
        fixture.stores.sram.load_sram(GAME).expect("read back"),
        Some(vec![2, 2])
    );
    let auto = fixture
        .stores
        .states
        .load_auto(GAME, fixture.core_name)
        .expect("read back")
        .expect("auto save written");
    assert_eq!(auto.payload, vec![4]);
    // An orderly teardown is not a finish
    assert!(fixture.effects_rx.try_recv().is_err());

    // Idempotent
    fixture.controller.shutdown();
    assert_eq!(fixture.state.get(), SessionState::Terminated);
}

#[test]
fn test_shutdown_after_finish_does_not_flush_twice() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture.run();
    fixture.core.set_sram_payload(vec![6]);
    fixture.controller.request_finish();

    // New SRAM appearing between finish and teardown must not be written:
    // the finish already persisted the session
    fixture.core.set_sram_payload(vec![7]);
    fixture.controller.shutdown();

    assert_eq!(
        fixture.stores.sram.load_sram(GAME).expect("read back"),
        Some(vec![6])
    );
}

#[test]
fn test_shutdown_before_ready_terminates_cleanly() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture.load();

    // The core never rendered a frame; teardown must not hang on the
    // ready worker or write any saves
    fixture.controller.shutdown();

    assert_eq!(fixture.state.get(), SessionState::Terminated);
    assert_eq!(fixture.core.unserialize_calls(), 0);
    assert_eq!(fixture.stores.sram.load_sram(GAME).expect("read back"), None);
}

#[test]
fn test_drop_tears_the_session_down() {
    let mut fixture = Fixture::new(SystemId::Snes);
    fixture.run();

    drop(fixture.controller);

    assert_eq!(fixture.state.get(), SessionState::Terminated);
}

#[test]
fn test_session_surfaces_appear_after_load() {
    let mut fixture = Fixture::new(SystemId::Snes);
    assert!(fixture.controller.input_sender().is_none());
    assert!(fixture.controller.saves().is_none());

    fixture.run();

    let saves = fixture.controller.saves().expect("saves manager");
    saves.save_slot(0).expect("slot save through the session");
    assert!(saves.slots_info().expect("info")[0].exists);

    // Input flows platform sender -> router -> core service -> core
    let sender = fixture.controller.input_sender().expect("input sender");
    sender.devices_changed(vec![pad(1, 1)]);
    sender.key(KeyEvent::down(DeviceId(1), GamepadKey::A));
    wait_until("routed key", || {
        fixture
            .core
            .key_events()
            .contains(&(KeyAction::Down, GamepadKey::B, 0))
    });
}

#[test]
fn test_quick_save_hands_over_to_a_new_session() {
    let mut first = Fixture::new(SystemId::Snes);
    first.run();
    first.core.set_state_payload(vec![0x5A; 4]);

    let saves = first.controller.saves().expect("saves manager");
    saves.save_quick_save().expect("quick save");
    let carried = saves.take_quick_save().expect("snapshot to carry");
    first.controller.shutdown();

    let mut second = Fixture::new(SystemId::Snes);
    let mut request = second.request();
    request.resume_state = Some(carried);
    second.load_request(request).expect("load");
    second.first_frame();

    assert_eq!(second.core.unserialize_payloads(), vec![vec![0x5A; 4]]);
}
