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

//! Input routing worker
//!
//! Everything that influences input handling travels through one queue: raw
//! key and motion events, hot-plug notifications, settings changes, and
//! stream resets. A single worker folds them in arrival order, which makes
//! the snapshot rule hold by construction: an event queued before a device
//! or settings update resolves against the mapping and bindings that were
//! current when it was queued.
//!
//! # Architecture
//!
//! ```text
//! platform callbacks ──┐
//! hot-plug events ─────┤                ┌────────────────────────┐
//! settings changes ────┼─► one queue ─► │ router worker          │
//! session resets ──────┘                │   PortMapper snapshot  │
//!                                       │   BindingSnapshot      │
//!                                       │   ShortcutDetector     │──► CoreHandle
//!                                       │   trigger synthesis    │──► SideEffects
//!                                       └────────────────────────┘
//! ```
//!
//! The fold itself lives in [`RouterCore`] so tests can drive it without a
//! thread; [`InputRouter`] owns the worker thread around it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel as cb;
use log::debug;

use crate::config::settings::Settings;
use crate::config::system::{ControllerConfig, SystemProfile};
use crate::core::service::CoreHandle;
use crate::input::bindings::BindingSnapshot;
use crate::input::device::{device_enabled_pref_key, DeviceId, InputDevice, KeyEvent, MotionEvent};
use crate::input::keys::{
    Axis, GamepadKey, KeyAction, MotionSource, TRIGGER_AXES, TRIGGER_PRESS_THRESHOLD,
};
use crate::input::port_mapper::{PortMapper, PortMapping};
use crate::input::shortcut::{shortcuts_for_device, ShortcutAction, ShortcutDetector};
use crate::session::effects::{EffectSender, SideEffect};

/// One item on the router queue
#[derive(Debug, Clone)]
pub enum RouterInput {
    /// Raw key transition from the platform layer
    Key(KeyEvent),
    /// Raw axis snapshot from the platform layer
    Motion(MotionEvent),
    /// The connected device set changed; the full new set
    DevicesChanged(Vec<InputDevice>),
    /// Bindings, shortcuts, enablement, or controller selections changed
    SettingsChanged,
    /// The input stream restarted (pause/resume); clear transient fold state
    Reset,
    /// Stop the worker
    Shutdown,
}

/// Sequential input fold
///
/// Owns every snapshot the routing decisions consult. Not thread-safe by
/// design; [`InputRouter`] runs it on its worker thread.
pub struct RouterCore {
    profile: &'static SystemProfile,
    settings: Arc<dyn Settings>,
    core: CoreHandle,
    effects: EffectSender,

    mapper: PortMapper,
    mapping: PortMapping,
    bindings: BindingSnapshot,
    detector: ShortcutDetector,

    /// Full device set as last reported, before enablement filtering
    all_devices: Vec<InputDevice>,
    /// Controller config per mapped port, rebuilt with the mapping
    port_controllers: HashMap<u8, &'static ControllerConfig>,
    /// Menu chord label last announced to the user
    menu_shortcut_label: Option<String>,

    /// Last (device, action, key) triple, for duplicate suppression
    last_key: Option<(DeviceId, KeyAction, GamepadKey)>,
    /// Per-device synthesized trigger buttons currently held
    synthesized: HashMap<DeviceId, HashSet<GamepadKey>>,
}

impl RouterCore {
    pub fn new(
        profile: &'static SystemProfile,
        settings: Arc<dyn Settings>,
        core: CoreHandle,
        effects: EffectSender,
    ) -> Self {
        RouterCore {
            profile,
            settings,
            core,
            effects,
            mapper: PortMapper::new(),
            mapping: PortMapping::default(),
            bindings: BindingSnapshot::empty(),
            detector: ShortcutDetector::new(),
            all_devices: Vec::new(),
            port_controllers: HashMap::new(),
            menu_shortcut_label: None,
            last_key: None,
            synthesized: HashMap::new(),
        }
    }

    /// Fold one queue item
    pub fn process(&mut self, input: RouterInput) {
        match input {
            RouterInput::Key(event) => self.on_key(event),
            RouterInput::Motion(event) => self.on_motion(event),
            RouterInput::DevicesChanged(devices) => {
                self.all_devices = devices;
                self.rebuild();
            }
            RouterInput::SettingsChanged => self.rebuild(),
            RouterInput::Reset => self.reset(),
            RouterInput::Shutdown => {}
        }
    }

    /// Current port mapping, for tests and diagnostics
    pub fn mapping(&self) -> &PortMapping {
        &self.mapping
    }

    fn on_key(&mut self, event: KeyEvent) {
        // Auto-repeats never reach the core
        if event.repeat > 0 {
            return;
        }
        let triple = (event.device, event.action, event.key);
        if self.last_key == Some(triple) {
            return;
        }
        self.last_key = Some(triple);

        let port = match self.mapping.port(event.device) {
            Some(port) => port,
            // Unassigned devices never reach the core or the detector
            None => return,
        };
        let bound = self.bindings.resolve(event.device, event.key);

        if port == 0 {
            // The detector tracks every raw transition on the first port,
            // even ones that end up intercepted below
            if let Some(action) = self.detector.on_key(event.key, event.action) {
                self.dispatch_shortcut(action);
                return;
            }
            if bound == GamepadKey::Mode && event.action == KeyAction::Down {
                self.effects.emit(SideEffect::ShowMenu);
                return;
            }
        }

        self.core.send_key(event.action, bound, port);
    }

    fn on_motion(&mut self, event: MotionEvent) {
        let port = match self.mapping.port(event.device) {
            Some(port) => port,
            None => return,
        };

        self.synthesize_triggers(&event, port);

        let left = (event.axis_value(Axis::X), event.axis_value(Axis::Y));
        let hat = (event.axis_value(Axis::HatX), event.axis_value(Axis::HatY));

        let merge = self
            .port_controllers
            .get(&port)
            .map(|config| config.merge_dpad_and_left_stick)
            .unwrap_or(false);

        if merge {
            let x = max_abs(left.0, hat.0);
            let y = max_abs(left.1, hat.1);
            self.core.send_motion(MotionSource::Dpad, x, y, port);
            self.core.send_motion(MotionSource::AnalogLeft, x, y, port);
        } else {
            self.core.send_motion(MotionSource::Dpad, hat.0, hat.1, port);
            self.core
                .send_motion(MotionSource::AnalogLeft, left.0, left.1, port);
        }

        self.core.send_motion(
            MotionSource::AnalogRight,
            event.axis_value(Axis::Z),
            event.axis_value(Axis::Rz),
            port,
        );
    }

    /// Convert trigger axes into edge-triggered L2/R2 transitions
    ///
    /// A synthesized button is pressed while any of its axes sits above the
    /// threshold. Only transitions are emitted; holding a trigger produces
    /// nothing after the initial press.
    fn synthesize_triggers(&mut self, event: &MotionEvent, port: u8) {
        let mut pressed_now: HashSet<GamepadKey> = HashSet::new();
        for (axis, key) in TRIGGER_AXES {
            if event.axis_value(axis) > TRIGGER_PRESS_THRESHOLD {
                pressed_now.insert(key);
            }
        }

        let held = self.synthesized.entry(event.device).or_default();
        for (_, key) in TRIGGER_AXES {
            if pressed_now.contains(&key) {
                if held.insert(key) {
                    self.core.send_key(KeyAction::Down, key, port);
                }
            } else if held.remove(&key) {
                self.core.send_key(KeyAction::Up, key, port);
            }
        }
    }

    fn dispatch_shortcut(&self, action: ShortcutAction) {
        debug!("Input router: shortcut fired: {}", action.label());
        let effect = match action {
            ShortcutAction::Menu => SideEffect::ShowMenu,
            ShortcutAction::QuickSave => SideEffect::QuickSave,
            ShortcutAction::QuickLoad => SideEffect::QuickLoad,
            ShortcutAction::ToggleFastForward => SideEffect::ToggleFastForward,
        };
        self.effects.emit(effect);
    }

    /// Recompute every snapshot from the stored device set and settings
    fn rebuild(&mut self) {
        let settings = self.settings.as_ref();
        let enabled: Vec<InputDevice> = self
            .all_devices
            .iter()
            .filter(|device| {
                device.is_supported()
                    && settings.get_bool(
                        &device_enabled_pref_key(&device.name),
                        device.is_enabled_by_default(),
                    )
            })
            .cloned()
            .collect();

        self.mapping = self.mapper.recompute(&enabled);
        self.bindings = BindingSnapshot::build(&enabled, settings);
        self.port_controllers = self
            .mapping
            .iter_by_port()
            .map(|(_, port)| (port, self.profile.controller_for_port(settings, port)))
            .collect();

        debug!(
            "Input router: {} of {} devices enabled, {} ports in use",
            enabled.len(),
            self.all_devices.len(),
            self.mapping.len()
        );

        let port0_shortcuts = self
            .mapping
            .device_at(0)
            .and_then(|id| enabled.iter().find(|device| device.id == id))
            .map(|device| shortcuts_for_device(device, settings))
            .unwrap_or_default();
        let menu_label = port0_shortcuts
            .iter()
            .find(|spec| spec.action == ShortcutAction::Menu)
            .map(|spec| spec.label());

        if menu_label != self.menu_shortcut_label {
            if let Some(label) = &menu_label {
                self.effects
                    .toast(format!("Press {label} to open the menu"));
            }
            self.menu_shortcut_label = menu_label;
        }
        self.detector.set_shortcuts(port0_shortcuts);
    }

    /// Drop transient fold state; mapping and bindings survive
    fn reset(&mut self) {
        debug!("Input router: stream reset");
        self.detector.reset();
        self.last_key = None;
        self.synthesized.clear();
    }
}

fn max_abs(a: f32, b: f32) -> f32 {
    if a.abs() >= b.abs() {
        a
    } else {
        b
    }
}

/// Cloneable producer side of the router queue
///
/// Handed to the platform layer for raw events and hot-plug notifications.
/// Pushes after shutdown are quietly dropped.
#[derive(Clone)]
pub struct RouterSender {
    tx: cb::Sender<RouterInput>,
}

impl RouterSender {
    pub fn key(&self, event: KeyEvent) {
        self.push(RouterInput::Key(event));
    }

    pub fn motion(&self, event: MotionEvent) {
        self.push(RouterInput::Motion(event));
    }

    pub fn devices_changed(&self, devices: Vec<InputDevice>) {
        self.push(RouterInput::DevicesChanged(devices));
    }

    pub fn settings_changed(&self) {
        self.push(RouterInput::SettingsChanged);
    }

    pub fn reset(&self) {
        self.push(RouterInput::Reset);
    }

    fn push(&self, input: RouterInput) {
        if self.tx.send(input).is_err() {
            debug!("Input router: event dropped, worker is gone");
        }
    }
}

/// Owner of the router worker thread
///
/// Dropping the router shuts the worker down and joins it.
pub struct InputRouter {
    sender: RouterSender,
    worker: Option<JoinHandle<()>>,
}

impl InputRouter {
    /// Spawn the worker with empty snapshots
    ///
    /// Routing starts once the first `DevicesChanged` arrives; until then
    /// every event is dropped as unassigned.
    pub fn spawn(
        profile: &'static SystemProfile,
        settings: Arc<dyn Settings>,
        core: CoreHandle,
        effects: EffectSender,
    ) -> Self {
        let (tx, rx) = cb::unbounded();
        let router = RouterCore::new(profile, settings, core, effects);
        let worker = thread::spawn(move || router_thread_main(router, rx));

        InputRouter {
            sender: RouterSender { tx },
            worker: Some(worker),
        }
    }

    /// Producer handle for the platform layer
    pub fn sender(&self) -> RouterSender {
        self.sender.clone()
    }

    /// Clear transient fold state in-band
    pub fn reset(&self) {
        self.sender.reset();
    }

    pub fn shutdown(&self) {
        self.sender.push(RouterInput::Shutdown);
    }

    /// Block until the worker has exited
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Input router: worker panicked");
            }
        }
    }
}

impl Drop for InputRouter {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}

fn router_thread_main(mut router: RouterCore, inputs: cb::Receiver<RouterInput>) {
    while let Ok(input) = inputs.recv() {
        if matches!(input, RouterInput::Shutdown) {
            break;
        }
        router.process(input);
    }
    debug!("Input router: worker exiting");
}
