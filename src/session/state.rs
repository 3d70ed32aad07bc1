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

//! Session state machine and the watch cell that publishes it
//!
//! [`SessionState`] is the externally visible lifecycle of a session.
//! Transitions are monotonic except for the `Running ↔ Paused` pair, and the
//! two terminal states accept no further transitions:
//!
//! ```text
//! Uninitialized ─► Loading(msg) ─► Ready ─► Running ◄──► Paused
//!                      │             │         │
//!                      ▼             ▼         ▼
//!                  Error(cause)          Terminated
//! ```
//!
//! State is published through a [`StateCell`], a latest-value-wins watch:
//! readers either sample the current value or block until a predicate holds.
//! Intermediate values may be skipped by a slow reader; only the latest one
//! is retained.

use std::sync::{Condvar, Mutex, PoisonError};

use crate::error::LoadError;

/// Lifecycle state of an emulation session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No load has been requested yet
    #[default]
    Uninitialized,
    /// The load pipeline is running; the message describes the current stage
    Loading(String),
    /// The core rendered its first frame and accepts configuration
    Ready,
    /// Emulation is active
    Running,
    /// Emulation is suspended, core still loaded
    Paused,
    /// Teardown completed, core released
    Terminated,
    /// The load pipeline or the core failed; terminal
    Error(LoadError),
}

impl SessionState {
    /// Whether save and restore operations may touch the core
    ///
    /// Paused counts: the core is loaded and stable, which is exactly when
    /// snapshots are coherent.
    pub fn accepts_saves(&self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Running | SessionState::Paused
        )
    }

    /// Whether this state accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Error(_))
    }
}

/// Latest-value watch cell with blocking predicate waits
///
/// A mutex-guarded value plus a condvar. `set` replaces the value and wakes
/// all waiters; `wait_for` blocks until the stored value satisfies a
/// predicate and returns a clone of it. Poisoning is ignored: the cell holds
/// plain values, so the latest write is always usable.
pub struct StateCell<T> {
    value: Mutex<T>,
    changed: Condvar,
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        StateCell {
            value: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    /// Sample the current value
    pub fn get(&self) -> T {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the value and wake every waiter
    pub fn set(&self, value: T) {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = value;
        self.changed.notify_all();
    }

    /// Replace the value only while `predicate` holds for the current one
    ///
    /// The check and the write happen under one lock acquisition, so a
    /// concurrent transition cannot slip between them. Returns whether the
    /// replacement happened. This is what keeps terminal states terminal:
    /// writers guard with `|s| !s.is_terminal()` and lose the race cleanly.
    pub fn set_if<P>(&self, predicate: P, value: T) -> bool
    where
        P: Fn(&T) -> bool,
    {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if !predicate(&guard) {
            return false;
        }
        *guard = value;
        self.changed.notify_all();
        true
    }

    /// Block until the stored value satisfies `predicate`, then return it
    ///
    /// Returns immediately when the current value already matches. Callers
    /// that must not block forever include a terminal condition in the
    /// predicate.
    pub fn wait_for<P>(&self, predicate: P) -> T
    where
        P: Fn(&T) -> bool,
    {
        let mut guard = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        while !predicate(&guard) {
            guard = self
                .changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard.clone()
    }
}

impl<T: Clone + Default> Default for StateCell<T> {
    fn default() -> Self {
        StateCell::new(T::default())
    }
}
