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

//! Single-slot handoff between the load pipeline and the session
//!
//! The load pipeline prefetches data (a pending auto save, the game's SRAM)
//! before the session that consumes it exists. A [`Mailbox`] carries exactly
//! one such value: stashing overwrites any previous value, and taking clears
//! the slot atomically so at most one consumer ever observes a given value.
//! The mailboxes are owned by the session controller, scoped to one session.

use std::sync::{Mutex, PoisonError};

/// One-shot value slot
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

// Manual impl: the slot starts empty, so `T: Default` is not needed
impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Mailbox::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Mailbox {
            slot: Mutex::new(None),
        }
    }

    /// Store `value`, replacing any pending value
    pub fn stash(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(value);
    }

    /// Take the pending value, leaving the slot empty
    ///
    /// Atomic with respect to concurrent takers: a given value is returned
    /// to exactly one of them.
    pub fn take_and_clear(&self) -> Option<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }
}
