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

//! Session lifecycle and orchestration
//!
//! # Components
//!
//! - [`state`]: the session state machine and the watch cell publishing it
//! - [`effects`]: the side-effect stream frontends react to
//! - [`cancel`]: cooperative cancellation with interruptible sleeps
//! - [`mailbox`]: single-slot handoffs between load pipeline and session
//! - [`loader`]: the staged load pipeline
//! - [`controller`]: the top-level owner tying core service, input router,
//!   and save manager together

pub mod cancel;
pub mod controller;
pub mod effects;
pub mod loader;
pub mod mailbox;
pub mod state;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use controller::SessionController;
pub use effects::{EffectSender, SideEffect};
pub use loader::{
    GameInfo, GameLoader, LoadRequest, LoadedGame, SessionPaths, TransientMailboxes,
};
pub use mailbox::Mailbox;
pub use state::{SessionState, StateCell};
