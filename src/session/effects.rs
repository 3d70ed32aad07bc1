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

//! Side effects the session raises for its frontend
//!
//! The session never draws UI. Anything that needs a screen or a sound (a
//! menu, a toast, the finish signal) is emitted as a [`SideEffect`] on an
//! unbounded channel; the frontend consumes the stream and reacts. Shortcut
//! actions that map to session operations (`QuickSave`, `QuickLoad`) also
//! travel this way so the frontend stays in control of when they run.

use crossbeam_channel as cb;

/// One frontend-visible effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Open the in-game menu
    ShowMenu,
    /// Show a transient user message
    ShowToast(String),
    /// The quick-save shortcut fired
    QuickSave,
    /// The quick-load shortcut fired
    QuickLoad,
    /// The fast-forward shortcut fired
    ToggleFastForward,
    /// `request_finish` completed; the frontend may leave the game screen
    FinishedSuccessfully,
    /// The session cannot continue; the message is user-presentable
    FinishFailed(String),
}

/// Cloneable producer side of the effect stream
///
/// Emitting after the consumer is gone (frontend already tore down) is
/// normal during shutdown and is quietly dropped.
#[derive(Clone)]
pub struct EffectSender {
    tx: cb::Sender<SideEffect>,
}

impl EffectSender {
    pub fn emit(&self, effect: SideEffect) {
        if self.tx.send(effect).is_err() {
            log::debug!("Side effect dropped, consumer is gone");
        }
    }

    /// Convenience for the common toast case
    pub fn toast(&self, message: impl Into<String>) {
        self.emit(SideEffect::ShowToast(message.into()));
    }
}

/// Create the effect stream for one session
pub fn channel() -> (EffectSender, cb::Receiver<SideEffect>) {
    let (tx, rx) = cb::unbounded();
    (EffectSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_arrive_in_emit_order() {
        let (effects, rx) = channel();

        effects.emit(SideEffect::ShowMenu);
        effects.toast("Saved");
        effects.emit(SideEffect::FinishedSuccessfully);

        assert_eq!(rx.recv().unwrap(), SideEffect::ShowMenu);
        assert_eq!(rx.recv().unwrap(), SideEffect::ShowToast("Saved".into()));
        assert_eq!(rx.recv().unwrap(), SideEffect::FinishedSuccessfully);
    }

    #[test]
    fn test_emit_after_consumer_drop_is_harmless() {
        let (effects, rx) = channel();
        drop(rx);

        effects.emit(SideEffect::QuickSave);
        effects.toast("still fine");
    }

    #[test]
    fn test_senders_share_one_stream() {
        let (effects, rx) = channel();
        let other = effects.clone();

        effects.emit(SideEffect::QuickSave);
        other.emit(SideEffect::QuickLoad);

        assert_eq!(rx.try_iter().count(), 2);
    }
}
