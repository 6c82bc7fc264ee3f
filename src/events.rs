// Copyright 2026 Daniel Pelikan
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

//! Events reported to the presentation layer.

use tokio::sync::mpsc;
use tracing::debug;

use crate::link::LinkState;

/// Notification from the link service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link changed state.
    StatusChanged(LinkState),
    /// The recorder reported a new status byte.
    DataChanged(u8),
}

/// Fire-and-forget sender of [`LinkEvent`]s.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl EventEmitter {
    /// Create an emitter and the receiver the presentation layer listens on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn status(&self, state: LinkState) {
        self.emit(LinkEvent::StatusChanged(state));
    }

    pub fn data(&self, value: u8) {
        self.emit(LinkEvent::DataChanged(value));
    }

    /// Emit an event. Nobody listening is not an error.
    fn emit(&self, event: LinkEvent) {
        debug!("Emitting {:?}", event);
        let _ = self.tx.send(event);
    }
}
