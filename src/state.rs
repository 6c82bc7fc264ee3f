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

//! Application state management.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::bluetooth::RecorderStatus;
use crate::link::LinkState;

/// Shared state of the remote, as seen by the presentation layer.
#[derive(Debug)]
pub struct RemoteState {
    /// Current link state.
    pub link_state: RwLock<LinkState>,

    /// Last decoded recorder status.
    pub recorder: RwLock<Option<RecorderStatus>>,

    /// Consecutive connection errors since the last sync.
    pub connection_errors: RwLock<u32>,
}

impl Default for RemoteState {
    fn default() -> Self {
        Self {
            link_state: RwLock::new(LinkState::Idle),
            recorder: RwLock::new(None),
            connection_errors: RwLock::new(0),
        }
    }
}

impl RemoteState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a link state change. Sync clears the error count, errors add to it.
    pub fn record_status(&self, state: LinkState) {
        *self.link_state.write() = state;
        match state {
            LinkState::Synced => *self.connection_errors.write() = 0,
            LinkState::Error => *self.connection_errors.write() += 1,
            LinkState::Idle => *self.recorder.write() = None,
            _ => {}
        }
    }

    /// Record a status byte and return its decoded form.
    pub fn record_data(&self, value: u8) -> RecorderStatus {
        let status = RecorderStatus::decode(value);
        *self.recorder.write() = Some(status);
        status
    }

    pub fn get_link_state(&self) -> LinkState {
        *self.link_state.read()
    }

    pub fn get_recorder(&self) -> Option<RecorderStatus> {
        *self.recorder.read()
    }

    pub fn is_synced(&self) -> bool {
        self.get_link_state() == LinkState::Synced
    }

    pub fn connection_errors(&self) -> u32 {
        *self.connection_errors.read()
    }

    /// Start counting again, e.g. when the user asks to reconnect.
    pub fn reset_errors(&self) {
        *self.connection_errors.write() = 0;
    }

    /// Whether another reconnect attempt is allowed.
    pub fn should_retry(&self, max_errors: u32) -> bool {
        self.connection_errors() <= max_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_counter() {
        let state = RemoteState::new();
        for _ in 0..3 {
            state.record_status(LinkState::Error);
        }
        assert_eq!(state.connection_errors(), 3);
        assert!(state.should_retry(3));

        state.record_status(LinkState::Error);
        assert!(!state.should_retry(3));

        state.record_status(LinkState::Connecting);
        state.record_status(LinkState::Synced);
        assert_eq!(state.connection_errors(), 0);
        assert!(state.is_synced());
    }

    #[test]
    fn test_recorder_status_tracking() {
        let state = RemoteState::new();
        let status = state.record_data(0x21);
        assert!(status.recording);
        assert_eq!(state.get_recorder(), Some(status));

        state.record_status(LinkState::Idle);
        assert_eq!(state.get_recorder(), None);
    }
}
