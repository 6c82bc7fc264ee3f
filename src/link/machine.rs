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

//! Handshake and status tracking, one byte at a time.

use crate::bluetooth::protocol::{is_handshake, HANDSHAKE_FLAG};

/// State of the link to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No connection.
    Idle,
    /// Stream open, handshake in progress.
    Connecting,
    /// Stream open. The machine never enters it and treats it like
    /// `Connecting`.
    Connected,
    /// Recorder is sending plain status bytes.
    Synced,
    /// The last connection attempt or stream failed.
    Error,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Idle => "Idle",
            LinkState::Connecting => "Connecting...",
            LinkState::Connected => "Connected",
            LinkState::Synced => "Synced",
            LinkState::Error => "Error",
        }
    }

    /// Whether writes to the stream are allowed in this state.
    pub fn accepts_writes(&self) -> bool {
        matches!(
            self,
            LinkState::Connecting | LinkState::Connected | LinkState::Synced
        )
    }
}

/// Side effect produced by feeding a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Report a new link state.
    Status(LinkState),
    /// Report a changed status byte.
    Data(u8),
    /// Answer the recorder with a key-up sequence.
    SendKeyUp,
}

/// Pure link state machine.
#[derive(Debug, Clone)]
pub struct LinkMachine {
    state: LinkState,
    awaiting_second: bool,
    last_reported: Option<u8>,
}

impl Default for LinkMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMachine {
    pub fn new() -> Self {
        Self {
            state: LinkState::Idle,
            awaiting_second: false,
            last_reported: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Last status byte forwarded as data, if any since the last sync.
    pub fn last_reported(&self) -> Option<u8> {
        self.last_reported
    }

    /// Enter `Connecting` for a freshly opened stream.
    pub fn reset_for_connect(&mut self) {
        self.state = LinkState::Connecting;
        self.awaiting_second = false;
        self.last_reported = None;
    }

    /// Force a state, e.g. after teardown.
    pub fn set_state(&mut self, state: LinkState) {
        if state != LinkState::Synced {
            self.last_reported = None;
        }
        self.awaiting_second = false;
        self.state = state;
    }

    /// Feed one received byte and collect the resulting effects in order.
    pub fn feed(&mut self, byte: u8) -> Vec<Effect> {
        let mut effects = Vec::new();

        match self.state {
            LinkState::Idle | LinkState::Error => {
                self.last_reported = None;
                self.awaiting_second = false;
            }
            LinkState::Connecting | LinkState::Connected => {
                if self.awaiting_second {
                    self.awaiting_second = false;
                    if !is_handshake(byte) {
                        self.enter_synced(&mut effects);
                    }
                } else if !is_handshake(byte) {
                    self.enter_synced(&mut effects);
                } else if byte == HANDSHAKE_FLAG {
                    self.awaiting_second = true;
                    effects.push(Effect::SendKeyUp);
                }
            }
            LinkState::Synced => {
                if is_handshake(byte) {
                    self.state = LinkState::Connecting;
                    self.awaiting_second = true;
                    self.last_reported = None;
                    effects.push(Effect::Status(LinkState::Connecting));
                    effects.push(Effect::SendKeyUp);
                } else if self.last_reported != Some(byte) {
                    self.last_reported = Some(byte);
                    effects.push(Effect::Data(byte));
                }
            }
        }

        effects
    }

    fn enter_synced(&mut self, effects: &mut Vec<Effect>) {
        self.state = LinkState::Synced;
        self.last_reported = None;
        effects.push(Effect::Status(LinkState::Synced));
    }
}
