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

//! Key presses on the recorder's remote port.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bluetooth::{RemoteKey, KEY_UP};
use crate::link::LinkHandle;

/// Queues key presses so each one reaches the recorder as a down/up pair.
#[derive(Clone)]
pub struct Keypad {
    tx: mpsc::UnboundedSender<RemoteKey>,
}

impl Keypad {
    /// Start the key press task. `hold` is the gap between key-down and key-up.
    pub fn spawn(link: LinkHandle, hold: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<RemoteKey>();

        tokio::spawn(async move {
            while let Some(key) = rx.recv().await {
                debug!("Pressing {}", key.as_str());
                if link.send(key.sequence()).is_err() {
                    break;
                }
                tokio::time::sleep(hold).await;
                if link.send(KEY_UP).is_err() {
                    break;
                }
            }
        });

        Self { tx }
    }

    /// Queue a key press.
    pub fn press(&self, key: RemoteKey) {
        if self.tx.send(key).is_err() {
            warn!("Dropping {}: link service has stopped", key.as_str());
        }
    }
}
