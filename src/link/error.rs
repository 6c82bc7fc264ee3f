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

//! Link errors.

use std::time::Duration;
use thiserror::Error;

/// Failures on the link to the recorder.
///
/// Inside the link service these never escape: each one becomes a
/// transition to [`LinkState::Error`](super::LinkState::Error).
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },
    #[error("invalid Bluetooth address: {0}")]
    InvalidAddress(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("not connected")]
    NotConnected,
    #[error("link service has stopped")]
    ServiceStopped,
}
