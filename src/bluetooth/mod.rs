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

//! Bluetooth communication module.
//!
//! Handles the RFCOMM client link to the recorder's remote control port.

pub mod protocol;
mod rfcomm;
pub mod transport;

pub use protocol::{
    is_handshake, Level, RecorderStatus, RemoteKey, HANDSHAKE_FLAG, KEY_UP, PROMPT_SEQUENCE,
};
pub use rfcomm::{RfcommConnector, DEFAULT_RFCOMM_CHANNEL};
pub use transport::{ByteReader, Connector, DuplexStream, TransportHandle};
