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

//! BlueZ RFCOMM connector.

use anyhow::Result;
use bluer::rfcomm::{SocketAddr, Stream};
use bluer::Address;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

use super::transport::{Connector, DuplexStream};
use crate::link::LinkError;

/// Default RFCOMM channel of the recorder's serial port profile.
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 1;

/// Opens RFCOMM client connections through the default adapter.
pub struct RfcommConnector {
    // Held so the BlueZ session outlives every connection it opens.
    _session: bluer::Session,
    channel: u8,
}

impl RfcommConnector {
    /// Create a connector, powering on the default adapter if needed.
    pub async fn new(channel: u8) -> Result<Self> {
        info!("Initializing Bluetooth connector...");

        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            _session: session,
            channel,
        })
    }

    async fn connect(&self, address: &str) -> Result<DuplexStream, LinkError> {
        let addr: Address = address
            .parse()
            .map_err(|_| LinkError::InvalidAddress(address.to_string()))?;
        let target = SocketAddr::new(addr, self.channel);

        info!("Connecting to {} on RFCOMM channel {}", addr, self.channel);
        let stream = Stream::connect(target).await.map_err(|e| LinkError::Connect {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        let (reader, writer) = stream.into_split();
        Ok(DuplexStream::from_halves(reader, writer))
    }
}

impl Connector for RfcommConnector {
    fn open<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<DuplexStream, LinkError>> {
        self.connect(address).boxed()
    }
}
