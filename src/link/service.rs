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

//! Command serializer and reader loop.
//!
//! One worker task owns the connection and the [`LinkMachine`]. External
//! commands and bytes from the reader task arrive on the same queue, so
//! state changes and writes to the stream happen one at a time.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::LinkError;
use super::machine::{Effect, LinkMachine, LinkState};
use crate::bluetooth::protocol::{KEY_UP, PROMPT_SEQUENCE};
use crate::bluetooth::transport::{ByteReader, Connector, TransportHandle};
use crate::events::{EventEmitter, LinkEvent};

/// Tuning for the link service.
#[derive(Debug, Clone, Default)]
pub struct LinkSettings {
    /// Bound on opening the stream and on each write. `None` waits forever.
    pub io_timeout: Option<Duration>,
}

/// Commands accepted from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect to the recorder at a Bluetooth address.
    Connect(String),
    /// Write raw bytes to the recorder.
    Send(Vec<u8>),
    /// Drop the connection.
    Disconnect,
}

enum Request {
    Command(Command),
    Received { session: u64, byte: u8 },
    ReaderEnded { session: u64, clean: bool },
    Shutdown,
}

/// Cloneable handle for submitting commands to the link service.
#[derive(Clone)]
pub struct LinkHandle {
    tx: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<LinkState>,
}

impl LinkHandle {
    /// Queue a command. Never waits for it to run.
    pub fn submit(&self, command: Command) -> Result<(), LinkError> {
        self.tx
            .send(Request::Command(command))
            .map_err(|_| LinkError::ServiceStopped)
    }

    pub fn connect(&self, address: impl Into<String>) -> Result<(), LinkError> {
        self.submit(Command::Connect(address.into()))
    }

    pub fn send(&self, payload: impl Into<Vec<u8>>) -> Result<(), LinkError> {
        self.submit(Command::Send(payload.into()))
    }

    pub fn disconnect(&self) -> Result<(), LinkError> {
        self.submit(Command::Disconnect)
    }

    /// Last state published by the service.
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Disconnect after the already queued commands and stop the service.
    pub fn shutdown(&self) -> Result<(), LinkError> {
        self.tx
            .send(Request::Shutdown)
            .map_err(|_| LinkError::ServiceStopped)
    }

    /// Resolves once the service task has exited.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

struct Connection {
    address: String,
    session: u64,
    handle: TransportHandle,
    reader: JoinHandle<()>,
}

/// The serializer worker.
pub struct LinkService {
    connector: Arc<dyn Connector>,
    settings: LinkSettings,
    machine: LinkMachine,
    connection: Option<Connection>,
    next_session: u64,
    events: EventEmitter,
    state_tx: watch::Sender<LinkState>,
    requests: mpsc::WeakUnboundedSender<Request>,
}

impl LinkService {
    /// Start the service on the current tokio runtime.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        settings: LinkSettings,
    ) -> (LinkHandle, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::Idle);
        let (events, event_rx) = EventEmitter::channel();

        let service = Self {
            connector,
            settings,
            machine: LinkMachine::new(),
            connection: None,
            next_session: 0,
            events,
            state_tx,
            requests: tx.downgrade(),
        };
        tokio::spawn(service.run(rx));

        let handle = LinkHandle {
            tx,
            state: state_rx,
        };
        (handle, event_rx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Request>) {
        info!("Link service started");

        while let Some(request) = rx.recv().await {
            match request {
                Request::Command(Command::Connect(address)) => self.handle_connect(address).await,
                Request::Command(Command::Send(payload)) => self.handle_send(&payload).await,
                Request::Command(Command::Disconnect) => self.handle_disconnect().await,
                Request::Received { session, byte } => self.handle_byte(session, byte).await,
                Request::ReaderEnded { session, clean } => {
                    self.handle_reader_ended(session, clean).await
                }
                Request::Shutdown => {
                    self.handle_disconnect().await;
                    break;
                }
            }
        }

        self.teardown().await;
        info!("Link service stopped");
    }

    async fn handle_connect(&mut self, address: String) {
        let live = matches!(
            self.machine.state(),
            LinkState::Connecting | LinkState::Connected | LinkState::Synced
        );
        let same_peer = self
            .connection
            .as_ref()
            .is_some_and(|c| c.address == address);

        if live && same_peer {
            info!("Already connected to {}, re-probing", address);
            if self.write(&PROMPT_SEQUENCE).await.is_ok() {
                if let Some(last) = self.machine.last_reported() {
                    self.events.data(last);
                }
            }
            return;
        }

        self.teardown().await;

        let opened = match self.settings.io_timeout {
            Some(limit) => tokio::time::timeout(limit, self.connector.open(&address))
                .await
                .unwrap_or(Err(LinkError::Timeout(limit))),
            None => self.connector.open(&address).await,
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                error!("Connection to {} failed: {}", address, e);
                self.fail().await;
                return;
            }
        };

        let Some(requests) = self.requests.upgrade() else {
            // Every handle is gone; nobody can observe this connection.
            return;
        };

        self.next_session += 1;
        let session = self.next_session;
        let (handle, reader) = stream.into_parts(self.settings.io_timeout);
        let reader = tokio::spawn(read_loop(session, reader, requests));

        info!("Connected to {} (session {})", address, session);
        self.connection = Some(Connection {
            address,
            session,
            handle,
            reader,
        });
        self.machine.reset_for_connect();
        self.publish(LinkState::Connecting);

        // Failure is handled inside write.
        let _ = self.write(&PROMPT_SEQUENCE).await;
    }

    async fn handle_send(&mut self, payload: &[u8]) {
        let state = self.machine.state();
        if self.connection.is_none() || !state.accepts_writes() {
            warn!(
                "Dropping {} byte send: link is {}",
                payload.len(),
                state.as_str()
            );
            return;
        }
        let _ = self.write(payload).await;
    }

    async fn handle_disconnect(&mut self) {
        self.teardown().await;
        self.transition(LinkState::Idle);
    }

    async fn handle_byte(&mut self, session: u64, byte: u8) {
        if !self.is_current(session) {
            return;
        }
        debug!("Received {:#04x}", byte);

        for effect in self.machine.feed(byte) {
            match effect {
                Effect::Status(state) => self.publish(state),
                Effect::Data(value) => self.events.data(value),
                Effect::SendKeyUp => {
                    if self.write(&KEY_UP).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    async fn handle_reader_ended(&mut self, session: u64, clean: bool) {
        if !self.is_current(session) {
            debug!("Ignoring end of stale session {}", session);
            return;
        }

        if clean {
            info!("Recorder closed the connection");
            self.teardown().await;
            self.transition(LinkState::Idle);
        } else {
            self.fail().await;
        }
    }

    /// Write to the live stream. Any failure tears the link down into `Error`.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let connection = self.connection.as_mut().ok_or(LinkError::NotConnected)?;

        if let Err(e) = connection.handle.write(bytes).await {
            error!("Write to {} failed: {}", connection.address, e);
            self.fail().await;
            return Err(e);
        }
        Ok(())
    }

    async fn fail(&mut self) {
        self.teardown().await;
        self.transition(LinkState::Error);
    }

    /// Close the connection, if any, and wait for its reader to exit.
    async fn teardown(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };

        info!("Closing connection to {}", connection.address);
        connection.handle.close().await;
        if let Err(e) = connection.reader.await {
            warn!("Reader task for {} ended abnormally: {}", connection.address, e);
        }
    }

    fn is_current(&self, session: u64) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.session == session)
    }

    fn transition(&mut self, state: LinkState) {
        self.machine.set_state(state);
        self.publish(state);
    }

    fn publish(&self, state: LinkState) {
        info!("Link state: {}", state.as_str());
        self.state_tx.send_replace(state);
        self.events.status(state);
    }
}

/// Forward bytes to the serializer until the stream ends or is closed.
async fn read_loop(session: u64, mut reader: ByteReader, requests: mpsc::UnboundedSender<Request>) {
    debug!("Reader for session {} started", session);

    let clean = loop {
        match reader.read_byte().await {
            Ok(Some(byte)) => {
                if requests.send(Request::Received { session, byte }).is_err() {
                    return;
                }
            }
            Ok(None) => break true,
            Err(e) => {
                error!("Read failed on session {}: {}", session, e);
                break false;
            }
        }
    };

    debug!("Reader for session {} finished", session);
    let _ = requests.send(Request::ReaderEnded { session, clean });
}
