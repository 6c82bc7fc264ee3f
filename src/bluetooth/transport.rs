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

//! Byte-stream transport to the recorder.
//!
//! A [`Connector`] opens a [`DuplexStream`] to a peer address. The stream is
//! then split into a [`TransportHandle`] (write/close, owned by the link
//! service) and a [`ByteReader`] (owned by the reader task). Closing the
//! handle wakes any pending read, which then reports end of stream.

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::debug;

use crate::link::LinkError;

/// Boxed read half of a peer stream.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of a peer stream.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A connected duplex byte stream, not yet split into handle and reader.
pub struct DuplexStream {
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl DuplexStream {
    /// Wrap a stream that is both readable and writable.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::from_halves(reader, writer)
    }

    /// Wrap already split halves.
    pub fn from_halves<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Split into the owning handle and the reader side.
    pub fn into_parts(self, io_timeout: Option<Duration>) -> (TransportHandle, ByteReader) {
        let (closed_tx, closed_rx) = watch::channel(false);
        let handle = TransportHandle {
            writer: self.writer,
            closed: closed_tx,
            io_timeout,
        };
        let reader = ByteReader {
            reader: self.reader,
            closed: closed_rx,
        };
        (handle, reader)
    }
}

/// Connect-by-address primitive.
pub trait Connector: Send + Sync + 'static {
    /// Open a stream to the peer at `address`.
    fn open<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<DuplexStream, LinkError>>;
}

/// Owning side of a live stream: writes and teardown.
pub struct TransportHandle {
    writer: BoxedWriter,
    closed: watch::Sender<bool>,
    io_timeout: Option<Duration>,
}

impl TransportHandle {
    /// Write all of `bytes` and flush.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.is_closed() {
            return Err(LinkError::NotConnected);
        }

        let writer = &mut self.writer;
        let write = async move {
            writer.write_all(bytes).await?;
            writer.flush().await
        };

        match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| LinkError::Timeout(limit))??,
            None => write.await?,
        }

        debug!("Wrote {} bytes: {:02x?}", bytes.len(), bytes);
        Ok(())
    }

    /// Close the stream. Safe to call repeatedly and after failures.
    pub async fn close(&mut self) {
        if self.closed.send_replace(true) {
            return;
        }
        // The peer may already be gone; a failed or stalled shutdown changes nothing.
        let shutdown = self.writer.shutdown();
        match self.io_timeout {
            Some(limit) => {
                if !matches!(tokio::time::timeout(limit, shutdown).await, Ok(Ok(()))) {
                    debug!("Transport shutdown did not complete cleanly");
                }
            }
            None => {
                let _ = shutdown.await;
            }
        }
        debug!("Transport closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Reading side of a live stream.
pub struct ByteReader {
    reader: BoxedReader,
    closed: watch::Receiver<bool>,
}

impl ByteReader {
    /// Read one byte. `Ok(None)` means the stream ended or was closed locally.
    pub async fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        let Self { reader, closed } = self;

        tokio::select! {
            biased;
            _ = wait_closed(closed) => Ok(None),
            read = reader.read_u8() => match read {
                Ok(byte) => Ok(Some(byte)),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
                Err(e) => Err(LinkError::Io(e)),
            },
        }
    }
}

/// Resolves once the handle is closed or dropped.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed || closed.changed().await.is_err() {
            return;
        }
    }
}
