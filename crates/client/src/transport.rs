//! Transport - one bidirectional byte stream to the game server
//!
//! Owns the socket halves and the [`FrameBuffer`]. Reading yields complete
//! frames only; the sequence ends when the peer closes the stream (EOF,
//! connection reset, or `</protocol>`). No retries happen at this layer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::ConnectionError;
use crate::protocol::{Frame, FrameBuffer, EPILOGUE};

/// Read size per syscall.
const READ_CHUNK: usize = 16 * 1024;

pub struct Transport<S = TcpStream> {
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
    frames: FrameBuffer,
    chunk: Vec<u8>,
    peer: String,
    /// Inbound side still delivering frames.
    open: bool,
    /// Outbound side shut down.
    shut: bool,
}

impl Transport<TcpStream> {
    /// Connect to the game server.
    pub async fn connect(
        host: &str,
        port: u16,
        max_frame_bytes: usize,
    ) -> Result<Self, ConnectionError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ConnectionError::Connect {
                addr: addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        debug!(%addr, "connected");
        Ok(Self::from_stream(stream, addr, max_frame_bytes))
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap an already connected stream.
    pub fn from_stream(stream: S, peer: impl Into<String>, max_frame_bytes: usize) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer,
            frames: FrameBuffer::new(max_frame_bytes),
            chunk: vec![0u8; READ_CHUNK],
            peer: peer.into(),
            open: true,
            shut: false,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_open(&self) -> bool {
        self.open && !self.shut
    }

    /// Write one encoded message.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        if self.shut {
            return Err(ConnectionError::Closed);
        }
        trace!(peer = %self.peer, bytes = bytes.len(), "send");
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next complete frame.
    ///
    /// `None` once the peer has closed the stream. Cancel-safe: dropping the
    /// future loses no buffered bytes.
    pub async fn next_frame(&mut self) -> Option<Result<Frame, ConnectionError>> {
        loop {
            if !self.open {
                return None;
            }

            match self.frames.next_frame() {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => {}
                Err(e) => {
                    self.open = false;
                    return Some(Err(e.into()));
                }
            }

            if self.frames.is_ended() {
                debug!(peer = %self.peer, "peer closed the protocol stream");
                self.open = false;
                return None;
            }

            match self.reader.read(&mut self.chunk).await {
                Ok(0) => {
                    debug!(peer = %self.peer, "eof");
                    self.open = false;
                    return None;
                }
                Ok(n) => self.frames.push(&self.chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                    debug!(peer = %self.peer, "connection reset");
                    self.open = false;
                    return None;
                }
                Err(e) => {
                    self.open = false;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    /// Close both directions. Idempotent.
    pub async fn close(&mut self) {
        self.open = false;
        if self.shut {
            return;
        }
        self.shut = true;
        let _ = self.writer.write_all(EPILOGUE).await;
        let _ = self.writer.shutdown().await;
        debug!(peer = %self.peer, "transport closed");
    }
}
