//! TcpTransport - direct device-to-device transport over TCP.
//!
//! The host binds a listener and advertises its `ip:port`; the guest dials
//! it. Each payload is one frame: a 4-byte big-endian length followed by the
//! bytes.

use super::{Transport, TransportError, MAX_MESSAGE_SIZE};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::debug;

/// Configuration for TcpTransport.
#[derive(Clone, Debug)]
pub struct TcpTransportConfig {
    /// Address the listener binds to in `open()`.
    pub bind_address: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Send/recv operation timeout.
    pub operation_timeout: Duration,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            connect_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(60),
        }
    }
}

impl TcpTransportConfig {
    /// Set the bind address.
    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the send/recv timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// TcpTransport implements the Transport trait over a single TCP stream.
///
/// # Example
///
/// ```ignore
/// let host = TcpTransport::new(TcpTransportConfig::default());
/// let id = host.open().await?;   // e.g. "127.0.0.1:49152"
/// host.accept().await?;
/// let payload = host.recv().await?;
/// ```
pub struct TcpTransport {
    config: TcpTransportConfig,
    listener: Mutex<Option<TcpListener>>,
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    connected: AtomicBool,
}

impl TcpTransport {
    /// Create an unopened transport.
    pub fn new(config: TcpTransportConfig) -> Self {
        Self {
            config,
            listener: Mutex::new(None),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    async fn attach(&self, stream: TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }
        let (read, write) = stream.into_split();
        *self.reader.lock().await = Some(read);
        *self.writer.lock().await = Some(write);
        self.connected.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&self) -> Result<String, TransportError> {
        let listener = TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|e| {
                TransportError::OpenFailed(format!("bind {}: {e}", self.config.bind_address))
            })?;
        let address = listener
            .local_addr()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?
            .to_string();
        *self.listener.lock().await = Some(listener);
        debug!(%address, "listening");
        Ok(address)
    }

    async fn accept(&self) -> Result<(), TransportError> {
        // One connection per session: the listener is consumed here so a
        // concurrent close() never waits on a pending accept.
        let listener = self
            .listener
            .lock()
            .await
            .take()
            .ok_or(TransportError::NotConnected)?;
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("accept failed: {e}")))?;
        debug!(%peer, "accepted connection");
        self.attach(stream).await;
        Ok(())
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(format!("{address}: {e}")))?;
        self.attach(stream).await;
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        tokio::time::timeout(self.config.operation_timeout, write_frame(writer, data))
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(TransportError::NotConnected)?;
        let result = tokio::time::timeout(self.config.operation_timeout, read_frame(reader))
            .await
            .map_err(|_| TransportError::Timeout)?;
        if matches!(result, Err(TransportError::ConnectionClosed)) {
            self.connected.store(false, Ordering::SeqCst);
        }
        result
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.writer.lock().await.take() {
            // Peer may already be gone.
            writer.shutdown().await.ok();
        }
        self.reader.lock().await.take();
        self.listener.lock().await.take();
        Ok(())
    }
}

/// Write one length-prefixed frame.
pub(crate) async fn write_frame<W>(writer: &mut W, data: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(TransportError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    // Length-prefixed framing (4 bytes, big-endian)
    let len = (data.len() as u32).to_be_bytes();
    writer
        .write_all(&len)
        .await
        .map_err(|e| TransportError::SendFailed(format!("Failed to write length: {e}")))?;
    writer
        .write_all(data)
        .await
        .map_err(|e| TransportError::SendFailed(format!("Failed to write data: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::SendFailed(format!("Failed to flush: {e}")))
}

/// Read one length-prefixed frame.
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::ConnectionClosed
        } else {
            TransportError::ReceiveFailed(format!("Failed to read length: {e}"))
        }
    })?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(TransportError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| TransportError::ReceiveFailed(format!("Failed to read data: {e}")))?;
    Ok(data)
}
