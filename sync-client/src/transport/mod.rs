//! Transport abstraction for todo-sync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! direct device-to-device connection (TCP, in-process memory, mock).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented. One endpoint hosts,
//! the other dials:
//! - `open()` binds the local endpoint and returns the ID to advertise
//! - `accept()` (host) waits for the guest
//! - `connect()` (guest) dials the host's ID
//! - `send()` / `recv()` move whole compressed payloads
//! - `close()` tears down the connection and the endpoint
//!
//! # Example
//!
//! ```ignore
//! let (host, guest) = MemoryTransport::pair();
//! let id = host.open().await?;
//! guest.open().await?;
//! guest.connect(&id).await?;
//! host.accept().await?;
//! guest.send(payload.as_bytes()).await?;
//! let received = host.recv().await?;
//! ```

mod memory;
mod mock;
mod tcp;

pub use memory::MemoryTransport;
pub use mock::{MockOp, MockTransport};
pub use tcp::{TcpTransport, TcpTransportConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Maximum size of one framed payload (4 MiB).
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding the local endpoint failed.
    #[error("failed to open endpoint: {0}")]
    OpenFailed(String),

    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Frame exceeds [`MAX_MESSAGE_SIZE`].
    #[error("message too large: {size} > {max}")]
    MessageTooLarge {
        /// Offending size in bytes.
        size: usize,
        /// The limit.
        max: usize,
    },

    /// Operation timed out.
    #[error("connection timeout")]
    Timeout,
}

/// Transport trait for exchanging sync payloads with one other device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind the local endpoint and return the ID the other device dials.
    async fn open(&self) -> Result<String, TransportError>;

    /// Wait for the other device to connect (host side).
    async fn accept(&self) -> Result<(), TransportError>;

    /// Connect to the endpoint advertised as `address` (guest side).
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Send one payload.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive one payload.
    ///
    /// Blocks until data is available. Returns
    /// [`TransportError::ConnectionClosed`] once the other side hangs up.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection and release the endpoint. Idempotent.
    async fn close(&self) -> Result<(), TransportError>;
}
