//! Scripted transport for testing.
//!
//! Payloads to hand out from `recv()` are queued up front; everything the
//! code under test sends is captured. Any operation can be made to fail once.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// ID returned by [`MockTransport::open`] unless overridden.
const DEFAULT_LOCAL_ID: &str = "mock-peer";

/// A transport operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// `open()`
    Open,
    /// `accept()`
    Accept,
    /// `connect()`
    Connect,
    /// `send()`
    Send,
    /// `recv()`
    Recv,
}

/// Scripted transport for testing.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// session.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    local_id: Option<String>,
    opened: bool,
    connected: bool,
    closed: bool,
    dialed: Option<String>,
    sent: Vec<Vec<u8>>,
    script: VecDeque<Vec<u8>>,
    failures: HashMap<MockOp, String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that advertises `id` from `open()`.
    pub fn with_local_id(id: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.state().local_id = Some(id.into());
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a payload for a future `recv()`.
    pub fn queue_payload(&self, data: impl Into<Vec<u8>>) {
        self.state().script.push_back(data.into());
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state().sent.clone()
    }

    /// Sent payloads decoded as UTF-8 (lossy).
    pub fn sent_text(&self) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// The address passed to `connect()`, if any.
    pub fn dialed(&self) -> Option<String> {
        self.state().dialed.clone()
    }

    /// True once `close()` has been called.
    pub fn was_closed(&self) -> bool {
        self.state().closed
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: MockOp, error: impl Into<String>) {
        self.state().failures.insert(op, error.into());
    }

    fn take_failure(state: &mut MockState, op: MockOp) -> Option<String> {
        state.failures.remove(&op)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self) -> Result<String, TransportError> {
        let mut state = self.state();
        if let Some(error) = Self::take_failure(&mut state, MockOp::Open) {
            return Err(TransportError::OpenFailed(error));
        }
        state.opened = true;
        state.closed = false;
        Ok(state
            .local_id
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_ID.to_string()))
    }

    async fn accept(&self) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.opened {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = Self::take_failure(&mut state, MockOp::Accept) {
            return Err(TransportError::ConnectionFailed(error));
        }
        state.connected = true;
        Ok(())
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        if let Some(error) = Self::take_failure(&mut state, MockOp::Connect) {
            return Err(TransportError::ConnectionFailed(error));
        }
        state.connected = true;
        state.dialed = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = Self::take_failure(&mut state, MockOp::Send) {
            return Err(TransportError::SendFailed(error));
        }
        state.sent.push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = Self::take_failure(&mut state, MockOp::Recv) {
            return Err(TransportError::ReceiveFailed(error));
        }
        // An exhausted script behaves like the peer hanging up.
        state
            .script
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.connected = false;
        state.opened = false;
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_returns_configured_id() {
        assert_eq!(MockTransport::new().open().await.unwrap(), DEFAULT_LOCAL_ID);
        let mock = MockTransport::with_local_id("host-42");
        assert_eq!(mock.open().await.unwrap(), "host-42");
    }

    #[tokio::test]
    async fn accept_requires_open() {
        let mock = MockTransport::new();
        assert!(matches!(
            mock.accept().await,
            Err(TransportError::NotConnected)
        ));
        mock.open().await.unwrap();
        mock.accept().await.unwrap();
        assert!(mock.is_connected());
    }

    #[tokio::test]
    async fn connect_records_address() {
        let mock = MockTransport::new();
        mock.connect("host-42").await.unwrap();
        assert_eq!(mock.dialed().as_deref(), Some("host-42"));
    }

    #[tokio::test]
    async fn scripted_exchange() {
        let mock = MockTransport::new();
        mock.connect("h").await.unwrap();
        mock.queue_payload("reply");

        mock.send(b"hello").await.unwrap();
        assert_eq!(mock.recv().await.unwrap(), b"reply");
        assert_eq!(mock.sent_text(), vec!["hello".to_string()]);

        // script exhausted
        assert!(matches!(
            mock.recv().await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn io_requires_connection() {
        let mock = MockTransport::new();
        assert!(matches!(
            mock.send(b"x").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(mock.recv().await, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn failures_fire_once() {
        let mock = MockTransport::new();
        mock.fail_next(MockOp::Connect, "unreachable");
        assert!(matches!(
            mock.connect("h").await,
            Err(TransportError::ConnectionFailed(_))
        ));
        assert!(!mock.is_connected());
        mock.connect("h").await.unwrap();

        mock.fail_next(MockOp::Send, "full");
        assert!(matches!(
            mock.send(b"x").await,
            Err(TransportError::SendFailed(_))
        ));
        mock.send(b"x").await.unwrap();

        mock.fail_next(MockOp::Open, "port in use");
        assert!(matches!(mock.open().await, Err(TransportError::OpenFailed(_))));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.connect("h").await.unwrap();
        mock.send(b"x").await.unwrap();
        mock.close().await.unwrap();

        assert_eq!(handle.sent().len(), 1);
        assert!(handle.was_closed());
        assert!(!handle.is_connected());
    }
}
