//! In-process transport for tests and demos.
//!
//! [`MemoryTransport::pair`] returns two linked endpoints. The first is meant
//! to host (it advertises `memory-host`), the second to dial it. Payloads
//! travel over unbounded channels; a shared watch tracks whether the link is
//! waiting, up, or torn down.

use super::{Transport, TransportError, MAX_MESSAGE_SIZE};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

const HOST_ID: &str = "memory-host";
const GUEST_ID: &str = "memory-guest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Waiting,
    Up,
    Down,
}

/// One end of an in-process duplex link.
#[derive(Debug)]
pub struct MemoryTransport {
    local_id: &'static str,
    peer_id: &'static str,
    opened: AtomicBool,
    link: Arc<watch::Sender<Link>>,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    incoming: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryTransport {
    /// Create a linked (host, guest) pair.
    pub fn pair() -> (Self, Self) {
        let (link, _) = watch::channel(Link::Waiting);
        let link = Arc::new(link);
        let (to_guest, from_host) = mpsc::unbounded_channel();
        let (to_host, from_guest) = mpsc::unbounded_channel();

        let host = Self {
            local_id: HOST_ID,
            peer_id: GUEST_ID,
            opened: AtomicBool::new(false),
            link: Arc::clone(&link),
            outgoing: to_guest,
            incoming: Mutex::new(from_guest),
        };
        let guest = Self {
            local_id: GUEST_ID,
            peer_id: HOST_ID,
            opened: AtomicBool::new(false),
            link,
            outgoing: to_host,
            incoming: Mutex::new(from_host),
        };
        (host, guest)
    }

    fn link(&self) -> Link {
        *self.link.borrow()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self) -> Result<String, TransportError> {
        if self.link() == Link::Down {
            return Err(TransportError::OpenFailed("link torn down".into()));
        }
        self.opened.store(true, Ordering::SeqCst);
        Ok(self.local_id.to_string())
    }

    async fn accept(&self) -> Result<(), TransportError> {
        if !self.opened.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let mut rx = self.link.subscribe();
        let state = rx
            .wait_for(|link| *link != Link::Waiting)
            .await
            .map_err(|_| TransportError::ConnectionClosed)?;
        match *state {
            Link::Up => Ok(()),
            _ => Err(TransportError::ConnectionClosed),
        }
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        if address != self.peer_id {
            return Err(TransportError::ConnectionFailed(format!(
                "unknown peer {address:?}"
            )));
        }
        match self.link() {
            Link::Down => Err(TransportError::ConnectionClosed),
            _ => {
                self.link.send_replace(Link::Up);
                Ok(())
            }
        }
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::MessageTooLarge {
                size: data.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        match self.link() {
            Link::Up => self
                .outgoing
                .send(data.to_vec())
                .map_err(|_| TransportError::ConnectionClosed),
            Link::Waiting => Err(TransportError::NotConnected),
            Link::Down => Err(TransportError::ConnectionClosed),
        }
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        if self.link() == Link::Waiting {
            return Err(TransportError::NotConnected);
        }
        let mut incoming = self.incoming.lock().await;
        let mut link = self.link.subscribe();

        tokio::select! {
            biased;
            message = incoming.recv() => return message.ok_or(TransportError::ConnectionClosed),
            _ = link.wait_for(|l| *l == Link::Down) => {}
        }
        // Payloads sent before a hang-up are still delivered.
        incoming
            .try_recv()
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.link() == Link::Up
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.opened.store(false, Ordering::SeqCst);
        self.link.send_replace(Link::Down);
        Ok(())
    }
}
