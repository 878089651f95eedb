//! Where user-facing session status goes.

use todo_sync_core::{Severity, Status};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Receives status updates from a session.
pub trait StatusSink: Send + Sync {
    /// Show (or replace) the current status.
    fn show(&self, status: Status);

    /// Hide whatever is showing.
    fn dismiss(&self);

    /// Present this device's sync ID (as text or a QR code) so the guest can dial it.
    fn show_peer_id(&self, local_id: &str);
}

/// Logs every status through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn show(&self, status: Status) {
        match status.severity {
            Severity::Info => info!("{}", status.message),
            Severity::Success => info!(outcome = "success", "{}", status.message),
            Severity::Warning => warn!("{}", status.message),
            Severity::Error => error!("{}", status.message),
        }
    }

    fn dismiss(&self) {}

    fn show_peer_id(&self, local_id: &str) {
        info!(%local_id, "sync ID ready");
    }
}

/// What a [`ChannelSink`] forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// A status to show.
    Show(Status),
    /// Clear the current status.
    Dismiss,
    /// The ID the other device should connect to.
    PeerId(String),
}

/// Forwards status updates over an unbounded channel.
///
/// Sends after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelSink {
    fn show(&self, status: Status) {
        let _ = self.tx.send(StatusUpdate::Show(status));
    }

    fn dismiss(&self) {
        let _ = self.tx.send(StatusUpdate::Dismiss);
    }

    fn show_peer_id(&self, local_id: &str) {
        let _ = self.tx.send(StatusUpdate::PeerId(local_id.to_string()));
    }
}
