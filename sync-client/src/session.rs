//! SyncSession - drives one host/guest exchange.
//!
//! This module provides [`SyncSession`], which feeds events into the pure
//! [`Session`] state machine from sync-core and performs the I/O for the
//! actions it returns.
//!
//! # Architecture
//!
//! ```text
//! Application → SyncSession → Transport → other device
//!                   ↓    ↘
//!        sync-core Session  StateStore / BlobStore / StatusSink
//! ```
//!
//! # Example
//!
//! ```ignore
//! use todo_sync_client::{MemoryStore, SyncSession, TcpTransport, TcpTransportConfig};
//!
//! let transport = TcpTransport::new(TcpTransportConfig::default());
//! let mut session = SyncSession::host(transport, Arc::new(store));
//! let state = session.run().await;
//! session.finish().await?;
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use todo_sync_core::{
    encode_picture_data, is_local_picture, merge_host_reply, merge_sync_data,
    plan_profile_picture, Action, BlobOp, Event, LocalState, PeerId, ProfilePictureError, Role,
    Session, SessionState, SyncOption, TOMBSTONE_CLEANUP_DELAY,
};
use todo_sync_types::{OtherData, SyncData, SyncError, User, PROFILE_PICTURE_KEY};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::blob::{apply_blob_ops, BlobStore, MemoryBlobStore};
use crate::status::{StatusSink, TracingSink};
use crate::store::{StateStore, StoreError};
use crate::transport::{Transport, TransportError};

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Payload could not be encoded or decoded.
    #[error("invalid sync data: {0}")]
    Payload(#[from] SyncError),

    /// Received profile picture could not be decoded.
    #[error("profile picture: {0}")]
    ProfilePicture(#[from] ProfilePictureError),
}

/// Configuration for SyncSession.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which device's name, picture and settings survive.
    pub sync_option: SyncOption,
    /// Wait between commit and clearing tombstones.
    pub tombstone_cleanup_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sync_option: SyncOption::default(),
            tombstone_cleanup_delay: TOMBSTONE_CLEANUP_DELAY,
        }
    }
}

impl SessionConfig {
    /// Set the sync option.
    pub fn with_sync_option(mut self, option: SyncOption) -> Self {
        self.sync_option = option;
        self
    }

    /// Set the tombstone cleanup delay.
    pub fn with_tombstone_cleanup_delay(mut self, delay: Duration) -> Self {
        self.tombstone_cleanup_delay = delay;
        self
    }
}

/// One sync exchange with another device.
pub struct SyncSession<T: Transport> {
    transport: T,
    store: Arc<dyn StateStore>,
    blobs: Arc<dyn BlobStore>,
    status: Arc<dyn StatusSink>,
    config: SessionConfig,
    session: Session,
    local_id: Option<String>,
    cleanup: Option<JoinHandle<()>>,
}

impl<T: Transport> SyncSession<T> {
    /// A session that advertises an ID and waits for a guest.
    pub fn host(transport: T, store: Arc<dyn StateStore>) -> Self {
        Self::new(Role::Host, transport, store)
    }

    /// A session that dials the host at `remote_id`.
    pub fn guest(transport: T, store: Arc<dyn StateStore>, remote_id: PeerId) -> Self {
        Self::new(Role::Guest { remote_id }, transport, store)
    }

    /// Create a session with in-memory blobs, logged status and default config.
    pub fn new(role: Role, transport: T, store: Arc<dyn StateStore>) -> Self {
        let config = SessionConfig::default();
        Self {
            transport,
            store,
            blobs: Arc::new(MemoryBlobStore::new()),
            status: Arc::new(TracingSink),
            session: Session::new(role).with_cleanup_delay(config.tombstone_cleanup_delay),
            config,
            local_id: None,
            cleanup: None,
        }
    }

    /// Use `blobs` for the profile picture.
    pub fn with_blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = blobs;
        self
    }

    /// Send status updates to `status`.
    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.session = self
            .session
            .with_cleanup_delay(config.tombstone_cleanup_delay);
        self.config = config;
        self
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    /// The ID this device advertised, once the endpoint is open.
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run the exchange until it reaches a terminal state.
    ///
    /// Failures never escape: they end in [`SessionState::Errored`] or
    /// [`SessionState::Closed`] with an error status emitted.
    pub async fn run(&mut self) -> SessionState {
        let mut events = VecDeque::from([Event::StartRequested]);
        while let Some(event) = events.pop_front() {
            if let Some(next) = self.handle(event).await {
                events.push_back(next);
            }
        }
        self.session.state().clone()
    }

    /// Abandon the session: close the connection and dismiss status.
    ///
    /// A committed merge stays committed and its tombstone cleanup still runs.
    pub async fn reset(&mut self) {
        self.handle(Event::ResetRequested).await;
        self.local_id = None;
    }

    /// Wait for pending tombstone cleanup, then close the transport.
    pub async fn finish(mut self) -> Result<(), SessionError> {
        if let Some(cleanup) = self.cleanup.take() {
            if let Err(e) = cleanup.await {
                warn!("tombstone cleanup task failed: {e}");
            }
        }
        self.transport.close().await?;
        Ok(())
    }

    /// Feed one event and execute the resulting actions.
    ///
    /// The first action that yields a follow-up event ends the batch.
    async fn handle(&mut self, event: Event) -> Option<Event> {
        debug!(?event, "session event");
        let before = self.session.state().clone();
        let (session, actions) = self.session.clone().on_event(event);
        self.session = session;
        if *self.session.state() != before {
            info!(from = ?before, to = ?self.session.state(), "session state changed");
        }

        for action in actions {
            if let Some(next) = self.execute(action).await {
                return Some(next);
            }
        }
        None
    }

    async fn execute(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::OpenPeer => Some(match self.transport.open().await {
                Ok(local_id) => Event::PeerOpened { local_id },
                Err(e) => Event::PeerError {
                    error: e.to_string(),
                },
            }),
            Action::ShowPeerId { local_id } => {
                self.status.show_peer_id(&local_id);
                self.local_id = Some(local_id);
                None
            }
            Action::AwaitPeer => Some(match self.transport.accept().await {
                Ok(()) => Event::ConnectionOpened,
                Err(e) => connection_event(e),
            }),
            Action::ConnectTo { remote_id } => {
                Some(match self.transport.connect(remote_id.as_str()).await {
                    Ok(()) => Event::ConnectionOpened,
                    Err(e) => connection_event(e),
                })
            }
            Action::SendLocalState => match self.send_local_state().await {
                Ok(()) => None,
                Err(e) => Some(Event::ConnectionError {
                    error: e.to_string(),
                }),
            },
            Action::AwaitPayload => Some(match self.transport.recv().await {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(payload) => {
                        debug!(bytes = payload.len(), "payload received");
                        Event::PayloadReceived { payload }
                    }
                    Err(_) => Event::MergeFailed {
                        error: "payload is not text".to_string(),
                    },
                },
                Err(e) => connection_event(e),
            }),
            Action::MergeAndCommit { payload } => Some(match self.commit(&payload).await {
                Ok(reply) => Event::MergeCommitted { reply },
                Err(e) => {
                    warn!("merge failed: {e}");
                    Event::MergeFailed {
                        error: e.to_string(),
                    }
                }
            }),
            Action::SendReply { payload } => {
                debug!(bytes = payload.len(), "sending merged reply");
                // Already committed locally; the guest sees the hang-up.
                if let Err(e) = self.transport.send(payload.as_bytes()).await {
                    warn!("failed to send reply: {e}");
                }
                None
            }
            Action::ScheduleTombstoneCleanup { delay } => {
                self.schedule_cleanup(delay);
                None
            }
            Action::ClosePeer => {
                if let Err(e) = self.transport.close().await {
                    warn!("failed to close transport: {e}");
                }
                None
            }
            Action::DismissStatus => {
                self.status.dismiss();
                None
            }
            Action::Emit(status) => {
                self.status.show(status);
                None
            }
        }
    }

    /// Miscellaneous fields to offer the peer, with the picture inlined.
    async fn local_other_data(&self, user: &User) -> Result<Option<OtherData>, SessionError> {
        if !self.config.sync_option.exchanges_other_data() {
            return Ok(None);
        }
        let mut other = user.other_data();
        if is_local_picture(other.profile_picture.as_deref()) {
            other.profile_picture_data = self
                .blobs
                .get(PROFILE_PICTURE_KEY)
                .await?
                .map(|bytes| encode_picture_data(&bytes));
        }
        Ok(Some(other))
    }

    async fn send_local_state(&self) -> Result<(), SessionError> {
        let user = self.store.load().await?;
        let other = self.local_other_data(&user).await?;
        let payload = LocalState::from_user(&user, other.as_ref())
            .to_sync_data()
            .compress()?;
        debug!(bytes = payload.len(), "sending local state");
        self.transport.send(payload.as_bytes()).await?;
        Ok(())
    }

    /// Decode, merge and persist a payload. Returns the host's reply.
    async fn commit(&self, payload: &str) -> Result<Option<String>, SessionError> {
        let remote = SyncData::try_decompress(payload)?;
        let mut user = self.store.load().await?;
        let other = self.local_other_data(&user).await?;

        let local = LocalState::from_user(&user, other.as_ref());
        let result = if self.session.is_host() {
            merge_sync_data(&local, &remote, self.config.sync_option)
        } else {
            merge_host_reply(&local, &remote, self.config.sync_option)
        };
        let picture = result
            .adopted_other_data()
            .map(|incoming| plan_profile_picture(user.profile_picture.as_deref(), incoming))
            .transpose()?;
        let reply = if self.session.is_host() {
            Some(result.to_sync_data(true).compress()?)
        } else {
            None
        };

        result.apply(&mut user);
        // The new blob must exist before the user points at it. The old one
        // may only go once the user no longer does.
        let mut removals = Vec::new();
        if let Some(update) = picture {
            let (deletes, puts): (Vec<BlobOp>, Vec<BlobOp>) = update
                .ops
                .into_iter()
                .partition(|op| matches!(op, BlobOp::Delete { .. }));
            apply_blob_ops(self.blobs.as_ref(), &puts).await?;
            removals = deletes;
            user.profile_picture = update.profile_picture;
        }
        self.store.save(&user).await?;
        if let Err(e) = apply_blob_ops(self.blobs.as_ref(), &removals).await {
            warn!("failed to remove replaced profile picture: {e}");
        }

        info!(
            tasks = user.tasks.len(),
            categories = user.categories.len(),
            "merge committed"
        );
        Ok(reply)
    }

    fn schedule_cleanup(&mut self, delay: Duration) {
        let store = Arc::clone(&self.store);
        self.cleanup = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = async {
                let mut user = store.load().await?;
                user.clear_tombstones();
                store.save(&user).await
            }
            .await;
            match result {
                Ok(()) => debug!("tombstones cleared"),
                Err(e) => warn!("failed to clear tombstones: {e}"),
            }
        }));
    }
}

fn connection_event(error: TransportError) -> Event {
    match error {
        TransportError::ConnectionClosed => Event::ConnectionClosed,
        other => Event::ConnectionError {
            error: other.to_string(),
        },
    }
}
