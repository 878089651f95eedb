//! # sync-client
//!
//! Client library for todo-sync peer-to-peer task sync.
//!
//! This is the library applications use to run a sync exchange between two
//! devices.
//!
//! ## Features
//!
//! - **Transport Abstraction**: Pluggable transport layer (TCP, in-memory, mock)
//! - **Pluggable Storage**: [`StateStore`] for the user, [`BlobStore`] for the profile picture
//! - **Status Reporting**: [`StatusSink`] for logs or a UI channel
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_client::{JsonFileStore, SyncSession, TcpTransport, TcpTransportConfig};
//!
//! let store = Arc::new(JsonFileStore::new("user.json"));
//! let transport = TcpTransport::new(TcpTransportConfig::default());
//! let mut session = SyncSession::host(transport, store);
//!
//! let state = session.run().await;
//! session.finish().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod session;
pub mod status;
pub mod store;
pub mod transport;

pub use blob::{apply_blob_ops, BlobStore, FileBlobStore, MemoryBlobStore};
pub use session::{SessionConfig, SessionError, SyncSession};
pub use status::{ChannelSink, StatusSink, StatusUpdate, TracingSink};
pub use store::{JsonFileStore, MemoryStore, StateStore, StoreError};
pub use transport::{
    MemoryTransport, MockOp, MockTransport, TcpTransport, TcpTransportConfig, Transport,
    TransportError, MAX_MESSAGE_SIZE,
};
