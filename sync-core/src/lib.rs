//! # sync-core
//!
//! Pure logic for todo-sync (no I/O, instant tests).
//!
//! This crate implements the merge engine, the session state machine and the
//! share-link codec without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (transport, store, blobs) is performed by `sync-client`,
//! which interprets the actions produced by [`Session`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod merge;
pub mod peer;
pub mod profile;
pub mod share;
pub mod state;

pub use merge::{merge_host_reply, merge_sync_data, LocalState, MergeResult, OtherDataOrigin, SyncOption};
pub use peer::{PeerId, PeerIdError};
pub use profile::{
    encode_picture_data, is_local_picture, plan_profile_picture, BlobOp, ProfilePictureError,
    ProfilePictureUpdate,
};
pub use share::{
    create_share_link, parse_share_link, ShareError, SharedTask, TASK_PARAM, USER_NAME_PARAM,
};
pub use state::{
    Action, Event, Role, Session, SessionState, Severity, Status, TOMBSTONE_CLEANUP_DELAY,
};
