//! # sync-types
//!
//! Data model and wire format for todo-sync.
//!
//! This crate provides the foundational types used across all todo-sync crates:
//! - [`Task`], [`Category`], [`User`] - The to-do list state
//! - [`TaskId`], [`CategoryId`], [`Color`] - Validated identifiers and values
//! - [`SyncData`] - The envelope exchanged between peers, and its text codec
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod task;
mod user;

pub use envelope::{OtherData, OtherDataSource, SyncData, MAX_PAYLOAD_SIZE, SYNC_DATA_VERSION};
pub use error::SyncError;
pub use ids::{CategoryId, TaskId};
pub use task::{
    Category, Color, InvalidColor, Task, Timestamp, ValidationError, MAX_CATEGORY_NAME_LEN,
    MAX_TASK_DESCRIPTION_LEN, MAX_TASK_NAME_LEN,
};
pub use user::{AppSettings, DarkMode, User, LOCAL_PROFILE_PICTURE, PROFILE_PICTURE_KEY};
