//! Error types for todo-sync payloads.

use thiserror::Error;

/// Errors that can occur while encoding or decoding sync payloads.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// DEFLATE compression or decompression failed
    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),

    /// The payload is not valid URL-safe base64
    #[error("invalid payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Decompressed payload exceeds the size cap
    #[error("payload too large (limit {limit} bytes)")]
    PayloadTooLarge {
        /// The configured limit in bytes.
        limit: usize,
    },

    /// Envelope schema version not understood
    #[error("unsupported sync data version: {0}")]
    UnsupportedVersion(u32),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::UnsupportedVersion(9);
        assert_eq!(err.to_string(), "unsupported sync data version: 9");

        let err = SyncError::PayloadTooLarge { limit: 16 };
        assert_eq!(err.to_string(), "payload too large (limit 16 bytes)");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
