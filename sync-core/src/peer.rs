//! Peer identifiers exchanged between host and guest.
//!
//! The host's transport assigns it an ID, which is shown to the user (as a
//! QR code or plain text). The guest scans or types that ID back in. The ID
//! is opaque to this crate: the only normalization is trimming whitespace
//! picked up by scanners and clipboards.

use std::fmt;

/// Error type for peer ID parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerIdError {
    /// Nothing left after trimming.
    Empty,
    /// Contains whitespace or control characters inside the ID.
    InvalidCharacters(String),
}

impl fmt::Display for PeerIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerIdError::Empty => write!(f, "peer ID is empty"),
            PeerIdError::InvalidCharacters(id) => {
                write!(f, "peer ID {:?} contains whitespace or control characters", id)
            }
        }
    }
}

impl std::error::Error for PeerIdError {}

/// The address a guest connects to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    /// Parse user input (typed or scanned), trimming surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, PeerIdError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PeerIdError::Empty);
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(PeerIdError::InvalidCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The ID as handed to the transport.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The string to render as a QR code.
    pub fn to_qr_payload(&self) -> String {
        self.0.clone()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PeerId {
    type Err = PeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_scanner_noise() {
        let id = PeerId::parse("  127.0.0.1:7878\r\n").unwrap();
        assert_eq!(id.as_str(), "127.0.0.1:7878");
    }

    #[test]
    fn qr_payload_is_the_id() {
        let id = PeerId::parse("abc-123").unwrap();
        assert_eq!(id.to_qr_payload(), "abc-123");
        assert_eq!(PeerId::parse(&id.to_qr_payload()).unwrap(), id);
    }

    #[test]
    fn rejects_blank_input() {
        assert_eq!(PeerId::parse(""), Err(PeerIdError::Empty));
        assert_eq!(PeerId::parse(" \t\n"), Err(PeerIdError::Empty));
    }

    #[test]
    fn rejects_inner_whitespace() {
        assert!(matches!(
            PeerId::parse("abc def"),
            Err(PeerIdError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn error_display() {
        assert_eq!(PeerIdError::Empty.to_string(), "peer ID is empty");
    }
}
