//! Profile picture handling when adopting another device's `OtherData`.
//!
//! A picture is either a URL or [`LOCAL_PROFILE_PICTURE`], meaning the bytes
//! live in the local blob store under [`PROFILE_PICTURE_KEY`]. Adopting a
//! local reference requires writing the blob before the reference; replacing
//! or clearing a local reference requires deleting the old blob.

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use todo_sync_types::{OtherData, LOCAL_PROFILE_PICTURE, PROFILE_PICTURE_KEY};

/// Error while preparing a profile picture update.
#[derive(Debug, Error)]
pub enum ProfilePictureError {
    /// `profilePictureData` is not valid base64.
    #[error("invalid profile picture data: {0}")]
    InvalidData(#[from] base64::DecodeError),
}

/// A blob store operation, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOp {
    /// Store bytes under a key.
    Put {
        /// Blob key.
        key: &'static str,
        /// Image bytes.
        data: Vec<u8>,
    },
    /// Remove a key.
    Delete {
        /// Blob key.
        key: &'static str,
    },
}

/// Blob work plus the picture reference to adopt once it is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePictureUpdate {
    /// Blob writes and removals. Writes land before the user is saved,
    /// removals after.
    pub ops: Vec<BlobOp>,
    /// Then set the user's profile picture to this.
    pub profile_picture: Option<String>,
}

/// Whether a picture reference points at the local blob store.
pub fn is_local_picture(reference: Option<&str>) -> bool {
    reference == Some(LOCAL_PROFILE_PICTURE)
}

/// Encode blob bytes for `OtherData::profile_picture_data`.
pub fn encode_picture_data(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Plan the blob store work for adopting `incoming` over `current`.
pub fn plan_profile_picture(
    current: Option<&str>,
    incoming: &OtherData,
) -> Result<ProfilePictureUpdate, ProfilePictureError> {
    let incoming_ref = incoming.profile_picture.as_deref();

    if is_local_picture(incoming_ref) {
        return match &incoming.profile_picture_data {
            Some(encoded) => Ok(ProfilePictureUpdate {
                ops: vec![BlobOp::Put {
                    key: PROFILE_PICTURE_KEY,
                    data: STANDARD.decode(encoded)?,
                }],
                profile_picture: Some(LOCAL_PROFILE_PICTURE.to_string()),
            }),
            // Nothing to dereference: keep what we have.
            None => Ok(ProfilePictureUpdate {
                ops: Vec::new(),
                profile_picture: current.map(str::to_string),
            }),
        };
    }

    let ops = if is_local_picture(current) {
        vec![BlobOp::Delete {
            key: PROFILE_PICTURE_KEY,
        }]
    } else {
        Vec::new()
    };
    Ok(ProfilePictureUpdate {
        ops,
        profile_picture: incoming_ref.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(picture: Option<&str>, data: Option<&[u8]>) -> OtherData {
        OtherData {
            profile_picture: picture.map(str::to_string),
            profile_picture_data: data.map(encode_picture_data),
            ..OtherData::default()
        }
    }

    #[test]
    fn local_reference_with_data_stores_blob_first() {
        let plan = plan_profile_picture(None, &incoming(Some(LOCAL_PROFILE_PICTURE), Some(b"png")))
            .unwrap();
        assert_eq!(
            plan.ops,
            vec![BlobOp::Put {
                key: PROFILE_PICTURE_KEY,
                data: b"png".to_vec()
            }]
        );
        assert_eq!(plan.profile_picture.as_deref(), Some(LOCAL_PROFILE_PICTURE));
    }

    #[test]
    fn local_reference_without_data_keeps_current() {
        let plan = plan_profile_picture(
            Some("https://example.com/me.png"),
            &incoming(Some(LOCAL_PROFILE_PICTURE), None),
        )
        .unwrap();
        assert!(plan.ops.is_empty());
        assert_eq!(
            plan.profile_picture.as_deref(),
            Some("https://example.com/me.png")
        );
    }

    #[test]
    fn replacing_local_blob_with_url_deletes_it() {
        let plan = plan_profile_picture(
            Some(LOCAL_PROFILE_PICTURE),
            &incoming(Some("https://example.com/new.png"), None),
        )
        .unwrap();
        assert_eq!(
            plan.ops,
            vec![BlobOp::Delete {
                key: PROFILE_PICTURE_KEY
            }]
        );
        assert_eq!(
            plan.profile_picture.as_deref(),
            Some("https://example.com/new.png")
        );
    }

    #[test]
    fn clearing_local_blob_deletes_it() {
        let plan = plan_profile_picture(Some(LOCAL_PROFILE_PICTURE), &incoming(None, None)).unwrap();
        assert_eq!(plan.ops.len(), 1);
        assert!(plan.profile_picture.is_none());
    }

    #[test]
    fn url_over_url_needs_no_blob_work() {
        let plan = plan_profile_picture(Some("https://a"), &incoming(Some("https://b"), None)).unwrap();
        assert!(plan.ops.is_empty());
        assert_eq!(plan.profile_picture.as_deref(), Some("https://b"));
    }

    #[test]
    fn corrupt_blob_data_is_an_error() {
        let mut other = incoming(Some(LOCAL_PROFILE_PICTURE), None);
        other.profile_picture_data = Some("***".into());
        assert!(plan_profile_picture(None, &other).is_err());
    }
}
