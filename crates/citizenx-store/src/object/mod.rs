//! Storage for uploaded images.
//!
//! Objects are written once and never read back through this interface; callers only
//! need the public URL the object will be served from.

pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use citizenx_model::UserId;

use crate::StoreError;

/// Used when the bytes match no known signature.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key` and returns the public URL of the object.
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<String, StoreError>;
}

/// Key for a file uploaded by `user_id`: `<userID>_<filename>`.
pub fn object_key(user_id: UserId, filename: &str) -> String {
    format!("{user_id}_{filename}")
}

/// MIME type sniffed from the leading bytes of `body`.
pub fn detect_content_type(body: &[u8]) -> &'static str {
    infer::get(body)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{key}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn key_is_user_id_then_filename() {
        assert_eq!(object_key(42, "pothole.jpg"), "42_pothole.jpg");
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(
            public_url("https://cdn.example.com/", "42_a.png"),
            "https://cdn.example.com/42_a.png"
        );
        assert_eq!(
            public_url("https://cdn.example.com", "42_a.png"),
            "https://cdn.example.com/42_a.png"
        );
    }

    #[test]
    fn content_type_from_bytes() {
        assert_eq!(detect_content_type(PNG_HEADER), "image/png");
        assert_eq!(detect_content_type(b"just some text"), FALLBACK_CONTENT_TYPE);
        assert_eq!(detect_content_type(&[]), FALLBACK_CONTENT_TYPE);
    }
}
