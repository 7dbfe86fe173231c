//! Reading an image upload out of a multipart form.

use std::collections::HashMap;

use axum::extract::Multipart;
use tracing::debug;

use crate::error::ApiError;

pub const MISSING_FILE: &str = "Missing or invalid file";

/// Image types accepted for uploads, by sniffed MIME type.
pub const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// An uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A fully buffered multipart form: at most one file under the expected field name plus
/// any text fields.
#[derive(Debug, Default)]
pub struct ImageForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl ImageForm {
    /// Buffers every field of `multipart`, keeping the file sent as `file_field`.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut form = ImageForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == file_field {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?;
                form.file = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Text field value, empty when absent.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    /// The uploaded file, checked to be a named, non-empty image within `max_bytes`.
    pub fn take_image(&mut self, max_bytes: usize) -> Result<UploadedFile, ApiError> {
        let file = self
            .file
            .take()
            .filter(|f| !f.filename.is_empty() && !f.bytes.is_empty())
            .ok_or_else(|| ApiError::bad_request(MISSING_FILE))?;

        validate_image(&file, max_bytes)?;
        Ok(file)
    }
}

pub fn validate_image(file: &UploadedFile, max_bytes: usize) -> Result<(), ApiError> {
    if file.bytes.len() > max_bytes {
        return Err(ApiError::bad_request(format!(
            "file too large: {} bytes exceeds the {max_bytes} byte limit",
            file.bytes.len()
        )));
    }

    let content_type = citizenx_store::detect_content_type(&file.bytes);
    if !ACCEPTED_IMAGE_TYPES.contains(&content_type) {
        debug!("rejecting {} with type {content_type}", file.filename);
        return Err(ApiError::bad_request(format!(
            "unsupported file type {content_type}: expected JPEG, PNG, GIF or WebP"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    fn file(bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: "photo.png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn png_within_limit_is_accepted() {
        assert!(validate_image(&file(PNG), 1024).is_ok());
    }

    #[test]
    fn oversized_file_is_rejected() {
        let err = validate_image(&file(PNG), 4).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn non_image_is_rejected() {
        let err = validate_image(&file(b"%PDF-1.7 not an image"), 1024).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn missing_or_empty_file_is_reported() {
        let mut form = ImageForm::default();
        assert_eq!(form.take_image(1024).unwrap_err().to_string(), MISSING_FILE);

        form.file = Some(file(&[]));
        assert_eq!(form.take_image(1024).unwrap_err().to_string(), MISSING_FILE);
    }

    #[test]
    fn absent_fields_read_as_empty() {
        let mut form = ImageForm::default();
        form.fields.insert("title".to_string(), "Flood".to_string());
        assert_eq!(form.field("title"), "Flood");
        assert_eq!(form.field("post_category"), "");
    }
}
