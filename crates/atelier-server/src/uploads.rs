//! Spooled multipart form reading.
//!
//! Each part is buffered in memory until it crosses the configured
//! threshold, then rolled over to an anonymous temporary file. Callers pull
//! parts out by field name once the whole body has been read.

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use axum::extract::Multipart;
use tempfile::SpooledTempFile;

use crate::api::ApiError;

/// One received multipart part.
pub struct UploadedFile {
    /// Form field the part was sent under.
    pub field_name: String,
    /// Client-supplied file name, if any.
    pub filename: Option<String>,
    /// Client-supplied content type, if any.
    pub content_type: Option<String>,
    size: usize,
    spool: SpooledTempFile,
}

impl UploadedFile {
    /// Number of bytes received.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the part outgrew memory and now lives in a temp file.
    pub fn is_on_disk(&self) -> bool {
        self.spool.is_rolled()
    }

    /// Reads the whole part back.
    pub fn into_bytes(mut self) -> std::io::Result<Vec<u8>> {
        self.spool.seek(SeekFrom::Start(0))?;
        let mut data = Vec::with_capacity(self.size);
        self.spool.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("field_name", &self.field_name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("on_disk", &self.is_on_disk())
            .finish()
    }
}

/// A fully received multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    parts: Vec<UploadedFile>,
}

impl MultipartForm {
    /// Drains `multipart`, spooling every part.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::PayloadTooLarge` when the body limit is hit and
    /// `ApiError::BadRequest` for a malformed body.
    pub async fn read(mut multipart: Multipart, spool_threshold: usize) -> Result<Self, ApiError> {
        let mut parts = Vec::new();

        while let Some(mut field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            let mut spool = SpooledTempFile::new(spool_threshold);
            let mut size = 0;
            while let Some(chunk) = field.chunk().await? {
                spool.write_all(&chunk).map_err(|e| {
                    ApiError::InternalServerError(format!("failed to spool upload: {}", e))
                })?;
                size += chunk.len();
            }

            tracing::debug!(
                field = %field_name,
                size,
                on_disk = spool.is_rolled(),
                "received form part"
            );

            parts.push(UploadedFile {
                field_name,
                filename,
                content_type,
                size,
                spool,
            });
        }

        Ok(Self { parts })
    }

    /// Removes and returns the first part sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile, ApiError> {
        let index = self
            .parts
            .iter()
            .position(|part| part.field_name == name)
            .ok_or_else(|| missing_field(name))?;
        Ok(self.parts.remove(index))
    }

    /// Removes and returns every part sent under `name`, in order. At least
    /// one is required.
    pub fn take_files(&mut self, name: &str) -> Result<Vec<UploadedFile>, ApiError> {
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.parts)
            .into_iter()
            .partition(|part| part.field_name == name);
        self.parts = rest;

        if taken.is_empty() {
            return Err(missing_field(name));
        }
        Ok(taken)
    }

    /// Removes the first part sent under `name` and decodes it as UTF-8 text.
    pub fn take_text(&mut self, name: &str) -> Result<String, ApiError> {
        let data = self.take_file(name)?.into_bytes().map_err(|e| {
            ApiError::InternalServerError(format!("failed to read form field: {}", e))
        })?;
        String::from_utf8(data)
            .map_err(|_| ApiError::Unprocessable(format!("form field is not valid UTF-8: {}", name)))
    }
}

fn missing_field(name: &str) -> ApiError {
    ApiError::Unprocessable(format!("missing form field: {}", name))
}
