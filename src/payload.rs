use crate::error::{Result, UploadError};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Where the uploaded bytes come from
#[derive(Debug, Clone)]
pub enum PayloadSource {
    /// A file on the local filesystem, read when the upload starts
    File(PathBuf),
    /// An in-memory buffer
    Data(Vec<u8>),
}

/// The file part of an upload. Filename and content type are sent verbatim.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub source: PayloadSource,
    pub filename: String,
    pub mime_type: String,
}

impl UploadPayload {
    /// Payload read from `path`
    pub fn file(path: impl Into<PathBuf>, filename: &str, mime_type: &str) -> Self {
        UploadPayload {
            source: PayloadSource::File(path.into()),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    /// Payload from an in-memory buffer
    pub fn data(bytes: Vec<u8>, filename: &str, mime_type: &str) -> Self {
        UploadPayload {
            source: PayloadSource::Data(bytes),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    /// Load the payload bytes. Any failure to open or read a file is
    /// reported as `FileNotFound`.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self.source {
            PayloadSource::Data(bytes) => Ok(bytes),
            PayloadSource::File(path) => {
                read_file(&path).map_err(|source| UploadError::FileNotFound { path, source })
            }
        }
    }
}

// The handle is dropped, and the file closed, on every return path.
fn read_file(path: &std::path::Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}
