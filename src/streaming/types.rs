//! Streaming boundary types: upload policy, received files, errors

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use crate::tempfiles::{StagedFile, TempFileError};

// ============================================================================
// Media-type allow-lists
// ============================================================================

/// PDF uploads
pub const PDF_TYPES: &[&str] = &["application/pdf"];

/// Image uploads accepted for image-to-PDF conversion
pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/bmp",
    "image/gif",
    "image/tiff",
    "image/webp",
];

/// Word-processing documents accepted for conversion
pub const DOCUMENT_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

// ============================================================================
// Upload policy
// ============================================================================

/// Per-request upload constraints, validated before any handler runs
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Media types accepted for file parts
    pub allowed_types: Vec<&'static str>,

    /// Per-file byte limit; enforced chunk-by-chunk mid-stream
    pub max_file_size: u64,

    /// Maximum accepted file parts
    pub max_files: usize,

    /// Files larger than this are staged to disk instead of buffered
    pub spool_threshold: u64,

    /// The request declares exactly one required file; a disallowed or
    /// missing part fails the whole request instead of being skipped
    pub require_single: bool,
}

impl UploadPolicy {
    pub fn new(allowed_types: &[&'static str]) -> Self {
        Self {
            allowed_types: allowed_types.to_vec(),
            max_file_size: 50 * 1024 * 1024,
            max_files: 20,
            spool_threshold: 4 * 1024 * 1024,
            require_single: false,
        }
    }

    /// Exactly one required file
    pub fn single(allowed_types: &[&'static str]) -> Self {
        Self {
            max_files: 1,
            require_single: true,
            ..Self::new(allowed_types)
        }
    }

    /// Case-insensitive match on the media type's essence (parameters like
    /// `; charset=` are ignored)
    pub fn allows(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        self.allowed_types.iter().any(|t| *t == essence)
    }
}

// ============================================================================
// Received upload
// ============================================================================

/// Body of one accepted file part
#[derive(Debug)]
pub enum FileBody {
    /// Small file held in memory
    Buffered(Bytes),

    /// Large file spilled to a lifecycle-managed staged path
    Staged(StagedFile),
}

/// One accepted file part
#[derive(Debug)]
pub struct ReceivedFile {
    /// Client-supplied file name
    pub name: String,

    /// Negotiated media type
    pub content_type: String,

    /// Measured size in bytes
    pub size: u64,

    pub body: FileBody,
}

impl ReceivedFile {
    /// Read the full payload, from memory or from the staged file
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.body {
            FileBody::Buffered(bytes) => Ok(bytes.clone()),
            FileBody::Staged(staged) => Ok(tokio::fs::read(staged.path()).await?.into()),
        }
    }

    /// Release any staged backing file; buffered payloads are a no-op
    pub async fn discard(&self) {
        if let FileBody::Staged(staged) = &self.body {
            staged.cleanup().await;
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self.body, FileBody::Staged(_))
    }
}

/// Everything accepted from one multipart request
#[derive(Debug, Default)]
pub struct ReceivedUpload {
    /// File parts, in arrival order
    pub files: Vec<ReceivedFile>,

    /// Plain text form fields
    pub fields: HashMap<String, String>,
}

impl ReceivedUpload {
    /// Release every staged backing file
    pub async fn discard(&self) {
        for file in &self.files {
            file.discard().await;
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Streaming-boundary failures, translated from transport internals into a
/// small fixed taxonomy
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("file {name} exceeds the {max} byte limit")]
    FileTooLarge { name: String, max: u64 },

    #[error("too many files: limit is {max}")]
    TooManyFiles { max: usize },

    #[error("form field {name} exceeds the {max} byte limit")]
    FieldTooLarge { name: String, max: usize },

    #[error("unsupported media type: {got}")]
    UnsupportedMediaType { got: String },

    #[error("no file supplied")]
    MissingFile,

    #[error("stream transport error: {0}")]
    Transport(String),

    #[error("staging failed: {0}")]
    Staging(#[from] TempFileError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
