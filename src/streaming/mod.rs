//! Streaming boundary
//!
//! Moves request and response bodies between the network and the processing
//! pipeline without loading large payloads into memory, while enforcing
//! upload constraints before any handler runs.

mod inbound;
mod outbound;
mod types;

pub use inbound::receive_upload;
pub use outbound::{download_response, DownloadBody};
pub use types::{
    FileBody, ReceivedFile, ReceivedUpload, StreamError, UploadPolicy, DOCUMENT_TYPES,
    IMAGE_TYPES, PDF_TYPES,
};
