//! File lifecycle management
//!
//! Produces uniquely-named, ownership-tracked temporary artifacts and
//! guarantees their eventual removal via explicit cleanup, a periodic orphan
//! sweep, and best-effort shutdown reclamation.

mod manager;
mod types;

pub use manager::{StagedFile, TempFileManager};
pub use types::{TempFileConfig, TempFileError, TempFileRecord, TempFileStats};
