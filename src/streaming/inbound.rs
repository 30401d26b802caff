//! Inbound multipart intake
//!
//! Validates each part's declared media type before accepting any payload
//! bytes, enforces size and count limits mid-stream (aborting rather than
//! buffering first), and spills large files to lifecycle-managed staged
//! paths. Any failure cleans up everything staged for the request.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;

use crate::tempfiles::{StagedFile, TempFileManager};

use super::types::{FileBody, ReceivedFile, ReceivedUpload, StreamError, UploadPolicy};

/// Byte cap for plain text form fields (watermark/barcode text is tiny);
/// keeps a hostile text part from occupying body-limit memory
const TEXT_FIELD_MAX_BYTES: usize = 8 * 1024;

/// Receive a multipart upload under `policy`, staging large files via `temp`
///
/// On success every accepted file is either buffered or staged; on failure
/// all staged files created for this request are already cleaned up.
pub async fn receive_upload(
    mut multipart: Multipart,
    policy: &UploadPolicy,
    temp: &TempFileManager,
) -> Result<ReceivedUpload, StreamError> {
    let mut upload = ReceivedUpload::default();

    match read_parts(&mut multipart, policy, temp, &mut upload).await {
        Ok(()) => {
            if policy.require_single && upload.files.is_empty() {
                upload.discard().await;
                return Err(StreamError::MissingFile);
            }
            Ok(upload)
        }
        Err(e) => {
            upload.discard().await;
            Err(e)
        }
    }
}

async fn read_parts(
    multipart: &mut Multipart,
    policy: &UploadPolicy,
    temp: &TempFileManager,
    upload: &mut ReceivedUpload,
) -> Result<(), StreamError> {
    while let Some(field) = multipart.next_field().await.map_err(transport)? {
        let field_name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            // Plain form field (e.g. watermark/barcode text).
            let value = read_text_field(field, &field_name).await?;
            upload.fields.insert(field_name, value);
            continue;
        };

        let content_type = field.content_type().map(str::to_string).unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

        // Reject on the declared type before reading any payload bytes.
        if !policy.allows(&content_type) {
            if policy.require_single {
                return Err(StreamError::UnsupportedMediaType { got: content_type });
            }
            tracing::debug!(
                file = %file_name,
                content_type = %content_type,
                "skipping part with disallowed media type"
            );
            drain(field).await?;
            continue;
        }

        if upload.files.len() >= policy.max_files {
            return Err(StreamError::TooManyFiles {
                max: policy.max_files,
            });
        }

        let file = read_file_part(field, file_name, content_type, policy, temp).await?;
        tracing::debug!(
            file = %file.name,
            size = file.size,
            staged = file.is_staged(),
            "file part accepted"
        );
        upload.files.push(file);
    }
    Ok(())
}

/// Stream one file part into memory, spilling to a staged file past the
/// spool threshold. Cleans up its own staged file on failure.
async fn read_file_part(
    mut field: Field<'_>,
    name: String,
    content_type: String,
    policy: &UploadPolicy,
    temp: &TempFileManager,
) -> Result<ReceivedFile, StreamError> {
    let mut buffered = BytesMut::new();
    let mut staged: Option<(StagedFile, tokio::fs::File)> = None;
    let mut size: u64 = 0;

    let outcome: Result<(), StreamError> = async {
        while let Some(chunk) = field.chunk().await.map_err(transport)? {
            size += chunk.len() as u64;
            if size > policy.max_file_size {
                // Abort mid-stream; never buffer the rest first.
                return Err(StreamError::FileTooLarge {
                    name: name.clone(),
                    max: policy.max_file_size,
                });
            }

            match staged.as_mut() {
                Some((_, file)) => file.write_all(&chunk).await?,
                None => {
                    buffered.extend_from_slice(&chunk);
                    if buffered.len() as u64 > policy.spool_threshold {
                        let handle = temp.create_temp_file(&name, None).await?;
                        let mut file = tokio::fs::OpenOptions::new()
                            .append(true)
                            .open(handle.path())
                            .await?;
                        file.write_all(&buffered).await?;
                        buffered.clear();
                        staged = Some((handle, file));
                    }
                }
            }
        }

        if let Some((_, file)) = staged.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }
    .await;

    match outcome {
        Ok(()) => {
            let body = match staged {
                Some((handle, file)) => {
                    drop(file);
                    FileBody::Staged(handle)
                }
                None => FileBody::Buffered(buffered.freeze()),
            };
            Ok(ReceivedFile {
                name,
                content_type,
                size,
                body,
            })
        }
        Err(e) => {
            if let Some((handle, file)) = staged {
                drop(file);
                handle.cleanup().await;
            }
            Err(e)
        }
    }
}

/// Read a plain form field with a hard byte cap, aborting mid-stream
async fn read_text_field(mut field: Field<'_>, name: &str) -> Result<String, StreamError> {
    let mut buffered = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(transport)? {
        if buffered.len() + chunk.len() > TEXT_FIELD_MAX_BYTES {
            return Err(StreamError::FieldTooLarge {
                name: name.to_string(),
                max: TEXT_FIELD_MAX_BYTES,
            });
        }
        buffered.extend_from_slice(&chunk);
    }

    String::from_utf8(buffered.to_vec())
        .map_err(|_| StreamError::Transport(format!("form field {name} is not valid UTF-8")))
}

/// Consume and discard the remainder of a rejected part's stream
async fn drain(mut field: Field<'_>) -> Result<(), StreamError> {
    while field.chunk().await.map_err(transport)?.is_some() {}
    Ok(())
}

/// Translate transport internals into the fixed error taxonomy
fn transport(e: MultipartError) -> StreamError {
    StreamError::Transport(e.to_string())
}

// ============================================================================
// Tests
// ============================================================================
