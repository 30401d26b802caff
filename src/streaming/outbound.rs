//! Outbound payload streaming
//!
//! Writes response bodies in bounded-size chunks so head-of-line bytes flow
//! before the full payload is consumed, with backpressure coming from the
//! transport's send window. Headers follow the download discipline used for
//! file serving: explicit content type, length, and disposition.

use std::path::PathBuf;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;

use super::types::StreamError;

/// Chunk size for outbound streaming
const DOWNLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Source of an outbound payload
#[derive(Debug)]
pub enum DownloadBody {
    /// In-memory result
    Buffer(Bytes),

    /// Result staged on disk (streamed, never fully loaded)
    File(PathBuf),
}

/// Build a download response with correct content headers and a chunked body
pub async fn download_response(
    body: DownloadBody,
    content_type: &str,
    filename: &str,
) -> Result<Response, StreamError> {
    let (body, length) = match body {
        DownloadBody::Buffer(bytes) => {
            let length = bytes.len() as u64;
            (Body::from_stream(chunked(bytes)), length)
        }
        DownloadBody::File(path) => {
            let file = tokio::fs::File::open(&path).await?;
            let length = file.metadata().await?.len();
            let stream = ReaderStream::with_capacity(file, DOWNLOAD_CHUNK_BYTES);
            (Body::from_stream(stream), length)
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(body)
        .map_err(|e| StreamError::Transport(e.to_string()))
}

/// Split an in-memory buffer into bounded chunks without copying
fn chunked(bytes: Bytes) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    let len = bytes.len();
    futures::stream::iter((0..len).step_by(DOWNLOAD_CHUNK_BYTES).map(move |start| {
        let end = (start + DOWNLOAD_CHUNK_BYTES).min(len);
        Ok(bytes.slice(start..end))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn buffer_download_sets_headers_and_streams_chunks() {
        let payload = Bytes::from(vec![b'p'; DOWNLOAD_CHUNK_BYTES * 2 + 17]);
        let response = download_response(
            DownloadBody::Buffer(payload.clone()),
            "application/pdf",
            "merged.pdf",
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            payload.len().to_string().as_str()
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"merged.pdf\""
        );
        assert_eq!(body_bytes(response).await, payload);
    }

    #[tokio::test]
    async fn file_download_streams_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let payload = vec![b'f'; 200_000];
        std::fs::write(&path, &payload).unwrap();

        let response = download_response(
            DownloadBody::File(path),
            "application/pdf",
            "out.pdf",
        )
        .await
        .unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            payload.len().to_string().as_str()
        );
        assert_eq!(body_bytes(response).await, Bytes::from(payload));
    }

    #[tokio::test]
    async fn empty_buffer_is_a_valid_download() {
        let response = download_response(
            DownloadBody::Buffer(Bytes::new()),
            "text/plain",
            "empty.txt",
        )
        .await
        .unwrap();

        assert_eq!(response.headers()[header::CONTENT_LENGTH], "0");
        assert!(body_bytes(response).await.is_empty());
    }
}
