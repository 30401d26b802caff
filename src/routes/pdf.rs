//! PDF API endpoints
//!
//! Every processing endpoint follows the same shape: receive the multipart
//! upload through the streaming boundary, run the processor call under a
//! gate slot, release staged files, stream the result out.
//!
//! Endpoints:
//! - POST /api/pdf/merge-pdfs - Merge uploaded PDFs into one document
//! - POST /api/pdf/images-to-pdf - Convert uploaded images to a PDF
//! - POST /api/pdf/merge-all - Merge a mix of PDFs and images
//! - POST /api/pdf/doc-to-pdf - Convert a DOC/DOCX document to PDF
//! - POST /api/pdf/extract-text - Extract plain text from a PDF
//! - POST /api/pdf/watermark - Stamp a text watermark on every page
//! - POST /api/pdf/add-qr-code - Embed a QR code
//! - POST /api/pdf/add-barcode - Embed a Code128 barcode
//! - POST /api/pdf/sign - Digitally sign a PDF
//! - POST /api/pdf/verify-signature - Verify an embedded signature
//! - POST /api/pdf/read-barcodes - Decode barcodes from a PDF or image
//! - POST /api/pdf/read-qr-codes - Decode QR codes from a PDF or image
//! - POST /api/pdf/read-all-codes - Decode every code from a PDF or image
//! - GET /api/pdf/supported-formats - Capability listing

use axum::{
    extract::{Multipart, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::processor::{DecodedCode, PageFormat, SignatureReport};
use crate::state::AppState;
use crate::streaming::{
    download_response, receive_upload, DownloadBody, ReceivedFile, ReceivedUpload, StreamError,
    UploadPolicy, DOCUMENT_TYPES, IMAGE_TYPES, PDF_TYPES,
};

/// Create the PDF operations router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/merge-pdfs", post(merge_pdfs))
        .route("/images-to-pdf", post(images_to_pdf))
        .route("/merge-all", post(merge_all))
        .route("/doc-to-pdf", post(doc_to_pdf))
        .route("/extract-text", post(extract_text))
        .route("/watermark", post(watermark))
        .route("/add-qr-code", post(add_qr_code))
        .route("/add-barcode", post(add_barcode))
        .route("/sign", post(sign))
        .route("/verify-signature", post(verify_signature))
        .route("/read-barcodes", post(read_barcodes))
        .route("/read-qr-codes", post(read_qr_codes))
        .route("/read-all-codes", post(read_all_codes))
        .route("/supported-formats", get(supported_formats))
}

// ============================================================================
// Query and response types
// ============================================================================

/// `?outputFormat=` query parameter
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatQuery {
    output_format: Option<String>,
}

impl FormatQuery {
    fn page_format(&self) -> Result<PageFormat> {
        match &self.output_format {
            None => Ok(PageFormat::default()),
            Some(raw) => {
                PageFormat::parse(raw).ok_or_else(|| AppError::InvalidFormat(raw.clone()))
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractTextResponse {
    filename: String,
    text: String,
}

/// Decoded codes from a read-barcodes / read-qr-codes / read-all-codes call
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadCodesResponse {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    barcodes: Option<Vec<DecodedCode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qr_codes: Option<Vec<DecodedCode>>,
    count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SupportedFormatsResponse {
    service: &'static str,
    supported_pdf_types: &'static [&'static str],
    supported_image_types: &'static [&'static str],
    supported_document_types: &'static [&'static str],
    supported_output_formats: [PageFormat; 4],
    features: &'static [&'static str],
}

// ============================================================================
// Upload policies
// ============================================================================

fn apply_limits(state: &AppState, mut policy: UploadPolicy) -> UploadPolicy {
    let limits = &state.config().upload;
    policy.max_file_size = limits.max_file_size;
    policy.max_files = policy.max_files.min(limits.max_files);
    policy.spool_threshold = limits.spool_threshold;
    policy
}

fn multi_policy(state: &AppState, allowed: &[&'static str]) -> UploadPolicy {
    apply_limits(state, UploadPolicy::new(allowed))
}

fn single_policy(state: &AppState, allowed: &[&'static str]) -> UploadPolicy {
    apply_limits(state, UploadPolicy::single(allowed))
}

fn merge_all_policy(state: &AppState) -> UploadPolicy {
    let mut policy = multi_policy(state, PDF_TYPES);
    policy.allowed_types.extend_from_slice(IMAGE_TYPES);
    policy
}

/// Code-reading endpoints accept one PDF or one image
fn scan_policy(state: &AppState) -> UploadPolicy {
    let mut policy = single_policy(state, PDF_TYPES);
    policy.allowed_types.extend_from_slice(IMAGE_TYPES);
    policy
}

// ============================================================================
// Helpers
// ============================================================================

fn timestamped(prefix: &str, ext: &str) -> String {
    format!("{prefix}_{}.{ext}", Utc::now().timestamp())
}

/// At least one accepted file, or the request is rejected
async fn require_files(upload: &ReceivedUpload) -> Result<()> {
    if upload.files.is_empty() {
        upload.discard().await;
        return Err(StreamError::MissingFile.into());
    }
    Ok(())
}

fn single_file(upload: &ReceivedUpload) -> Result<&ReceivedFile> {
    upload
        .files
        .first()
        .ok_or_else(|| StreamError::MissingFile.into())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/pdf/merge-pdfs
async fn merge_pdfs(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    multipart: Multipart,
) -> Result<Response> {
    let format = query.page_format()?;
    let upload =
        receive_upload(multipart, &multi_policy(&state, PDF_TYPES), state.temp_files()).await?;
    require_files(&upload).await?;

    let result = state
        .gate()
        .execute("merge-pdfs", || async {
            state
                .processor()
                .merge_pdfs(&upload.files, format)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let merged = result?;

    Ok(download_response(
        DownloadBody::Buffer(merged),
        "application/pdf",
        &timestamped("merged", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/images-to-pdf
async fn images_to_pdf(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    multipart: Multipart,
) -> Result<Response> {
    let format = query.page_format()?;
    let upload =
        receive_upload(multipart, &multi_policy(&state, IMAGE_TYPES), state.temp_files()).await?;
    require_files(&upload).await?;

    let result = state
        .gate()
        .execute("images-to-pdf", || async {
            state
                .processor()
                .images_to_pdf(&upload.files, format)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let converted = result?;

    Ok(download_response(
        DownloadBody::Buffer(converted),
        "application/pdf",
        &timestamped("converted", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/merge-all
async fn merge_all(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    multipart: Multipart,
) -> Result<Response> {
    let format = query.page_format()?;
    let upload = receive_upload(multipart, &merge_all_policy(&state), state.temp_files()).await?;
    require_files(&upload).await?;

    let result = state
        .gate()
        .execute("merge-all", || async {
            state
                .processor()
                .merge_all(&upload.files, format)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let merged = result?;

    Ok(download_response(
        DownloadBody::Buffer(merged),
        "application/pdf",
        &timestamped("merged_all", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/doc-to-pdf
async fn doc_to_pdf(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let upload = receive_upload(
        multipart,
        &single_policy(&state, DOCUMENT_TYPES),
        state.temp_files(),
    )
    .await?;
    let file = single_file(&upload)?;

    let result = state
        .gate()
        .execute("doc-to-pdf", || async {
            state.processor().doc_to_pdf(file).await.map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let converted = result?;

    Ok(download_response(
        DownloadBody::Buffer(converted),
        "application/pdf",
        &timestamped("document", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/extract-text
async fn extract_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractTextResponse>> {
    let upload =
        receive_upload(multipart, &single_policy(&state, PDF_TYPES), state.temp_files()).await?;
    let file = single_file(&upload)?;
    let filename = file.name.clone();

    let result = state
        .gate()
        .execute("extract-text", || async {
            state.processor().extract_text(file).await.map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let text = result?;

    Ok(Json(ExtractTextResponse { filename, text }))
}

/// POST /api/pdf/watermark
async fn watermark(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let upload =
        receive_upload(multipart, &single_policy(&state, PDF_TYPES), state.temp_files()).await?;
    let file = single_file(&upload)?;
    let text = upload
        .fields
        .get("text")
        .cloned()
        .unwrap_or_else(|| "CONFIDENTIAL".to_string());

    let result = state
        .gate()
        .execute("watermark", || async {
            state
                .processor()
                .watermark(file, &text)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let stamped = result?;

    Ok(download_response(
        DownloadBody::Buffer(stamped),
        "application/pdf",
        &timestamped("watermarked", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/add-qr-code
async fn add_qr_code(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let upload =
        receive_upload(multipart, &single_policy(&state, PDF_TYPES), state.temp_files()).await?;
    let file = single_file(&upload)?;
    let text = upload
        .fields
        .get("text")
        .cloned()
        .unwrap_or_else(|| "https://example.com".to_string());

    let result = state
        .gate()
        .execute("add-qr-code", || async {
            state
                .processor()
                .add_qr_code(file, &text)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let encoded = result?;

    Ok(download_response(
        DownloadBody::Buffer(encoded),
        "application/pdf",
        &timestamped("qr", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/add-barcode
async fn add_barcode(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let upload =
        receive_upload(multipart, &single_policy(&state, PDF_TYPES), state.temp_files()).await?;
    let file = single_file(&upload)?;
    let text = upload
        .fields
        .get("text")
        .cloned()
        .unwrap_or_else(|| "123456789".to_string());

    let result = state
        .gate()
        .execute("add-barcode", || async {
            state
                .processor()
                .add_barcode(file, &text)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let encoded = result?;

    Ok(download_response(
        DownloadBody::Buffer(encoded),
        "application/pdf",
        &timestamped("barcode", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/sign
async fn sign(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let upload =
        receive_upload(multipart, &single_policy(&state, PDF_TYPES), state.temp_files()).await?;
    let file = single_file(&upload)?;

    let result = state
        .gate()
        .execute("sign", || async {
            state.processor().sign(file).await.map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let signed = result?;

    Ok(download_response(
        DownloadBody::Buffer(signed),
        "application/pdf",
        &timestamped("signed", "pdf"),
    )
    .await?)
}

/// POST /api/pdf/verify-signature
async fn verify_signature(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SignatureReport>> {
    let upload =
        receive_upload(multipart, &single_policy(&state, PDF_TYPES), state.temp_files()).await?;
    let file = single_file(&upload)?;

    let result = state
        .gate()
        .execute("verify-signature", || async {
            state
                .processor()
                .verify_signature(file)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;

    Ok(Json(result?))
}

/// POST /api/pdf/read-barcodes
async fn read_barcodes(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReadCodesResponse>> {
    let upload = receive_upload(multipart, &scan_policy(&state), state.temp_files()).await?;
    let file = single_file(&upload)?;
    let filename = file.name.clone();

    let result = state
        .gate()
        .execute("read-barcodes", || async {
            state
                .processor()
                .read_barcodes(file)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let barcodes = result?;

    Ok(Json(ReadCodesResponse {
        filename,
        count: barcodes.len(),
        barcodes: Some(barcodes),
        qr_codes: None,
    }))
}

/// POST /api/pdf/read-qr-codes
async fn read_qr_codes(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReadCodesResponse>> {
    let upload = receive_upload(multipart, &scan_policy(&state), state.temp_files()).await?;
    let file = single_file(&upload)?;
    let filename = file.name.clone();

    let result = state
        .gate()
        .execute("read-qr-codes", || async {
            state
                .processor()
                .read_qr_codes(file)
                .await
                .map_err(AppError::from)
        })
        .await;
    upload.discard().await;
    let qr_codes = result?;

    Ok(Json(ReadCodesResponse {
        filename,
        count: qr_codes.len(),
        barcodes: None,
        qr_codes: Some(qr_codes),
    }))
}

/// POST /api/pdf/read-all-codes
async fn read_all_codes(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReadCodesResponse>> {
    let upload = receive_upload(multipart, &scan_policy(&state), state.temp_files()).await?;
    let file = single_file(&upload)?;
    let filename = file.name.clone();

    let result = state
        .gate()
        .execute("read-all-codes", || async {
            let barcodes = state.processor().read_barcodes(file).await?;
            let qr_codes = state.processor().read_qr_codes(file).await?;
            Ok::<_, AppError>((barcodes, qr_codes))
        })
        .await;
    upload.discard().await;
    let (barcodes, qr_codes) = result?;

    Ok(Json(ReadCodesResponse {
        filename,
        count: barcodes.len() + qr_codes.len(),
        barcodes: Some(barcodes),
        qr_codes: Some(qr_codes),
    }))
}

/// GET /api/pdf/supported-formats
async fn supported_formats() -> Json<SupportedFormatsResponse> {
    Json(SupportedFormatsResponse {
        service: env!("CARGO_PKG_NAME"),
        supported_pdf_types: PDF_TYPES,
        supported_image_types: IMAGE_TYPES,
        supported_document_types: DOCUMENT_TYPES,
        supported_output_formats: [
            PageFormat::A4,
            PageFormat::A3,
            PageFormat::A5,
            PageFormat::Letter,
        ],
        features: &[
            "Merge PDFs",
            "Convert images to PDF",
            "Merge PDFs and images",
            "Convert DOC/DOCX to PDF",
            "Extract text from PDF",
            "Text watermarks",
            "QR codes",
            "Code128 barcodes",
            "Barcode and QR code reading",
            "Digital signatures",
            "Signature verification",
        ],
    })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::routes;
    use crate::state::AppState;

    fn test_app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.temp_files.dir = dir.path().to_path_buf();
        (routes::router(AppState::new(config)), dir)
    }

    const BOUNDARY: &str = "test-boundary-41ac";

    fn multipart_body(parts: &[(&str, Option<&str>, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content_type, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn post_multipart(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn merge_pdfs_returns_a_pdf_attachment() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[
            ("files", Some("a.pdf"), "application/pdf", b"%PDF-1.4 a"),
            ("files", Some("b.pdf"), "application/pdf", b"%PDF-1.4 b"),
        ]);

        let response = app
            .oneshot(post_multipart("/api/pdf/merge-pdfs", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"merged_"));
    }

    #[tokio::test]
    async fn invalid_output_format_is_rejected() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("files", Some("a.pdf"), "application/pdf", b"%PDF-1.4")]);

        let response = app
            .oneshot(post_multipart(
                "/api/pdf/merge-pdfs?outputFormat=TABLOID",
                body,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn merge_without_files_is_rejected() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("note", None, "", b"no files here")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/merge-pdfs", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "MISSING_FILE");
    }

    #[tokio::test]
    async fn extract_text_rejects_non_pdf_upload() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("file", Some("page.html"), "text/html", b"<html/>")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/extract-text", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(response).await["error"], "UNSUPPORTED_MEDIA_TYPE");
    }

    #[tokio::test]
    async fn extract_text_returns_json() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("file", Some("doc.pdf"), "application/pdf", b"%PDF-1.4")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/extract-text", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["filename"], "doc.pdf");
        assert!(json["text"].is_string());
    }

    #[tokio::test]
    async fn verify_signature_reports_unsigned_document() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("file", Some("doc.pdf"), "application/pdf", b"%PDF-1.4")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/verify-signature", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["verified"], false);
    }

    #[tokio::test]
    async fn doc_to_pdf_converts_word_documents() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[(
            "file",
            Some("report.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            b"PK word bytes",
        )]);

        let response = app
            .oneshot(post_multipart("/api/pdf/doc-to-pdf", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    }

    #[tokio::test]
    async fn doc_to_pdf_rejects_pdf_upload() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("file", Some("a.pdf"), "application/pdf", b"%PDF-1.4")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/doc-to-pdf", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn read_barcodes_accepts_pdf_and_reports_count() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("file", Some("scan.pdf"), "application/pdf", b"%PDF-1.4")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/read-barcodes", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["filename"], "scan.pdf");
        assert_eq!(json["count"], 0);
        assert!(json["barcodes"].as_array().unwrap().is_empty());
        assert!(json.get("qrCodes").is_none());
    }

    #[tokio::test]
    async fn read_qr_codes_accepts_images() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("file", Some("label.png"), "image/png", b"\x89PNG fake")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/read-qr-codes", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["qrCodes"].as_array().unwrap().is_empty());
        assert!(json.get("barcodes").is_none());
    }

    #[tokio::test]
    async fn read_all_codes_reports_both_kinds() {
        let (app, _dir) = test_app();
        let body = multipart_body(&[("file", Some("scan.pdf"), "application/pdf", b"%PDF-1.4")]);

        let response = app
            .oneshot(post_multipart("/api/pdf/read-all-codes", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["barcodes"].as_array().unwrap().is_empty());
        assert!(json["qrCodes"].as_array().unwrap().is_empty());
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn supported_formats_lists_capabilities() {
        let (app, _dir) = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/pdf/supported-formats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["supportedOutputFormats"]
            .as_array()
            .unwrap()
            .contains(&Value::from("A4")));
        assert_eq!(json["supportedPdfTypes"][0], "application/pdf");
    }

    #[tokio::test]
    async fn health_endpoint_reports_gate_and_staging_stats() {
        let (app, _dir) = test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["gate"]["running"], 0);
        assert_eq!(json["temp_files"]["active"], 0);
    }
}
