//! Document processing seam
//!
//! The gate and streaming boundary schedule and feed document operations but
//! never perform them; the actual PDF byte manipulation belongs to an
//! external collaborator behind `PdfProcessor`. `StubProcessor` stands in
//! where no real engine is wired up.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::streaming::ReceivedFile;

// ============================================================================
// Page formats
// ============================================================================

/// Output page sizes accepted by the document operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageFormat {
    #[default]
    A4,
    A3,
    A5,
    Letter,
}

impl PageFormat {
    /// Parse the `outputFormat` query value (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "A4" => Some(Self::A4),
            "A3" => Some(Self::A3),
            "A5" => Some(Self::A5),
            "LETTER" => Some(Self::Letter),
            _ => None,
        }
    }
}

// ============================================================================
// Results and errors
// ============================================================================

/// Verification outcome for an embedded digital signature
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureReport {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    pub message: String,
}

/// One barcode or QR code decoded from a document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCode {
    /// Decoded payload
    pub data: String,

    /// Symbology, e.g. "CODE128" or "QRCODE"
    pub format: String,

    /// 1-based page the code was found on; absent for plain images
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Failure inside a processing engine
#[derive(Debug, Error)]
#[error("processing failed: {0}")]
pub struct ProcessError(pub String);

// ============================================================================
// Processor trait
// ============================================================================

/// Document operations the HTTP surface schedules through the gate
#[async_trait]
pub trait PdfProcessor: Send + Sync {
    /// Merge several PDFs into one document
    async fn merge_pdfs(
        &self,
        inputs: &[ReceivedFile],
        format: PageFormat,
    ) -> Result<Bytes, ProcessError>;

    /// Convert images into a PDF, one page per image
    async fn images_to_pdf(
        &self,
        inputs: &[ReceivedFile],
        format: PageFormat,
    ) -> Result<Bytes, ProcessError>;

    /// Merge a mix of PDFs and images into one document
    async fn merge_all(
        &self,
        inputs: &[ReceivedFile],
        format: PageFormat,
    ) -> Result<Bytes, ProcessError>;

    /// Convert a DOC/DOCX document into a PDF
    async fn doc_to_pdf(&self, input: &ReceivedFile) -> Result<Bytes, ProcessError>;

    /// Extract plain text from a PDF
    async fn extract_text(&self, input: &ReceivedFile) -> Result<String, ProcessError>;

    /// Stamp a text watermark onto every page
    async fn watermark(&self, input: &ReceivedFile, text: &str) -> Result<Bytes, ProcessError>;

    /// Embed a QR code encoding `text`
    async fn add_qr_code(&self, input: &ReceivedFile, text: &str) -> Result<Bytes, ProcessError>;

    /// Embed a Code128 barcode encoding `text`
    async fn add_barcode(&self, input: &ReceivedFile, text: &str) -> Result<Bytes, ProcessError>;

    /// Decode barcodes from a PDF or image
    async fn read_barcodes(&self, input: &ReceivedFile) -> Result<Vec<DecodedCode>, ProcessError>;

    /// Decode QR codes from a PDF or image
    async fn read_qr_codes(&self, input: &ReceivedFile) -> Result<Vec<DecodedCode>, ProcessError>;

    /// Digitally sign a PDF
    async fn sign(&self, input: &ReceivedFile) -> Result<Bytes, ProcessError>;

    /// Verify an embedded digital signature
    async fn verify_signature(
        &self,
        input: &ReceivedFile,
    ) -> Result<SignatureReport, ProcessError>;
}

// ============================================================================
// Stub implementation
// ============================================================================

/// Minimal single-page PDF used as placeholder output
const PLACEHOLDER_PDF: &[u8] = b"%PDF-1.4\n\
1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n\
2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n\
3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 595 842]>>endobj\n\
trailer<</Root 1 0 R>>\n\
%%EOF\n";

/// Placeholder engine used until a real document library is wired in
///
/// Every operation reads its inputs (exercising the staged-file path) and
/// returns deterministic placeholder output.
#[derive(Debug, Default, Clone)]
pub struct StubProcessor;

impl StubProcessor {
    async fn consume(inputs: &[ReceivedFile]) -> Result<u64, ProcessError> {
        let mut total = 0;
        for input in inputs {
            let data = input
                .read()
                .await
                .map_err(|e| ProcessError(format!("read {}: {e}", input.name)))?;
            total += data.len() as u64;
        }
        Ok(total)
    }
}

#[async_trait]
impl PdfProcessor for StubProcessor {
    async fn merge_pdfs(
        &self,
        inputs: &[ReceivedFile],
        format: PageFormat,
    ) -> Result<Bytes, ProcessError> {
        let bytes = Self::consume(inputs).await?;
        tracing::debug!(files = inputs.len(), bytes, ?format, "stub merge");
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn images_to_pdf(
        &self,
        inputs: &[ReceivedFile],
        format: PageFormat,
    ) -> Result<Bytes, ProcessError> {
        let bytes = Self::consume(inputs).await?;
        tracing::debug!(files = inputs.len(), bytes, ?format, "stub images-to-pdf");
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn merge_all(
        &self,
        inputs: &[ReceivedFile],
        format: PageFormat,
    ) -> Result<Bytes, ProcessError> {
        let bytes = Self::consume(inputs).await?;
        tracing::debug!(files = inputs.len(), bytes, ?format, "stub merge-all");
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn doc_to_pdf(&self, input: &ReceivedFile) -> Result<Bytes, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        tracing::debug!(file = %input.name, "stub doc-to-pdf");
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn extract_text(&self, input: &ReceivedFile) -> Result<String, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        Ok(String::new())
    }

    async fn watermark(&self, input: &ReceivedFile, text: &str) -> Result<Bytes, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        tracing::debug!(file = %input.name, text, "stub watermark");
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn add_qr_code(&self, input: &ReceivedFile, text: &str) -> Result<Bytes, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        tracing::debug!(file = %input.name, text, "stub add-qr-code");
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn add_barcode(&self, input: &ReceivedFile, text: &str) -> Result<Bytes, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        tracing::debug!(file = %input.name, text, "stub add-barcode");
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn read_barcodes(&self, input: &ReceivedFile) -> Result<Vec<DecodedCode>, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        Ok(Vec::new())
    }

    async fn read_qr_codes(&self, input: &ReceivedFile) -> Result<Vec<DecodedCode>, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        Ok(Vec::new())
    }

    async fn sign(&self, input: &ReceivedFile) -> Result<Bytes, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        Ok(Bytes::from_static(PLACEHOLDER_PDF))
    }

    async fn verify_signature(
        &self,
        input: &ReceivedFile,
    ) -> Result<SignatureReport, ProcessError> {
        Self::consume(std::slice::from_ref(input)).await?;
        Ok(SignatureReport {
            verified: false,
            signer: None,
            message: "no signature data found".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_format_parses_case_insensitively() {
        assert_eq!(PageFormat::parse("a4"), Some(PageFormat::A4));
        assert_eq!(PageFormat::parse("LETTER"), Some(PageFormat::Letter));
        assert_eq!(PageFormat::parse("tabloid"), None);
    }

    #[test]
    fn placeholder_is_a_pdf() {
        assert!(PLACEHOLDER_PDF.starts_with(b"%PDF-"));
    }
}
