use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
}

/// Text layer of a parsed PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPdf {
    pub text: String,
    pub num_pages: usize,
}

/// Trait for in-process PDF text extraction backends.
///
/// Implementors only read the embedded text layer; the
/// [`LocalParse`](crate::adapters::local::LocalParse) adapter wraps a backend
/// behind the uniform provider contract.
pub trait PdfBackend: Send + Sync {
    /// Extract the full text content of an in-memory PDF.
    fn extract_text(&self, document: &[u8]) -> Result<ParsedPdf, BackendError>;
}
