use crate::error::ProviderError;

/// Leading bytes every PDF starts with.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Largest document accepted by default (20 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Check that `document` looks like a PDF an extraction backend can accept.
///
/// `max_bytes` limits the document size (0 = unlimited). Runs before any
/// network call so malformed input never reaches a backend.
pub fn validate_document(document: &[u8], max_bytes: usize) -> Result<(), ProviderError> {
    if document.is_empty() {
        return Err(ProviderError::Input("empty document".into()));
    }
    if max_bytes > 0 && document.len() > max_bytes {
        return Err(ProviderError::Input(format!(
            "document is {} bytes, exceeding the {} byte limit",
            document.len(),
            max_bytes
        )));
    }
    if !document.starts_with(PDF_SIGNATURE) {
        return Err(ProviderError::Input(
            "invalid PDF format: missing %PDF header".into(),
        ));
    }
    Ok(())
}
