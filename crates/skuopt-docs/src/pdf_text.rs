use lopdf::Document;

use crate::error::DocsError;

/// Extracts the text of every page, in page order.
///
/// # Errors
///
/// - [`DocsError::Pdf`] when the bytes are not a readable PDF.
/// - [`DocsError::EncryptedPdf`] for password-protected documents.
/// - [`DocsError::EmptyPdf`] when no page yields any text (scanned files).
pub fn pdf_text(bytes: &[u8]) -> Result<String, DocsError> {
    let document = Document::load_mem(bytes)?;
    if document.is_encrypted() {
        return Err(DocsError::EncryptedPdf);
    }

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(DocsError::EmptyPdf);
    }
    let text = document.extract_text(&pages)?;

    let text = text.trim();
    if text.is_empty() {
        return Err(DocsError::EmptyPdf);
    }
    Ok(text.to_owned())
}
