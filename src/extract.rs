//! Page-by-page text extraction from PDF bytes.

use docchat_core::{Error, Result};

/// Every PDF starts with this header.
const PDF_MAGIC: &[u8] = b"%PDF-";

pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Extract the text of each page, in page order.
///
/// `name` is only used to label errors. Pages without text come back as
/// empty strings so page numbers stay aligned with the document.
pub fn extract_pdf_pages(name: &str, bytes: &[u8]) -> Result<Vec<String>> {
    if !looks_like_pdf(bytes) {
        return Err(Error::Extraction {
            name: name.to_string(),
            message: "not a PDF file".to_string(),
        });
    }

    // pdf-extract panics on some malformed inputs.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| Error::Extraction {
            name: name.to_string(),
            message: "PDF parser panicked".to_string(),
        })?
        .map_err(|e| Error::Extraction {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    tracing::debug!(document = name, pages = pages.len(), "extracted PDF text");
    Ok(pages)
}
