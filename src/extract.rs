//! Plain-text extraction from uploaded documents.
//!
//! PDF bodies go through `pdf-extract`; text/markdown uploads are decoded
//! as UTF-8. Anything else is rejected up front. An upload with no
//! extractable text is an error, not an empty success.

use std::error::Error;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum ExtractError {
  /// File extension we do not know how to read.
  Unsupported(String),
  /// Parsed fine, but there was nothing readable inside.
  NoText,
  /// The PDF parser rejected the body.
  Pdf(String),
}

impl fmt::Display for ExtractError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ExtractError::Unsupported(ext) => write!(f, "unsupported document type: .{}", ext),
      ExtractError::NoText => write!(f, "could not extract any text from the document"),
      ExtractError::Pdf(msg) => write!(f, "PDF parse error: {}", msg),
    }
  }
}

impl Error for ExtractError {}

/// Extract plain text from an uploaded document body.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
  let ext = Path::new(filename)
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_lowercase())
    .unwrap_or_default();

  let text = match ext.as_str() {
    "pdf" => pdf_extract::extract_text_from_mem(bytes)
      .map_err(|e| ExtractError::Pdf(e.to_string()))?,
    // No extension is treated as plain text so pasted blobs still work.
    "txt" | "md" | "markdown" | "" => String::from_utf8_lossy(bytes).into_owned(),
    other => return Err(ExtractError::Unsupported(other.to_string())),
  };

  if text.trim().is_empty() {
    return Err(ExtractError::NoText);
  }
  Ok(text)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_text_upload_round_trips() {
    let text = extract_text("notes.txt", b"The mitochondria is the powerhouse.").unwrap();
    assert!(text.contains("mitochondria"));
  }

  #[test]
  fn empty_body_is_no_text() {
    assert!(matches!(extract_text("notes.md", b"   \n "), Err(ExtractError::NoText)));
  }

  #[test]
  fn unknown_extension_is_rejected() {
    assert!(matches!(
      extract_text("slides.pptx", b"whatever"),
      Err(ExtractError::Unsupported(_))
    ));
  }
}
