use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::DocsError;

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Lower-cased media type, e.g. `image/png`.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.mime == "application/pdf"
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Decodes `data:<mime>[;params];base64,<payload>`.
///
/// Only base64 payloads are accepted; whitespace inside the payload is
/// ignored.
///
/// # Errors
///
/// Returns [`DocsError::InvalidDataUrl`] when the prefix or the `;base64`
/// marker is missing, or [`DocsError::Base64`] when the payload does not
/// decode.
pub fn parse_data_url(input: &str) -> Result<DataUrl, DocsError> {
    let rest = input
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| DocsError::InvalidDataUrl("missing data: prefix".to_owned()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| DocsError::InvalidDataUrl("missing ',' separator".to_owned()))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(DocsError::InvalidDataUrl(
            "only base64 payloads are supported".to_owned(),
        ));
    }
    if mime.is_empty() {
        return Err(DocsError::InvalidDataUrl("missing media type".to_owned()));
    }

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;

    Ok(DataUrl { mime, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_image() {
        let url = parse_data_url("data:image/PNG;base64,aGVsbG8=").unwrap();
        assert_eq!(url.mime, "image/png");
        assert_eq!(url.bytes, b"hello");
        assert!(url.is_image());
        assert!(!url.is_pdf());
    }

    #[test]
    fn accepts_extra_parameters() {
        let url = parse_data_url("data:application/pdf;name=f.pdf;base64,aGVs\nbG8=").unwrap();
        assert!(url.is_pdf());
        assert_eq!(url.bytes, b"hello");
    }

    #[test]
    fn rejects_non_base64_urls() {
        assert!(matches!(
            parse_data_url("data:text/plain,hello"),
            Err(DocsError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            parse_data_url("https://example.com/a.png"),
            Err(DocsError::InvalidDataUrl(_))
        ));
    }

    #[test]
    fn rejects_bad_payload() {
        assert!(matches!(
            parse_data_url("data:image/png;base64,@@@"),
            Err(DocsError::Base64(_))
        ));
    }
}
