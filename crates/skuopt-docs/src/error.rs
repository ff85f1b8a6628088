use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocsError {
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF is encrypted")]
    EncryptedPdf,

    #[error("PDF contains no extractable text")]
    EmptyPdf,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
