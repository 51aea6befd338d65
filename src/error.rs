use thiserror::Error;

/// Failures of the denoising core itself. Decode and encode errors are
/// reported by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrepError {
    #[error("image has no pixels: {width}x{height}")]
    MalformedImage { width: u32, height: u32 },

    #[error(
        "scan region too small: {clusters} color cluster(s) in the first {width} column(s), need 2; widen the region"
    )]
    RegionTooSmall { clusters: usize, width: u32 },
}

/// Failures of the OCR collaborator.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("missing OCR credential: {0}")]
    MissingCredential(&'static str),

    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR authentication failed: {0}")]
    Auth(String),

    #[error("OCR service error {code}: {message}")]
    Service { code: i64, message: String },
}
