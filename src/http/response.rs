//! Response length verification.
//!
//! # Design Decisions
//! - Only an exact match against a declared Content-Length passes
//! - A missing or empty header means "unknown length" and always passes
//! - HEAD responses are skipped by the caller, not here

use http::header::CONTENT_LENGTH;
use http::HeaderMap;

use crate::error::TransferError;

/// The declared Content-Length, if any.
pub fn declared_length(headers: &HeaderMap) -> Result<Option<u64>, TransferError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };

    let text = String::from_utf8_lossy(value.as_bytes());
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    text.parse::<u64>()
        .map(Some)
        .map_err(|source| TransferError::LengthParse {
            value: text.to_string(),
            source,
        })
}

/// Compare the declared length with the number of bytes actually copied.
pub fn verify_length(headers: &HeaderMap, copied: u64) -> Result<(), TransferError> {
    match declared_length(headers)? {
        Some(declared) if declared != copied => {
            Err(TransferError::LengthMismatch { declared, copied })
        }
        _ => Ok(()),
    }
}
