//! Crate-wide error type.

use thiserror::Error;

use crate::psd::PsdError;

/// Errors raised by compositing, adjustments and layered-file output.
#[derive(Error, Debug)]
pub enum BlitError {
    /// Channel buffers of different shapes met in one operation.
    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    /// A blend mode name that is not one of the supported modes.
    #[error("Unknown blend mode: {0}")]
    UnknownBlendMode(String),

    /// Curve control points that do not determine a unique quadratic.
    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    /// Decoding or encoding through the image codec failed.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Writing to a sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A layered file could not be read back.
    #[error("Layered file error: {0:?}")]
    Psd(PsdError),
}

impl From<PsdError> for BlitError {
    fn from(err: PsdError) -> Self {
        BlitError::Psd(err)
    }
}

pub type Result<T> = std::result::Result<T, BlitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = BlitError::UnknownBlendMode("overlay".to_string());
        assert_eq!(err.to_string(), "Unknown blend mode: overlay");

        let err = BlitError::DimensionMismatch {
            expected: (3, 3),
            found: (2, 5),
        };
        assert!(err.to_string().contains("(3, 3)"));
        assert!(err.to_string().contains("(2, 5)"));

        let err: BlitError = PsdError::InvalidSignature.into();
        assert!(matches!(err, BlitError::Psd(PsdError::InvalidSignature)));
    }
}
