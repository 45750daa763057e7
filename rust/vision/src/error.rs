// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for floor plan reconstruction.
//!
//! Only invalid input surfaces as an error. Degenerate geometry (a contour
//! that simplifies below three corners, an empty line detection) and
//! association misses are part of the normal output and never reach this
//! type.

use thiserror::Error;

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur before or around the reconstruction pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid scale: meters_per_pixel must be positive and finite, got {0}")]
    InvalidScale(f64),

    #[error("Empty image: {width}x{height} pixels")]
    EmptyImage { width: u32, height: u32 },

    #[error("Undecodable image: {0}")]
    UndecodableImage(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Opening detector failed: {0}")]
    Detector(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error was caused by the caller's input rather than by
    /// a collaborator (the opening detector) or by export.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Error::Detector(_) | Error::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_classification() {
        assert!(Error::InvalidScale(-1.0).is_invalid_input());
        assert!(Error::EmptyImage { width: 0, height: 10 }.is_invalid_input());
        assert!(Error::InvalidConfig("bad".into()).is_invalid_input());
        assert!(!Error::Detector("timeout".into()).is_invalid_input());
        assert!(!Error::Serialization("eof".into()).is_invalid_input());
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = Error::InvalidScale(0.0);
        assert_eq!(
            err.to_string(),
            "Invalid scale: meters_per_pixel must be positive and finite, got 0"
        );
    }
}
