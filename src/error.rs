use std::fmt;

use thiserror::Error;

/// API operation an error originated from. Picks the generic message the
/// caller sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Save,
    Delete,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "Failed to fetch artworks",
            Operation::Get => "Failed to fetch artwork",
            Operation::Save => "Failed to save artwork",
            Operation::Delete => "Failed to delete artwork",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "arts",
            Operation::Get => "art",
            Operation::Save => "saveArt",
            Operation::Delete => "deleteArt",
        };
        f.write_str(name)
    }
}

/// Failures returned by the artwork handlers.
///
/// `Display` carries internal detail for logs. Callers outside the process
/// only ever see [`ArtError::public_message`] and [`ArtError::code`].
#[derive(Debug, Error)]
pub enum ArtError {
    #[error("Artwork data is required")]
    DataRequired,

    #[error("Artwork with ID {id} not found")]
    NotFound { op: Operation, id: String },

    #[error("{op} storage failure: {source:#}")]
    Storage {
        op: Operation,
        #[source]
        source: anyhow::Error,
    },
}

impl ArtError {
    pub fn storage(op: Operation, source: anyhow::Error) -> Self {
        ArtError::Storage { op, source }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            ArtError::DataRequired => "Artwork data is required",
            ArtError::NotFound { op, .. } | ArtError::Storage { op, .. } => op.failure_message(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ArtError::DataRequired => "VALIDATION_ERROR",
            ArtError::NotFound { .. } => "NOT_FOUND",
            ArtError::Storage { .. } => "STORAGE_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ArtError::NotFound { .. })
    }
}

/// Client-side failures in the studio. These never reach the server.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("No artwork to save. Generate some art first.")]
    NoArtwork,

    /// A thread panicked while holding the canvas.
    #[error("Canvas is unavailable after a failed redraw")]
    CanvasUnavailable,

    #[error("Failed to encode canvas: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Request to the art server failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Message reported by the API itself.
    #[error("{0}")]
    Api(String),

    #[error("Unknown palette '{0}'")]
    UnknownPalette(String),

    #[error("Unknown shape '{0}'")]
    UnknownShape(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_storage_error_hides_cause_from_public_message() {
        let err = ArtError::storage(Operation::List, anyhow!("disk I/O error at page 42"));
        assert_eq!(err.public_message(), "Failed to fetch artworks");
        assert_eq!(err.code(), "STORAGE_ERROR");
        assert!(err.to_string().contains("disk I/O error"));
    }

    #[test]
    fn test_not_found_is_distinguishable_by_code() {
        let err = ArtError::NotFound { op: Operation::Get, id: "7".into() };
        assert!(err.is_not_found());
        assert_eq!(err.public_message(), "Failed to fetch artwork");
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "Artwork with ID 7 not found");
    }

    #[test]
    fn test_validation_message_is_public() {
        assert_eq!(ArtError::DataRequired.public_message(), "Artwork data is required");
        assert_eq!(ArtError::DataRequired.code(), "VALIDATION_ERROR");
    }
}
