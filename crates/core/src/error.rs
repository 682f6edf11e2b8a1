//! Error type for overlay operations.

/// Error type for overlay operations.
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Errors that can occur while driving the overlay.
///
/// None of these reach the page's user; the controller recovers from them
/// by falling back to an immediate hide.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// The library container could not be found
    #[error("Container not found: {0}")]
    ContainerMissing(String),

    /// The overlay element is gone from the document
    #[error("Overlay element missing")]
    OverlayMissing,

    /// A DOM mutation failed
    #[error("DOM error: {0}")]
    Dom(String),

    /// The progress library rejected a call
    #[error("Progress library error: {0}")]
    Library(String),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
