//! Error types for inventory generation.

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an inventory run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failure talking to libvirt after the connection was opened.
    #[error("libvirt: {0}")]
    Remote(#[from] virt_remote::Error),

    /// The document could not be rendered.
    #[error("failed to serialize inventory: {0}")]
    Serialize(#[from] serde_json::Error),
}
