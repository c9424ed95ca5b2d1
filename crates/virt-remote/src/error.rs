//! Error types for the libvirt client.

/// Result type for libvirt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during libvirt operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// XDR serialization/deserialization error.
    #[error("XDR error: {0}")]
    Xdr(#[from] virt_xdr::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not reach the daemon socket.
    #[error("connection error: {0}")]
    Connection(String),

    /// Unsupported URI scheme.
    #[error("unsupported URI: {0}")]
    UnsupportedUri(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Error reply from the libvirt daemon.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i32,
        domain: i32,
        message: String,
    },

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Packet too large.
    #[error("packet too large: {0} bytes")]
    PacketTooLarge(usize),

    /// Packet parsing error.
    #[error("packet error: {0}")]
    Packet(#[from] crate::packet::PacketError),
}
