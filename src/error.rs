//! Error types surfaced by the LEAF core. None are retried internally; the
//! caller decides how to react (prompt again, abort, report corruption).

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The access or data key was not exactly 32 bytes.
    #[error("key must be exactly 32 bytes, got {0}")]
    BadKeyLength(usize),

    /// The envelope's `leaf` field was not the supported format version.
    #[error("unsupported archive format version: {0}")]
    VersionMismatch(u32),

    /// The envelope or payload JSON did not parse, or a required field was
    /// missing or of the wrong shape.
    #[error("malformed archive data: {0}")]
    Malformed(String),

    /// An AEAD blob was shorter than a nonce.
    #[error("ciphertext is shorter than a nonce")]
    ShortInput,

    /// AEAD tag verification failed: wrong key, or the data was tampered with.
    #[error("authentication failed: wrong key or corrupted data")]
    AuthFailed,

    /// Log replay encountered an operation code it does not recognise.
    #[error("unknown log operation: {0}")]
    UnknownOp(String),

    /// Snappy (de)compression failed.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// The reader or writer supplied by the caller failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
