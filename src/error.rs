use thiserror::Error;

/// Bridge-wide error type
///
/// Safe APIs return these; the `ffi` layer turns every one of them into the
/// sentinel its flat contract prescribes (null, `0`, `false`, or a dropped event).
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame {width}x{height} exceeds maximum dimension {max}")]
    FrameTooLarge { width: u32, height: u32, max: u32 },

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },

    #[error("Null pointer passed for {0}")]
    NullPointer(&'static str),

    #[error("Invalid rotation: {0} degrees")]
    InvalidRotation(i32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("String contains interior NUL: {0}")]
    InvalidString(#[from] std::ffi::NulError),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
