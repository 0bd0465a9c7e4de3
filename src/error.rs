//! Error types for background removal operations

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, RemovalError>;

/// Error types for background removal operations
#[derive(Error, Debug)]
pub enum RemovalError {
    /// Pixel buffer does not match its declared layout, or lacks an alpha channel
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unsupported file format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Errors outside the segmentation core (decode, encode, stream reads)
    #[error("Processing error: {0}")]
    Processing(String),
}

impl RemovalError {
    /// Create a new invalid buffer error
    pub fn invalid_buffer<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBuffer(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a buffer error describing a length mismatch
    #[must_use]
    pub fn buffer_length_mismatch(
        expected: usize,
        actual: usize,
        dimensions: (u32, u32, u8),
    ) -> Self {
        let (width, height, channels) = dimensions;
        Self::InvalidBuffer(format!(
            "expected {expected} bytes for {width}x{height}x{channels}, got {actual}"
        ))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {operation} '{path_display}': {error}"),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {rec}"),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {parameter}: {value} (valid range: {valid_range}).{recommendation}"
        ))
    }

    /// Create processing error with stage context
    #[must_use]
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {info})"),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{stage}'{input_context}: {details}"
        ))
    }

    /// Whether the error came from buffer validation
    #[must_use]
    pub fn is_invalid_buffer(&self) -> bool {
        matches!(self, Self::InvalidBuffer(_))
    }
}
