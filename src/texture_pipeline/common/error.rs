use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureBuildError {
    #[error("Unsupported texture format: {0}")]
    UnsupportedFormat(String),

    #[error("Compression to {format} failed: {reason}")]
    CompressionFailed { format: String, reason: String },

    #[error("Image {width}x{height} exceeds the maximum dimension {max}")]
    DimensionTooLarge { width: usize, height: usize, max: usize },

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Invalid build settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid texture source: {0}")]
    InvalidSource(String),

    #[error("Cached record {key} is corrupt: {reason}")]
    CacheCorrupt { key: String, reason: String },

    #[error("Blob store error: {0}")]
    Store(String),

    #[error("Build for {key} failed: {reason}")]
    BuildFailed { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TextureBuildError>;
