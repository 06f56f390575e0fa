use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Invalid segmentation options: {0}")]
    InvalidOptions(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Preview encoding error: {0}")]
    Encoding(String),

    #[error("Segmentation cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SegmentationError {
    pub fn invalid_options<S: Into<String>>(msg: S) -> Self {
        Self::InvalidOptions(msg.into())
    }

    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Self::Encoding(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
