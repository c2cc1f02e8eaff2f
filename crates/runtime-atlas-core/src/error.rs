use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "image")]
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Item '{key}' ({width}x{height}) does not fit a {max_width}x{max_height} page")]
    OversizedItem {
        key: String,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("Atlas was cleared and has no fit strategy attached")]
    Detached,
    #[error("No backing surface for page {0}")]
    MissingSurface(usize),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
