use thiserror::Error;

#[derive(Error, Debug)]
pub enum MprError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Invalid dimensions: {width}x{height}x{depth}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        depth: usize,
    },

    #[error("{filter} requires single-component input, got {components} components")]
    UnsupportedComponents {
        filter: &'static str,
        components: usize,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Slice index {index} out of range (total: {total})")]
    SliceIndexOutOfRange { index: usize, total: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MprError>;
