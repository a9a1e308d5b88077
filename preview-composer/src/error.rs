#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("No asset named {0}")]
    NotFound(String),
    #[error("Failed to decode image")]
    Decode(#[from] image::ImageError),
    #[error("Failed to read archive")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error")]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
    #[error("Failed to load asset {key}")]
    AssetLoad {
        key: String,
        #[source]
        source: AssetError,
    },
    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Degenerate image of size {width}x{height}")]
    DegenerateImage { width: u32, height: u32 },
}

impl ComposeError {
    pub(crate) fn asset(key: &str, source: AssetError) -> Self {
        ComposeError::AssetLoad {
            key: key.to_string(),
            source,
        }
    }
}
