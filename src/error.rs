use thiserror::Error;

/// Library error type for the wallpaper renderer.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more configured photo directories are invalid or unreadable.
    #[error("invalid photo directory: {0}")]
    BadDir(String),

    /// The scan completed but found no images.
    #[error("no images found in configured directories")]
    EmptyScan,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Image container could not be opened or inspected.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// An image source failed to produce pixels.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The device refused a texture upload.
    #[error("texture upload failed for {width}x{height} image: {reason}")]
    TextureUpload {
        width: u32,
        height: u32,
        reason: String,
    },
}

/// Why an image source could not produce pixels.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decode did not fit the memory budget; a smaller target may succeed.
    #[error("out of memory decoding at {width}x{height}")]
    OutOfMemory { width: u32, height: u32 },

    /// The data could not be decoded at any size.
    #[error("decode failed: {0}")]
    Failed(String),
}
