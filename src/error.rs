/// Everything that can go wrong between picking a file and exporting the crop.
///
/// Files that are not images never get here: intake drops them silently.
#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode JPEG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not available on this platform: {0}")]
    UnsupportedPlatform(&'static str),
}

impl From<CropError> for String {
    fn from(error: CropError) -> Self {
        error.to_string()
    }
}
