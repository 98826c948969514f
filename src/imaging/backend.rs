//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, transcode (resize + encode) and placeholder. All three
//! work on in-memory bytes; the pipeline driver owns reading and writing files.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), with pure Rust decoders and
//! resampling from the `image` crate, libwebp for lossy WebP.

use super::params::{PlaceholderParams, TranscodeParams};
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode {codec}: {message}")]
    Encode {
        codec: &'static str,
        message: String,
    },
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Header-level metadata of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub dimensions: Dimensions,
    /// Container format sniffed from the bytes, when recognised.
    pub format: Option<ImageFormat>,
}

/// Encoded low quality image placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub content: Vec<u8>,
    /// Placeholder dimensions.
    pub dimensions: Dimensions,
    /// Dimensions of the image the placeholder was derived from.
    pub original: Dimensions,
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the pipeline driver
/// stays backend-agnostic.
pub trait ImageBackend: Sync {
    /// Read dimensions and format without decoding pixel data.
    fn identify(&self, bytes: &[u8]) -> Result<Metadata, BackendError>;

    /// Decode, resize and re-encode an image.
    fn transcode(&self, bytes: &[u8], params: &TranscodeParams) -> Result<Vec<u8>, BackendError>;

    /// Produce a tiny, heavily compressed placeholder.
    fn placeholder(
        &self,
        bytes: &[u8],
        params: &PlaceholderParams,
    ) -> Result<Placeholder, BackendError>;
}
