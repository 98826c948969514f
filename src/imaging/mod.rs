//! Image processing: decoding, resizing and encoding in pure Rust (plus libwebp).
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | `resize_exact` (Lanczos3 by default) |
//! | **Encode** | JPEG + AVIF via `image`, lossy WebP via `webp` |
//! | **Placeholder** | fit-within downscale + low quality JPEG/WebP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Metadata, Placeholder};
pub use calculations::{fit_within, height_for_width, scale_by_percent, width_for_percent};
pub use params::{
    Codec, PlaceholderParams, Quality, ResizeFilter, ResizeTarget, TranscodeParams,
};
pub use rust_backend::RustBackend;
