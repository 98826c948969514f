//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | Resize | `DynamicImage::resize_exact` with the configured filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → WebP | `webp::Encoder` (lossy libwebp) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |
//! | Placeholder | optional `blur`, fit-within downscale, JPEG/WebP encode |

use super::backend::{BackendError, Dimensions, ImageBackend, Metadata, Placeholder};
use super::calculations::{fit_within, height_for_width, scale_by_percent};
use super::params::{
    Codec, PlaceholderParams, Quality, ResizeFilter, ResizeTarget, TranscodeParams,
};
use crate::config::PlaceholderFormat;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

fn dimensions_of(img: &DynamicImage) -> Dimensions {
    let (width, height) = img.dimensions();
    Dimensions { width, height }
}

/// Output dimensions for a resize target.
fn target_dimensions(source: Dimensions, target: ResizeTarget) -> (u32, u32) {
    let src = (source.width, source.height);
    match target {
        ResizeTarget::Percent(percent) => scale_by_percent(src, percent),
        ResizeTarget::Width(width) => (width.max(1), height_for_width(src, width.max(1))),
    }
}

fn resize(img: &DynamicImage, target: ResizeTarget, filter: ResizeFilter) -> DynamicImage {
    let (w, h) = target_dimensions(dimensions_of(img), target);
    if (w, h) == img.dimensions() {
        return img.clone();
    }
    img.resize_exact(w, h, FilterType::from(filter))
}

/// Collapse 16-bit and float buffers to 8-bit, keeping alpha when present.
fn to_8bit(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img.clone(),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode {
            codec: "jpeg",
            message: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let img = to_8bit(img);
    let encoder = webp::Encoder::from_image(&img).map_err(|e| BackendError::Encode {
        codec: "webp",
        message: e.to_string(),
    })?;
    // `Encoder::encode` unwraps internally; oversized inputs must be an error.
    let encoded = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| BackendError::Encode {
            codec: "webp",
            message: format!("{e:?}"),
        })?;
    Ok(encoded.to_vec())
}

fn encode_avif(img: &DynamicImage, quality: Quality, speed: u8) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut buf, speed, quality.value() as u8);
    to_8bit(img)
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode {
            codec: "avif",
            message: e.to_string(),
        })?;
    Ok(buf)
}

/// Intermediate size for placeholder blurring: a few times the target edge.
const PLACEHOLDER_WORKING_FACTOR: u32 = 4;

fn working_dimensions(original: Dimensions, size: u32) -> (u32, u32) {
    fit_within(
        (original.width, original.height),
        size.saturating_mul(PLACEHOLDER_WORKING_FACTOR),
    )
}

/// Encode a resized image into `codec`.
fn encode(img: &DynamicImage, params: &TranscodeParams) -> Result<Vec<u8>, BackendError> {
    match params.codec {
        Codec::Jpeg => encode_jpeg(img, params.quality),
        Codec::WebP => encode_webp(img, params.quality),
        Codec::Avif => encode_avif(img, params.quality, params.avif_speed),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Metadata, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format();
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(Metadata {
            dimensions: Dimensions { width, height },
            format,
        })
    }

    fn transcode(&self, bytes: &[u8], params: &TranscodeParams) -> Result<Vec<u8>, BackendError> {
        let img = decode(bytes)?;
        let resized = resize(&img, params.target, params.filter);
        let out = encode(&resized, params)?;
        debug!(
            codec = %params.codec,
            quality = params.quality.value(),
            width = resized.width(),
            height = resized.height(),
            input_bytes = bytes.len(),
            output_bytes = out.len(),
            "encoded"
        );
        Ok(out)
    }

    fn placeholder(
        &self,
        bytes: &[u8],
        params: &PlaceholderParams,
    ) -> Result<Placeholder, BackendError> {
        let img = decode(bytes)?;
        let original = dimensions_of(&img);

        // Blur a cheap intermediate instead of the full decode; sigma is given
        // in source pixels, so it shrinks with the image.
        let (iw, ih) = working_dimensions(original, params.size);
        let working = if (iw, ih) == (original.width, original.height) {
            img
        } else {
            img.resize_exact(iw, ih, FilterType::Triangle)
        };
        let softened = match params.blur {
            Some(sigma) if sigma > 0.0 => {
                let scale = iw as f32 / original.width.max(1) as f32;
                working.blur(sigma * scale)
            }
            _ => working,
        };
        let (w, h) = fit_within((original.width, original.height), params.size);
        let small = softened.resize_exact(w, h, FilterType::Lanczos3);

        let content = match params.format {
            PlaceholderFormat::Jpeg => encode_jpeg(&small, params.quality)?,
            PlaceholderFormat::Webp => encode_webp(&small, params.quality)?,
        };
        Ok(Placeholder {
            content,
            dimensions: Dimensions {
                width: w,
                height: h,
            },
            original,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::png_bytes;
    use image::ImageFormat;

    fn params(target: ResizeTarget, codec: Codec) -> TranscodeParams {
        TranscodeParams {
            target,
            codec,
            quality: Quality::new(80),
            filter: ResizeFilter::default(),
            avif_speed: 10,
        }
    }

    #[test]
    fn identify_synthetic_png() {
        let backend = RustBackend::new();
        let meta = backend.identify(&png_bytes(200, 150)).unwrap();
        assert_eq!(
            meta.dimensions,
            Dimensions {
                width: 200,
                height: 150
            }
        );
        assert_eq!(meta.format, Some(ImageFormat::Png));
    }

    #[test]
    fn identify_garbage_errors() {
        let backend = RustBackend::new();
        assert!(backend.identify(b"definitely not an image").is_err());
    }

    #[test]
    fn transcode_png_to_jpeg_by_percent() {
        let backend = RustBackend::new();
        let out = backend
            .transcode(
                &png_bytes(400, 300),
                &params(ResizeTarget::Percent(80.0), Codec::Jpeg),
            )
            .unwrap();

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (320, 240));
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn transcode_png_to_webp_by_percent() {
        let backend = RustBackend::new();
        let out = backend
            .transcode(
                &png_bytes(400, 300),
                &params(ResizeTarget::Percent(50.0), Codec::WebP),
            )
            .unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::WebP);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (200, 150));
    }

    #[test]
    fn transcode_png_to_avif_by_width() {
        let backend = RustBackend::new();
        let out = backend
            .transcode(
                &png_bytes(64, 48),
                &params(ResizeTarget::Width(32), Codec::Avif),
            )
            .unwrap();

        let avif = avif_parse::read_avif(&mut Cursor::new(&out)).unwrap();
        let meta = avif.primary_item_metadata().unwrap();
        assert_eq!(meta.max_frame_width.get(), 32);
        assert_eq!(meta.max_frame_height.get(), 24);
    }

    #[test]
    fn transcode_garbage_is_decode_error() {
        let backend = RustBackend::new();
        let result = backend.transcode(
            b"garbage",
            &params(ResizeTarget::Percent(50.0), Codec::Jpeg),
        );
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn jpeg_quality_changes_output_size() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(128, 128, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        }));
        let low = encode_jpeg(&img, Quality::new(10)).unwrap();
        let high = encode_jpeg(&img, Quality::new(95)).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn rgba_source_encodes_to_jpeg() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(10, 10));
        let out = encode_jpeg(&img, Quality::new(80)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn sixteen_bit_source_encodes_to_webp() {
        let img = DynamicImage::ImageRgb16(image::ImageBuffer::new(8, 8));
        let out = encode_webp(&img, Quality::new(80)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn placeholder_webp_fits_within_size() {
        let backend = RustBackend::new();
        let lqip = backend
            .placeholder(
                &png_bytes(400, 300),
                &PlaceholderParams {
                    format: PlaceholderFormat::Webp,
                    size: 16,
                    quality: Quality::new(20),
                    blur: None,
                },
            )
            .unwrap();

        assert_eq!(
            lqip.dimensions,
            Dimensions {
                width: 16,
                height: 12
            }
        );
        assert_eq!(
            lqip.original,
            Dimensions {
                width: 400,
                height: 300
            }
        );
        assert_eq!(
            image::guess_format(&lqip.content).unwrap(),
            ImageFormat::WebP
        );
    }

    #[test]
    fn placeholder_jpeg_with_blur() {
        let backend = RustBackend::new();
        let lqip = backend
            .placeholder(
                &png_bytes(100, 200),
                &PlaceholderParams {
                    format: PlaceholderFormat::Jpeg,
                    size: 16,
                    quality: Quality::new(20),
                    blur: Some(2.0),
                },
            )
            .unwrap();

        assert_eq!(
            lqip.dimensions,
            Dimensions {
                width: 8,
                height: 16
            }
        );
        let decoded = image::load_from_memory(&lqip.content).unwrap();
        assert_eq!(decoded.dimensions(), (8, 16));
    }

    #[test]
    fn oversized_webp_is_encode_error() {
        // libwebp caps each edge at 16383 pixels
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(16_400, 2));
        let result = encode_webp(&img, Quality::new(80));
        assert!(matches!(result, Err(BackendError::Encode { codec: "webp", .. })));
    }

    #[test]
    fn working_dimensions_bounded_by_factor() {
        let large = Dimensions {
            width: 4000,
            height: 3000,
        };
        assert_eq!(working_dimensions(large, 16), (64, 48));

        let small = Dimensions {
            width: 40,
            height: 30,
        };
        assert_eq!(working_dimensions(small, 16), (40, 30));
    }

    #[test]
    fn placeholder_blur_on_large_source() {
        let backend = RustBackend::new();
        let lqip = backend
            .placeholder(
                &png_bytes(1600, 1200),
                &PlaceholderParams {
                    format: PlaceholderFormat::Webp,
                    size: 16,
                    quality: Quality::new(20),
                    blur: Some(8.0),
                },
            )
            .unwrap();

        assert_eq!(
            lqip.dimensions,
            Dimensions {
                width: 16,
                height: 12
            }
        );
        let decoded = image::load_from_memory(&lqip.content).unwrap();
        assert_eq!(decoded.dimensions(), (16, 12));
    }
}
