//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [pipeline driver](crate::process) (which decides what
//! each file needs) and the [`backend`](super::backend) (which does the pixel
//! work). This separation allows swapping backends (e.g. for testing with a
//! mock) without changing pipeline logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`Codec`]: Target codec of a resize pipeline: JPEG, WebP or AVIF.
//! - [`ResizeFilter`]: Resampling filter, configurable per job.
//! - [`ResizeTarget`]: Percent scale (JPEG/WebP) or absolute width (AVIF).
//! - [`TranscodeParams`]: Full specification for resize + encode.
//! - [`PlaceholderParams`]: Full specification for an LQIP.

use crate::config::PlaceholderFormat;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// `round(fraction * 100)`, clamped. Used for JPEG and WebP.
    pub fn from_fraction_rounded(fraction: f64) -> Self {
        Self::new((fraction * 100.0).round().max(0.0) as u32)
    }

    /// `floor(fraction * 100)`, clamped. Used for AVIF.
    pub fn from_fraction_floored(fraction: f64) -> Self {
        Self::new((fraction * 100.0).floor().max(0.0) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Target codec of a resize pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Jpeg,
    WebP,
    Avif,
}

impl Codec {
    pub const ALL: [Codec; 3] = [Codec::Jpeg, Codec::WebP, Codec::Avif];

    /// File extension written for this codec, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Jpeg => "jpg",
            Codec::WebP => "webp",
            Codec::Avif => "avif",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Resampling filter used for every resize in a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// How the resizer computes output dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeTarget {
    /// Scale both edges by a percentage, `(0, 100]`.
    Percent(f64),
    /// Absolute output width; height follows the source aspect ratio.
    Width(u32),
}

/// Parameters for a resize + encode of one in-memory image.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeParams {
    pub target: ResizeTarget,
    pub codec: Codec,
    pub quality: Quality,
    pub filter: ResizeFilter,
    /// rav1e speed, only read for [`Codec::Avif`].
    pub avif_speed: u8,
}

/// Parameters for a low quality image placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderParams {
    pub format: PlaceholderFormat,
    /// Longest edge of the output, in pixels.
    pub size: u32,
    pub quality: Quality,
    pub blur: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_from_fraction_rounds() {
        assert_eq!(Quality::from_fraction_rounded(0.8).value(), 80);
        assert_eq!(Quality::from_fraction_rounded(0.756).value(), 76);
        assert_eq!(Quality::from_fraction_rounded(1.0).value(), 100);
        // 0.001 * 100 rounds to 0, clamped up to the encoder minimum
        assert_eq!(Quality::from_fraction_rounded(0.001).value(), 1);
    }

    #[test]
    fn quality_from_fraction_floors() {
        assert_eq!(Quality::from_fraction_floored(0.6).value(), 60);
        assert_eq!(Quality::from_fraction_floored(0.659).value(), 65);
        // 0.29 * 100 == 28.999999999999996 in binary floating point
        assert_eq!(Quality::from_fraction_floored(0.29).value(), 28);
    }

    #[test]
    fn codec_extensions() {
        assert_eq!(Codec::Jpeg.extension(), "jpg");
        assert_eq!(Codec::WebP.extension(), "webp");
        assert_eq!(Codec::Avif.extension(), "avif");
        assert_eq!(Codec::Avif.to_string(), "avif");
    }

    #[test]
    fn resize_filter_default_is_lanczos3() {
        assert_eq!(
            FilterType::from(ResizeFilter::default()),
            FilterType::Lanczos3
        );
    }
}
