//! Conversion configuration.
//!
//! A [`Configuration`] describes one batch job: where the source images live,
//! where the versions go, which files are sources, and the list of
//! [`VersionSpec`]s to produce. It is loaded from a TOML file, unknown keys are
//! rejected, and [`Configuration::validate`] checks every value before any job
//! starts.
//!
//! ## Config File
//!
//! ```toml
//! source = "imgs"            # Directory of source images (walked recursively)
//! dest = "out"               # Output directory, mirrors the source tree
//! source_ext = "png"         # Source file extension, no leading dot
//! format = "webp"            # Placeholder format: "jpeg" or "webp"
//!
//! [[versions]]
//! suffix = ".lg"             # Inserted before the codec extension
//! percent = 80               # Scale factor, (0, 100]
//! quality = { jpg = 0.8, webp = 0.8, avif = 0.6 }   # Fractions in (0, 1]
//!
//! [[versions]]
//! suffix = ".sm"
//! percent = 40
//! quality = { jpg = 0.7, webp = 0.7, avif = 0.5 }
//!
//! [placeholder]
//! size = 16                  # Longest edge of the placeholder, in pixels
//! quality = 0.2              # Encoder quality fraction
//! # blur = 1.5               # Optional Gaussian blur sigma
//! # index = "placeholders.json"  # Optional JSON index of data URIs
//!
//! [processing]
//! # max_threads = 4          # Omit for auto (= CPU cores)
//! filter = "lanczos3"        # nearest | triangle | catmull-rom | gaussian | lanczos3
//! avif_speed = 6             # rav1e speed, 1 (slow, small) to 10 (fast)
//! ```

use crate::imaging::{Codec, Quality, ResizeFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "image-versions.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// One batch conversion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    /// Source directory, walked recursively.
    pub source: PathBuf,
    /// Destination directory. Outputs mirror the source-relative layout.
    pub dest: PathBuf,
    /// Extension of the source files, without the leading dot.
    pub source_ext: String,
    /// Versions to produce, in order.
    pub versions: Vec<VersionSpec>,
    /// Output format of the placeholder pipeline.
    pub format: PlaceholderFormat,
    /// Placeholder generation settings.
    pub placeholder: PlaceholderConfig,
    /// Parallelism and resampling settings.
    pub processing: ProcessingConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            source: PathBuf::from("images"),
            dest: PathBuf::from("dist/images"),
            source_ext: "png".to_string(),
            versions: Vec::new(),
            format: PlaceholderFormat::default(),
            placeholder: PlaceholderConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// One resize/quality preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionSpec {
    /// Inserted between the file stem and the codec extension, e.g. `.lg`.
    pub suffix: String,
    /// Uniform scale factor in percent, `(0, 100]`.
    pub percent: f64,
    /// Per-codec quality fractions.
    pub quality: VersionQuality,
}

/// Encoder quality per codec, as fractions in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionQuality {
    pub jpg: f64,
    pub webp: f64,
    pub avif: f64,
}

impl VersionSpec {
    /// Encoder quality for `codec`.
    ///
    /// JPEG and WebP round the scaled fraction; AVIF floors it.
    pub fn quality_for(&self, codec: Codec) -> Quality {
        match codec {
            Codec::Jpeg => Quality::from_fraction_rounded(self.quality.jpg),
            Codec::WebP => Quality::from_fraction_rounded(self.quality.webp),
            Codec::Avif => Quality::from_fraction_floored(self.quality.avif),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.percent > 0.0 && self.percent <= 100.0) {
            return Err(ConfigError::Validation(format!(
                "versions[{}].percent must be in (0, 100], got {}",
                self.suffix, self.percent
            )));
        }
        for (name, value) in [
            ("jpg", self.quality.jpg),
            ("webp", self.quality.webp),
            ("avif", self.quality.avif),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Validation(format!(
                    "versions[{}].quality.{name} must be in (0, 1], got {value}",
                    self.suffix
                )));
            }
        }
        if self.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "version suffix must not contain path separators: {:?}",
                self.suffix
            )));
        }
        Ok(())
    }
}

/// Output format for placeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderFormat {
    Jpeg,
    #[default]
    Webp,
}

impl PlaceholderFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// Placeholder generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholderConfig {
    /// Longest edge of the placeholder in pixels.
    pub size: u32,
    /// Encoder quality fraction, `(0, 1]`.
    pub quality: f64,
    /// Gaussian blur sigma applied before downscaling.
    pub blur: Option<f32>,
    /// File name of a JSON index of placeholders (dimensions + data URI),
    /// written to the destination root. No index when absent.
    pub index: Option<String>,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            size: 16,
            quality: 0.2,
            blur: None,
            index: None,
        }
    }
}

/// Parallel processing and resampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of worker threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
    /// Resampling filter for every resize.
    pub filter: ResizeFilter,
    /// rav1e encoder speed for AVIF, 1..=10.
    pub avif_speed: u8,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_threads: None,
            filter: ResizeFilter::default(),
            avif_speed: 6,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

impl Configuration {
    /// Validate every value. Resize pipelines additionally need
    /// [`Configuration::validate_versions`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_ext.is_empty() {
            return Err(ConfigError::Validation("source_ext must not be empty".into()));
        }
        if self.source_ext.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "source_ext must not start with a dot: {:?}",
                self.source_ext
            )));
        }
        if self.source.as_os_str().is_empty() || self.dest.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "source and dest must be non-empty paths".into(),
            ));
        }

        let mut seen = HashSet::new();
        for version in &self.versions {
            version.validate()?;
            if !seen.insert(version.suffix.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate version suffix {:?}",
                    version.suffix
                )));
            }
        }

        if self.placeholder.size == 0 {
            return Err(ConfigError::Validation(
                "placeholder.size must be at least 1".into(),
            ));
        }
        if !(self.placeholder.quality > 0.0 && self.placeholder.quality <= 1.0) {
            return Err(ConfigError::Validation(
                "placeholder.quality must be in (0, 1]".into(),
            ));
        }
        if let Some(sigma) = self.placeholder.blur
            && !(sigma.is_finite() && sigma >= 0.0)
        {
            return Err(ConfigError::Validation(
                "placeholder.blur must be a non-negative number".into(),
            ));
        }
        if let Some(name) = &self.placeholder.index
            && (name.is_empty() || name.contains(['/', '\\']))
        {
            return Err(ConfigError::Validation(format!(
                "placeholder.index must be a plain file name: {name:?}"
            )));
        }
        if !(1..=10).contains(&self.processing.avif_speed) {
            return Err(ConfigError::Validation(
                "processing.avif_speed must be 1-10".into(),
            ));
        }
        Ok(())
    }

    /// Resize pipelines need at least one version to do anything.
    pub fn validate_versions(&self) -> Result<(), ConfigError> {
        if self.versions.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[versions]] entry is required".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a configuration from TOML text and validate it.
pub fn parse_config(content: &str) -> Result<Configuration, ConfigError> {
    let config: Configuration = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a configuration file.
///
/// Relative `source` and `dest` paths are resolved against the directory
/// containing the config file, so a config works regardless of the current
/// working directory.
pub fn load_config(path: &Path) -> Result<Configuration, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if config.source.is_relative() {
            config.source = base.join(&config.source);
        }
        if config.dest.is_relative() {
            config.dest = base.join(&config.dest);
        }
    }
    Ok(config)
}

/// Returns a fully-commented stock `image-versions.toml`.
pub fn stock_config_toml() -> &'static str {
    r##"# image-versions configuration
# All keys except [[versions]] are optional; defaults shown.

# Directory of source images (walked recursively).
source = "images"

# Output directory. Outputs mirror the source-relative layout:
#   images/a/cat.png  ->  dist/images/a/cat.lg.webp
dest = "dist/images"

# Extension of the source files, without the leading dot.
source_ext = "png"

# Placeholder output format: "jpeg" or "webp".
format = "webp"

# ---------------------------------------------------------------------------
# Versions: one output per source file, per codec, per entry.
# ---------------------------------------------------------------------------

[[versions]]
# Inserted before the codec extension: cat.png -> cat.lg.jpg
suffix = ".lg"
# Uniform scale factor in percent, (0, 100].
percent = 100
# Encoder quality as fractions in (0, 1].
quality = { jpg = 0.8, webp = 0.8, avif = 0.6 }

[[versions]]
suffix = ".sm"
percent = 50
quality = { jpg = 0.75, webp = 0.75, avif = 0.5 }

# ---------------------------------------------------------------------------
# Low quality image placeholders (PNG sources only).
# ---------------------------------------------------------------------------

[placeholder]
# Longest edge of the placeholder, in pixels.
size = 16
# Encoder quality fraction.
quality = 0.2
# Optional Gaussian blur sigma applied before downscaling.
# blur = 1.5
# Optional JSON index (dimensions + base64 data URI per placeholder),
# written to the dest root.
# index = "placeholders.json"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------

[processing]
# Maximum worker threads (omit for auto = number of CPU cores).
# max_threads = 4
# Resampling filter: nearest | triangle | catmull-rom | gaussian | lanczos3
filter = "lanczos3"
# rav1e speed for AVIF encoding, 1 (slowest, smallest) to 10 (fastest).
avif_speed = 6
"##
}
