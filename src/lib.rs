//! # Image Versions
//!
//! An incremental batch image converter for static sites. A source directory
//! of images is turned into a destination tree of resized, re-encoded
//! "versions" (JPEG, WebP and AVIF, one per configured size) plus tiny
//! low quality placeholders (LQIP) for progressive loading.
//!
//! # Pipelines
//!
//! ```text
//! imgs/a/cat.png ─┬─ jpg  ──→ out/a/cat.lg.jpg   out/a/cat.sm.jpg
//!                 ├─ webp ──→ out/a/cat.lg.webp  out/a/cat.sm.webp
//!                 ├─ avif ──→ out/a/cat.lg.avif  out/a/cat.sm.avif
//!                 └─ placeholder ──→ out/a/cat.webp
//! ```
//!
//! Each resize pipeline runs one job per configured version; every job walks
//! the whole source tree. Outputs mirror the source-relative layout, and a
//! file is only re-encoded when its output is missing or older than the
//! source ([`freshness`]).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML configuration: source, dest, versions, placeholder settings |
//! | [`scan`] | Recursive discovery of source files by extension |
//! | [`freshness`] | Modification-time change filter for incremental runs |
//! | [`naming`] | Output extension and rename rules |
//! | [`imaging`] | Backend trait + pure-Rust implementation: identify, transcode, placeholder |
//! | [`process`] | Pipeline driver: JPEG/WebP/AVIF versions and placeholders, reports |
//! | [`placeholder_index`] | Optional JSON index of placeholder data URIs |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Percent for JPEG/WebP, Width for AVIF
//!
//! JPEG and WebP versions scale both edges by the version percent. AVIF
//! versions first read the source width, convert the percent to an absolute
//! width (floored), and derive the height from the aspect ratio. The two
//! routes can differ by one pixel on odd sizes; outputs are kept
//! byte-compatible with existing trees, so the rule stays.
//!
//! ## Asymmetric Failure Handling
//!
//! An AVIF encode failure still produces a file: the original bytes, under
//! the `.avif` name. JPEG and WebP failures write nothing. A placeholder
//! failure aborts the placeholder job. See [`process`] for the table.
//!
//! ## Destination as Cache
//!
//! There is no manifest of what was built. The existence and timestamp of
//! the expected output file is the only state, so deleting an output (or
//! touching a source) is all it takes to rebuild it.

pub mod config;
pub mod freshness;
pub mod imaging;
pub mod logging;
pub mod naming;
pub mod output;
pub mod placeholder_index;
pub mod process;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
