//! Output file naming.
//!
//! Every pipeline writes `<stem><extension>` next to the source's relative
//! location, where the extension is the full final extension:
//!
//! - resize pipelines: `<version suffix>.<codec ext>`, so `cat.png` → `cat.sm.webp`
//! - placeholders: `.<format ext>`, so `cat.png` → `cat.webp`
//!
//! Only the last extension of the source name is replaced, so
//! `my.cat.png` becomes `my.cat.sm.webp`.

use crate::config::PlaceholderFormat;
use crate::imaging::Codec;
use std::path::{Path, PathBuf};

/// Final extension for a resize output: `suffix + "." + codec extension`.
pub fn version_extension(suffix: &str, codec: Codec) -> String {
    format!("{}.{}", suffix, codec.extension())
}

/// Final extension for a placeholder: `"." + format extension`.
pub fn placeholder_extension(format: PlaceholderFormat) -> String {
    format!(".{}", format.extension())
}

/// Replace the last extension of `relative`'s file name with `extension`.
///
/// `extension` includes its leading dot (or suffix), e.g. `.lg.jpg`.
/// A file name without an extension gets `extension` appended.
pub fn rename(relative: &Path, extension: &str) -> PathBuf {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    relative.with_file_name(format!("{stem}{extension}"))
}
