//! Change detection for incremental builds.
//!
//! Encoding is the expensive part of every pipeline, so a source file is only
//! processed when its output is missing or older than the source. There is no
//! manifest: the destination directory itself is the cache, keyed by the
//! source-relative path plus the expected output extension.
//!
//! # Rule
//!
//! For a source `a/b/cat.png` and extension `.sm.webp`, the would-be output is
//! `<dest>/a/b/cat.sm.webp`. The source needs processing when
//!
//! 1. that output does not exist, or
//! 2. the source's modification time is strictly newer than the output's,
//!    both truncated to whole milliseconds.
//!
//! Equal timestamps count as fresh, so an output written in the same
//! millisecond as its source is not rebuilt.
//!
//! # Bypassing
//!
//! [`AlwaysProcess`] reports every file as stale (`--force` on the CLI).
//! Tests can implement [`ChangeFilter`] directly to pin the decision.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Decides whether a source file needs (re)processing.
pub trait ChangeFilter: Sync {
    fn needs_processing(&self, source: &Path, destination: &Path) -> io::Result<bool>;
}

/// Compares filesystem modification times.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimeFilter;

/// Treats every file as stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysProcess;

impl ChangeFilter for MtimeFilter {
    fn needs_processing(&self, source: &Path, destination: &Path) -> io::Result<bool> {
        let source_mtime = std::fs::metadata(source)?.modified()?;
        let dest_mtime = match std::fs::metadata(destination) {
            Ok(meta) => Some(meta.modified()?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        Ok(is_stale(source_mtime, dest_mtime))
    }
}

impl ChangeFilter for AlwaysProcess {
    fn needs_processing(&self, _source: &Path, _destination: &Path) -> io::Result<bool> {
        Ok(true)
    }
}

/// Where the output for `relative` lands under `dest_root` with `extension`.
pub fn destination_path(dest_root: &Path, relative: &Path, extension: &str) -> PathBuf {
    dest_root.join(crate::naming::rename(relative, extension))
}

/// Pure staleness rule: missing output, or source strictly newer at
/// millisecond resolution.
pub fn is_stale(source_mtime: SystemTime, dest_mtime: Option<SystemTime>) -> bool {
    match dest_mtime {
        None => true,
        Some(dest) => millis(source_mtime) > millis(dest),
    }
}

/// Milliseconds relative to the Unix epoch; negative before it.
fn millis(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i128,
        Err(e) => -(e.duration().as_millis() as i128),
    }
}
