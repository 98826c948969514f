//! Shared test utilities.
//!
//! Synthetic images and source-tree setup so tests never depend on fixture
//! files checked into the repo.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_png(&tmp.path().join("imgs/a/cat.png"), 400, 300);
//! write_source(&tmp.path().join("imgs"), "b.png", b"not really a png");
//! ```

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;

// =========================================================================
// Synthetic images
// =========================================================================

/// PNG-encoded gradient of the given size.
///
/// A gradient rather than a flat fill so encoders and resamplers have real
/// content to work with.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Write a synthetic PNG to `path`, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, png_bytes(width, height)).unwrap();
}

// =========================================================================
// Source tree setup
// =========================================================================

/// Write raw `contents` to `root/relative`, creating parent directories.
///
/// Mock backends never decode, so most pipeline tests only need bytes.
pub fn write_source(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Set a file's modification time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn png_bytes_decodes_to_requested_size() {
        let img = image::load_from_memory(&png_bytes(7, 3)).unwrap();
        assert_eq!((img.width(), img.height()), (7, 3));
    }

    #[test]
    fn write_source_creates_parents() {
        let tmp = TempDir::new().unwrap();
        write_source(tmp.path(), "a/b/c.png", b"x");
        assert_eq!(std::fs::read(tmp.path().join("a/b/c.png")).unwrap(), b"x");
    }
}
