//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale both edges by `percent`, rounding to the nearest pixel.
///
/// Used by the JPEG and WebP pipelines. Neither edge drops below 1px.
///
/// # Examples
/// ```
/// # use image_versions::imaging::scale_by_percent;
/// assert_eq!(scale_by_percent((400, 300), 80.0), (320, 240));
/// assert_eq!(scale_by_percent((101, 51), 50.0), (51, 26));
/// ```
pub fn scale_by_percent(source: (u32, u32), percent: f64) -> (u32, u32) {
    let (w, h) = source;
    let scale = |edge: u32| ((edge as f64 * percent / 100.0).round() as u32).max(1);
    (scale(w), scale(h))
}

/// Target width for the AVIF pipeline: `floor(source_width * percent / 100)`.
///
/// Never returns 0 so a tiny source still produces a 1px-wide image.
///
/// # Examples
/// ```
/// # use image_versions::imaging::width_for_percent;
/// assert_eq!(width_for_percent(400, 80.0), 320);
/// assert_eq!(width_for_percent(333, 50.0), 166);
/// ```
pub fn width_for_percent(source_width: u32, percent: f64) -> u32 {
    ((source_width as f64 * percent / 100.0).floor() as u32).max(1)
}

/// Height matching `width` while preserving the source aspect ratio.
pub fn height_for_width(source: (u32, u32), width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return src_h.max(1);
    }
    ((src_h as f64 * width as f64 / src_w as f64).round() as u32).max(1)
}

/// Dimensions that fit inside a `size`×`size` box, preserving aspect ratio.
///
/// Never upscales: a source already inside the box is returned unchanged.
pub fn fit_within(source: (u32, u32), size: u32) -> (u32, u32) {
    let (w, h) = source;
    let longer = w.max(h);
    if longer <= size || longer == 0 {
        return (w, h);
    }
    let ratio = size as f64 / longer as f64;
    if w >= h {
        (size, ((h as f64 * ratio).round() as u32).max(1))
    } else {
        (((w as f64 * ratio).round() as u32).max(1), size)
    }
}
