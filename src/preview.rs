//! Preview rendering for calibration authoring.
//!
//! Draws every anchor box and the probe grid of one calibration entry on a
//! schedule image, so a new template's offset can be checked by eye.

use anyhow::Result;
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::geometry::{CoordinateMap, GeometrySpec};

/// Color constants for preview rendering.
pub const COLOR_ANCHOR: Rgba<u8> = Rgba([0, 0, 255, 255]); // Blue
pub const COLOR_DATE_BOX: Rgba<u8> = Rgba([255, 0, 255, 255]); // Magenta
pub const COLOR_PROBE: Rgba<u8> = Rgba([255, 128, 0, 255]); // Orange
pub const COLOR_HIGHLIGHT: Rgba<u8> = Rgba([0, 200, 0, 255]); // Green

/// Renders anchor boxes for all entries plus the probe grid of `entry`.
///
/// The selected entry's anchor is drawn thicker in the highlight colour.
pub fn render_preview(screenshot: &RgbaImage, geometry: &GeometrySpec, entry: usize) -> RgbaImage {
    let mut img = screenshot.clone();

    for (idx, calibration) in geometry.calibrations.iter().enumerate() {
        let (color, thickness) = if idx == entry {
            (COLOR_HIGHLIGHT, 4)
        } else {
            (COLOR_ANCHOR, 2)
        };
        let a = &calibration.anchor;
        draw_rect(&mut img, a.left, a.top, a.width(), a.height(), color, thickness);
    }

    let b = &geometry.no_outage_date_box;
    draw_rect(&mut img, b.left, b.top, b.width(), b.height(), COLOR_DATE_BOX, 2);

    if let Some(calibration) = geometry.calibrations.get(entry) {
        let map = CoordinateMap::build(geometry, calibration.offset);
        for point in map.points() {
            draw_crosshair(&mut img, point.x, point.y, COLOR_PROBE, 6);
        }
    }

    img
}

/// Saves a preview image.
pub fn save_preview(img: &RgbaImage, path: &Path) -> Result<()> {
    img.save(path)?;
    Ok(())
}

/// Draws a rectangle border on an image.
pub fn draw_rect(
    img: &mut RgbaImage,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: Rgba<u8>,
    thickness: u32,
) {
    let (img_w, img_h) = img.dimensions();
    let mut put = |px: u32, py: u32| {
        if px < img_w && py < img_h {
            img.put_pixel(px, py, color);
        }
    };

    for t in 0..thickness {
        // Top and bottom edges
        for dx in 0..w {
            put(x + dx, y + t);
            put(x + dx, (y + h.saturating_sub(1)).saturating_sub(t));
        }
        // Left and right edges
        for dy in 0..h {
            put(x + t, y + dy);
            put((x + w.saturating_sub(1)).saturating_sub(t), y + dy);
        }
    }
}

/// Draws a crosshair centred on a probe point, leaving the point itself untouched.
pub fn draw_crosshair(img: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>, arm_length: u32) {
    let (img_w, img_h) = img.dimensions();

    for d in 2..=arm_length {
        let candidates = [
            (x.checked_sub(d), Some(y)),
            (x.checked_add(d), Some(y)),
            (Some(x), y.checked_sub(d)),
            (Some(x), y.checked_add(d)),
        ];
        for (px, py) in candidates {
            if let (Some(px), Some(py)) = (px, py) {
                if px < img_w && py < img_h {
                    img.put_pixel(px, py, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_draw_rect() {
        let mut img = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        draw_rect(&mut img, 10, 10, 50, 30, COLOR_ANCHOR, 2);

        // Check top-left corner and bottom-right corner are drawn
        assert_eq!(*img.get_pixel(10, 10), COLOR_ANCHOR);
        assert_eq!(*img.get_pixel(59, 39), COLOR_ANCHOR);
        // Check center is still black
        assert_eq!(*img.get_pixel(35, 25), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_rect_clips_at_edges() {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        draw_rect(&mut img, 10, 10, 50, 50, COLOR_ANCHOR, 1);
        assert_eq!(*img.get_pixel(19, 10), COLOR_ANCHOR);
    }

    #[test]
    fn test_crosshair_keeps_probe_pixel() {
        let mut img = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        draw_crosshair(&mut img, 50, 50, COLOR_PROBE, 6);

        assert_eq!(*img.get_pixel(50, 50), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(56, 50), COLOR_PROBE);
        assert_eq!(*img.get_pixel(50, 44), COLOR_PROBE);
    }

    #[test]
    fn test_crosshair_near_origin() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        draw_crosshair(&mut img, 0, 0, COLOR_PROBE, 6);
        assert_eq!(*img.get_pixel(3, 0), COLOR_PROBE);
    }

    #[test]
    fn test_render_preview_marks_selected_entry() {
        let geometry = GeometrySpec::default();
        let img = RgbaImage::from_pixel(1100, 1200, Rgba([255, 255, 255, 255]));

        let preview = render_preview(&img, &geometry, 1);
        let selected = geometry.calibrations[1].anchor;
        let other = geometry.calibrations[0].anchor;
        assert_eq!(*preview.get_pixel(selected.left, selected.top), COLOR_HIGHLIGHT);
        assert_eq!(*preview.get_pixel(other.left, other.top), COLOR_ANCHOR);

        let probe = CoordinateMap::build(&geometry, geometry.calibrations[1].offset).point(0, 0);
        assert_eq!(*preview.get_pixel(probe.x + 3, probe.y), COLOR_PROBE);
    }

    #[test]
    fn test_save_preview() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let img = RgbaImage::from_pixel(4, 4, COLOR_PROBE);

        save_preview(&img, &path).unwrap();
        assert!(path.exists());
    }
}
