use image::{GrayImage, Luma, RgbaImage};

use crate::geometry::PixelRect;

/// Converts a grayscale image to binary, keeping only dark text.
///
/// Pixels with luma below `threshold` become black (text), everything else
/// white (background). Helps Tesseract on the coloured header banners.
pub fn binarize_dark_text(img: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel[0] < threshold { 0u8 } else { 255u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Crops a pixel box from an image, clamped to image bounds.
///
/// Returns `None` when the box lies entirely outside the image.
pub fn crop_rect(img: &RgbaImage, rect: &PixelRect) -> Option<RgbaImage> {
    let (w, h) = img.dimensions();
    let clamped = rect.clamp_to(w, h)?;

    Some(
        image::imageops::crop_imm(
            img,
            clamped.left,
            clamped.top,
            clamped.width(),
            clamped.height(),
        )
        .to_image(),
    )
}

/// Prepares an RGBA image for OCR: grayscale, optionally binarized.
pub fn to_ocr_input(img: &RgbaImage, binarize_threshold: Option<u8>) -> GrayImage {
    let gray = image::imageops::grayscale(img);
    match binarize_threshold {
        Some(threshold) => binarize_dark_text(&gray, threshold),
        None => gray,
    }
}
