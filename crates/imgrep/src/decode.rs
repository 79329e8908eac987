//! Image decode capability.
//!
//! Decoding runs before recognition so that unreadable files are rejected
//! with a [`ImgrepError::Decode`] instead of surfacing as opaque OCR engine
//! failures. The worker records either failure mode as an `Error` cache
//! entry; neither aborts the batch.

use crate::error::{ImgrepError, Result};
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Decode image bytes, guessing the format from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImgrepError::decode_with_source("failed to probe image format", e))?;

    let format = reader
        .format()
        .ok_or_else(|| ImgrepError::decode("could not determine image format"))?;

    reader
        .decode()
        .map_err(|e| ImgrepError::decode_with_source(format!("failed to decode {:?} image", format), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_decode_valid_png() {
        let decoded = decode_image(&tiny_png()).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result.unwrap_err(), ImgrepError::Decode { .. }));
    }

    #[test]
    fn test_decode_truncated_png_fails() {
        let mut bytes = tiny_png();
        bytes.truncate(bytes.len() / 2);

        let result = decode_image(&bytes);
        assert!(matches!(result.unwrap_err(), ImgrepError::Decode { .. }));
    }

    #[test]
    fn test_decode_empty_input_fails() {
        let result = decode_image(b"");
        assert!(matches!(result.unwrap_err(), ImgrepError::Decode { .. }));
    }
}
