//! Decoding of fetched bytes into rasters.

use crate::core::error::DecodeError;
use crate::core::types::{Raster, RawImage};
use image::{ImageError, ImageFormat};

/// Decode `raw` into an RGBA raster.
///
/// The format is sniffed from the leading bytes; the content type is only
/// consulted when sniffing fails.
pub fn decode(raw: RawImage) -> Result<Raster, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::Corrupt("empty body".to_string()));
    }

    let format = image::guess_format(&raw.bytes)
        .ok()
        .or_else(|| raw.content_type.as_deref().and_then(format_from_content_type));

    let Some(format) = format else {
        return Err(DecodeError::UnsupportedFormat {
            content_type: raw.content_type,
        });
    };

    match image::load_from_memory_with_format(&raw.bytes, format) {
        Ok(image) => Ok(image.to_rgba8()),
        Err(ImageError::Unsupported(_)) => Err(DecodeError::UnsupportedFormat {
            content_type: raw.content_type,
        }),
        Err(error) => Err(DecodeError::Corrupt(error.to_string())),
    }
}

fn format_from_content_type(content_type: &str) -> Option<ImageFormat> {
    let mime = content_type.split(';').next()?.trim();
    ImageFormat::from_mime_type(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::png_bytes;

    #[test]
    fn test_decode_png() {
        let raw = RawImage::new(png_bytes(3, 2, [1, 2, 3, 255]), Some("image/png".to_string()));
        let raster = decode(raw).unwrap();
        assert_eq!(raster.dimensions(), (3, 2));
        assert_eq!(raster.get_pixel(2, 1).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_decode_ignores_wrong_content_type() {
        let raw = RawImage::new(png_bytes(2, 2, [9, 9, 9, 255]), Some("image/jpeg".to_string()));
        assert!(decode(raw).is_ok());
    }

    #[test]
    fn test_decode_unknown_bytes() {
        let raw = RawImage::new(b"<html>not an image</html>".to_vec(), Some("text/html".to_string()));
        assert_eq!(
            decode(raw),
            Err(DecodeError::UnsupportedFormat {
                content_type: Some("text/html".to_string())
            })
        );
    }

    #[test]
    fn test_decode_truncated_png() {
        let mut bytes = png_bytes(8, 8, [200, 100, 50, 255]);
        bytes.truncate(bytes.len() / 2);
        let result = decode(RawImage::new(bytes, None));
        assert!(matches!(result, Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_decode_empty() {
        let result = decode(RawImage::new(Vec::new(), Some("image/png".to_string())));
        assert!(matches!(result, Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_content_type_parameters_are_ignored() {
        assert_eq!(
            format_from_content_type("image/png; charset=binary"),
            Some(ImageFormat::Png)
        );
        assert_eq!(format_from_content_type("text/plain"), None);
    }
}
