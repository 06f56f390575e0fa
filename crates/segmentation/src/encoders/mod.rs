//! Preview encoders for cropped segments

use image::{
    codecs::png::{CompressionType, FilterType, PngEncoder},
    ExtendedColorType, ImageEncoder, RgbaImage,
};

use crate::{
    error::{Result, SegmentationError},
    traits::PreviewEncoder,
    types::Preview,
};

pub const PNG_MIME_TYPE: &str = "image/png";

/// Lossless PNG encoder backed by the `image` crate
#[derive(Debug, Clone, Copy)]
pub struct PngPreviewEncoder {
    pub compression: CompressionType,
}

impl Default for PngPreviewEncoder {
    fn default() -> Self {
        Self { compression: CompressionType::Default }
    }
}

impl PngPreviewEncoder {
    /// Favour encoding speed over output size
    pub fn fast() -> Self {
        Self { compression: CompressionType::Fast }
    }
}

impl PreviewEncoder for PngPreviewEncoder {
    fn mime_type(&self) -> &str {
        PNG_MIME_TYPE
    }

    fn encode(&self, image: &RgbaImage) -> Result<Preview> {
        let mut bytes = Vec::new();
        PngEncoder::new_with_quality(&mut bytes, self.compression, FilterType::Adaptive)
            .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
            .map_err(|e| SegmentationError::encoding(format!("Failed to encode PNG preview: {e}")))?;

        Ok(Preview::new(PNG_MIME_TYPE, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_preview_preserves_alpha() {
        let image = RgbaImage::from_fn(7, 5, |x, y| Rgba([x as u8 * 30, y as u8 * 40, 7, (x * y * 9) as u8]));

        let preview = PngPreviewEncoder::fast().encode(&image).unwrap();
        assert_eq!(preview.mime_type, "image/png");
        assert!(preview.to_data_url().starts_with("data:image/png;base64,"));

        let decoded = image::load_from_memory(&preview.bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }
}
