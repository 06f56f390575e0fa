use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::filter::laplacian_filter;

use crate::types::BoundingBox;

/// Blur threshold used when none is configured
pub const DEFAULT_BLUR_THRESHOLD: f64 = 15.0;

/// Rec. 601 luma of the colour channels. Alpha is ignored.
pub fn luminance(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Sharpness scoring over one image.
///
/// The Laplacian is computed once for the whole image so that scoring many
/// segments of the same image stays linear.
pub struct BlurScorer {
    laplacian: ImageBuffer<Luma<i16>, Vec<i16>>,
}

impl BlurScorer {
    pub fn new(image: &RgbaImage) -> Self {
        Self {
            laplacian: laplacian_filter(&luminance(image)),
        }
    }

    /// Mean absolute Laplacian response over the interior of `bbox`.
    ///
    /// Border rows and columns of the box, and of the image, are skipped.
    /// Lower means blurrier; a box with no interior scores 0.
    pub fn score(&self, bbox: &BoundingBox) -> f64 {
        let (width, height) = self.laplacian.dimensions();
        let x_end = (bbox.x + bbox.width).saturating_sub(1).min(width.saturating_sub(1));
        let y_end = (bbox.y + bbox.height).saturating_sub(1).min(height.saturating_sub(1));

        let mut sum = 0.0;
        let mut count = 0usize;
        for y in (bbox.y + 1)..y_end {
            for x in (bbox.x + 1)..x_end {
                sum += (self.laplacian.get_pixel(x, y)[0] as f64).abs();
                count += 1;
            }
        }

        if count > 0 { sum / count as f64 } else { 0.0 }
    }
}

/// One-off blur score of `bbox` in `image`
pub fn blur_score(image: &RgbaImage, bbox: &BoundingBox) -> f64 {
    BlurScorer::new(image).score(bbox)
}
