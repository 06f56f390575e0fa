use image::{imageops, RgbaImage};

use crate::{
    error::{Result, SegmentationError},
    traits::PreviewEncoder,
    types::{BoundingBox, PixelCoord, Segment, SegmentId},
};

/// Default edge length used for sticker thumbnails
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 100;

/// Copy `pixels` from `image` onto a transparent canvas sized to the padded
/// bounding box. Pixels of the box that are not members stay `[0, 0, 0, 0]`.
pub fn extract_segment_image(
    image: &RgbaImage,
    pixels: &[PixelCoord],
    bounding_box: BoundingBox,
    padding: u32,
) -> Result<RgbaImage> {
    let width = padded_extent(bounding_box.width, padding)?;
    let height = padded_extent(bounding_box.height, padding)?;
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|area| area.checked_mul(4))
        .ok_or_else(|| SegmentationError::invalid_options(format!("padding {padding} is too large")))?;

    let mut canvas = RgbaImage::new(width, height);
    for pixel in pixels {
        let x = pixel.x - bounding_box.x + padding;
        let y = pixel.y - bounding_box.y + padding;
        canvas.put_pixel(x, y, *image.get_pixel(pixel.x, pixel.y));
    }

    Ok(canvas)
}

fn padded_extent(extent: u32, padding: u32) -> Result<u32> {
    padding
        .checked_mul(2)
        .and_then(|border| border.checked_add(extent))
        .ok_or_else(|| SegmentationError::invalid_options(format!("padding {padding} is too large")))
}

/// Mean position of the given pixels, `(0.0, 0.0)` when empty
pub fn centroid(pixels: &[PixelCoord]) -> (f64, f64) {
    if pixels.is_empty() {
        return (0.0, 0.0);
    }

    let (sum_x, sum_y) = pixels
        .iter()
        .fold((0u64, 0u64), |(sx, sy), p| (sx + p.x as u64, sy + p.y as u64));
    let count = pixels.len() as f64;

    (sum_x as f64 / count, sum_y as f64 / count)
}

/// Materialise a segment: crop, centroid and preview
pub(crate) fn build_segment(
    image: &RgbaImage,
    id: SegmentId,
    pixels: Vec<PixelCoord>,
    bounding_box: BoundingBox,
    padding: u32,
    encoder: &dyn PreviewEncoder,
) -> Result<Segment> {
    let cropped_image = extract_segment_image(image, &pixels, bounding_box, padding)?;
    let preview = encoder.encode(&cropped_image)?;

    Ok(Segment {
        id,
        area: pixels.len(),
        centroid: centroid(&pixels),
        pixels,
        bounding_box,
        cropped_image,
        preview,
        blur_score: None,
    })
}

/// Scale the unpadded crop of `segment` to fit a `max_size` square,
/// keeping the aspect ratio. Small segments are scaled up.
pub fn thumbnail(segment: &Segment, max_size: u32) -> Result<RgbaImage> {
    if max_size == 0 {
        return Err(SegmentationError::invalid_options("thumbnail size must be positive"));
    }

    let bbox = segment.bounding_box;
    let padding = segment.padding();
    let unpadded = imageops::crop_imm(&segment.cropped_image, padding, padding, bbox.width, bbox.height).to_image();

    let scale = (max_size as f64 / bbox.width as f64).min(max_size as f64 / bbox.height as f64);
    let thumb_width = ((bbox.width as f64 * scale).ceil() as u32).clamp(1, max_size);
    let thumb_height = ((bbox.height as f64 * scale).ceil() as u32).clamp(1, max_size);

    Ok(imageops::resize(&unpadded, thumb_width, thumb_height, imageops::FilterType::Triangle))
}
