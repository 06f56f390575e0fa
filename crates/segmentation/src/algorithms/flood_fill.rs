use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;
use tracing::{debug, info, trace};

use crate::{
    algorithms::extraction::build_segment,
    encoders::PngPreviewEncoder,
    error::{Result, SegmentationError},
    options::{Connectivity, SegmentationOptions},
    traits::PreviewEncoder,
    types::{BoundingBox, PixelCoord, Segment, SegmentId},
};

/// A component found by the traversal, before any crop is materialised
#[derive(Debug, Clone)]
pub(crate) struct Component {
    pub pixels: Vec<PixelCoord>,
    pub bounding_box: BoundingBox,
}

/// Split `image` into connected foreground segments, encoding previews as PNG.
///
/// Segments come back in the raster order of their first pixel. Components
/// smaller than `options.min_area` are dropped without being cropped.
pub fn segment(image: &RgbaImage, options: &SegmentationOptions) -> Result<Vec<Segment>> {
    segment_with_encoder(image, options, &PngPreviewEncoder::default())
}

/// Same as [`segment`] with a caller-supplied preview encoder
pub fn segment_with_encoder(
    image: &RgbaImage,
    options: &SegmentationOptions,
    encoder: &dyn PreviewEncoder,
) -> Result<Vec<Segment>> {
    run(image, options, encoder, None)
}

/// Same as [`segment_with_encoder`], checking `cancel` before every row.
///
/// Returns [`SegmentationError::Cancelled`] as soon as the flag is seen set.
pub fn segment_with_cancel(
    image: &RgbaImage,
    options: &SegmentationOptions,
    encoder: &dyn PreviewEncoder,
    cancel: &AtomicBool,
) -> Result<Vec<Segment>> {
    run(image, options, encoder, Some(cancel))
}

fn run(
    image: &RgbaImage,
    options: &SegmentationOptions,
    encoder: &dyn PreviewEncoder,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Segment>> {
    options.validate()?;

    let (width, height) = image.dimensions();
    let _span = tracing::debug_span!("segment", width, height).entered();

    let mut visited = vec![false; width as usize * height as usize];
    let mut queue = VecDeque::new();
    let mut segments = Vec::new();
    let mut discovered = 0usize;
    let mut discarded = 0usize;

    'scan: for y in 0..height {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!(row = y, "segmentation cancelled");
            return Err(SegmentationError::Cancelled);
        }

        for x in 0..width {
            let index = pixel_index(width, x, y);
            if visited[index] || !is_foreground(image, index, options.alpha_threshold) {
                continue;
            }

            let component = discover_component(
                image,
                &mut visited,
                &mut queue,
                PixelCoord::new(x, y),
                options.alpha_threshold,
                options.connectivity,
            );
            let id = SegmentId(discovered);
            discovered += 1;

            if component.pixels.len() < options.min_area {
                trace!(%id, area = component.pixels.len(), "discarding component below minimum area");
                discarded += 1;
                continue;
            }

            let segment = build_segment(
                image,
                id,
                component.pixels,
                component.bounding_box,
                options.padding,
                encoder,
            )?;
            debug!(%id, area = segment.area, bbox = ?segment.bounding_box, "segment found");
            segments.push(segment);

            if options.max_segments.is_some_and(|max| segments.len() >= max) {
                debug!(max = segments.len(), "segment limit reached, stopping scan");
                break 'scan;
            }
        }
    }

    info!(
        segments = segments.len(),
        discarded,
        "segmented {}x{} image",
        width,
        height
    );
    Ok(segments)
}

/// Breadth-first flood fill from `seed`.
///
/// Pixels are marked visited when enqueued, so none is ever added twice.
/// `seed` must be an unvisited foreground pixel.
pub(crate) fn discover_component(
    image: &RgbaImage,
    visited: &mut [bool],
    queue: &mut VecDeque<PixelCoord>,
    seed: PixelCoord,
    alpha_threshold: u8,
    connectivity: Connectivity,
) -> Component {
    let (width, height) = image.dimensions();
    let offsets = connectivity.offsets();

    queue.clear();
    visited[pixel_index(width, seed.x, seed.y)] = true;
    queue.push_back(seed);

    let mut pixels = Vec::new();
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (seed.x, seed.y, seed.x, seed.y);

    while let Some(current) = queue.pop_front() {
        pixels.push(current);

        min_x = min_x.min(current.x);
        max_x = max_x.max(current.x);
        min_y = min_y.min(current.y);
        max_y = max_y.max(current.y);

        for &(dx, dy) in offsets {
            let nx = current.x as i64 + dx;
            let ny = current.y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }

            let (nx, ny) = (nx as u32, ny as u32);
            let neighbour = pixel_index(width, nx, ny);
            if visited[neighbour] || !is_foreground(image, neighbour, alpha_threshold) {
                continue;
            }

            visited[neighbour] = true;
            queue.push_back(PixelCoord::new(nx, ny));
        }
    }

    Component {
        pixels,
        bounding_box: BoundingBox::from_extents(min_x, min_y, max_x, max_y),
    }
}

#[inline]
pub(crate) fn pixel_index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Strictly greater: alpha equal to the threshold is background
#[inline]
fn is_foreground(image: &RgbaImage, index: usize, alpha_threshold: u8) -> bool {
    image.as_raw()[index * 4 + 3] > alpha_threshold
}
