use std::collections::BTreeSet;

use image::RgbaImage;
use tracing::debug;

use crate::{
    algorithms::{
        analysis::sort_in_place_by_area_descending,
        extraction::build_segment,
        flood_fill::pixel_index,
    },
    error::Result,
    options::Connectivity,
    traits::PreviewEncoder,
    types::Segment,
};

const UNOWNED: usize = usize::MAX;

/// Fold small segments into a touching segment at least twice their size.
///
/// Segments are visited largest first. Each one absorbs every segment that
/// touches it (8-connectivity) and whose area is below half of its own, unless
/// that segment was already absorbed or emitted. Absorbing segments keep their
/// id and get their crop and preview rebuilt. The result is ordered by area
/// before merging, largest first.
///
/// Components found with 8-connectivity never touch, so this only changes
/// the output of 4-connectivity runs.
pub fn merge_small_segments(
    segments: Vec<Segment>,
    image: &RgbaImage,
    padding: u32,
    encoder: &dyn PreviewEncoder,
) -> Result<Vec<Segment>> {
    let (width, height) = image.dimensions();

    let mut ordered = segments;
    sort_in_place_by_area_descending(&mut ordered);

    let mut owner = vec![UNOWNED; width as usize * height as usize];
    for (position, segment) in ordered.iter().enumerate() {
        for pixel in &segment.pixels {
            owner[pixel_index(width, pixel.x, pixel.y)] = position;
        }
    }

    let neighbours: Vec<BTreeSet<usize>> = ordered
        .iter()
        .enumerate()
        .map(|(position, segment)| touching_segments(segment, position, &owner, width, height))
        .collect();

    let mut slots: Vec<Option<Segment>> = ordered.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(slots.len());

    for position in 0..slots.len() {
        let Some(base) = slots[position].take() else {
            continue;
        };

        let absorbed: Vec<Segment> = neighbours[position]
            .iter()
            .filter_map(|&other| {
                let is_small = slots[other].as_ref().is_some_and(|s| 2 * s.area < base.area);
                if is_small { slots[other].take() } else { None }
            })
            .collect();

        if absorbed.is_empty() {
            merged.push(base);
            continue;
        }

        debug!(
            id = %base.id,
            absorbed = absorbed.len(),
            "merging small neighbouring segments"
        );

        let mut bounding_box = base.bounding_box;
        let mut pixels = base.pixels;
        for small in absorbed {
            bounding_box = bounding_box.union(&small.bounding_box);
            pixels.extend(small.pixels);
        }

        merged.push(build_segment(image, base.id, pixels, bounding_box, padding, encoder)?);
    }

    Ok(merged)
}

fn touching_segments(
    segment: &Segment,
    position: usize,
    owner: &[usize],
    width: u32,
    height: u32,
) -> BTreeSet<usize> {
    let mut touching = BTreeSet::new();

    for pixel in &segment.pixels {
        for &(dx, dy) in Connectivity::Eight.offsets() {
            let nx = pixel.x as i64 + dx;
            let ny = pixel.y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }

            let other = owner[pixel_index(width, nx as u32, ny as u32)];
            if other != UNOWNED && other != position {
                touching.insert(other);
            }
        }
    }

    touching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algorithms::flood_fill::segment,
        encoders::PngPreviewEncoder,
        options::SegmentationOptions,
        types::{BoundingBox, SegmentId},
    };
    use image::Rgba;

    fn four_connected(min_area: usize) -> SegmentationOptions {
        SegmentationOptions {
            min_area,
            padding: 0,
            connectivity: Connectivity::Four,
            ..Default::default()
        }
    }

    #[test]
    fn test_diagonal_fragment_is_absorbed() {
        // 3x3 block with a single pixel touching its corner diagonally
        let mut image = RgbaImage::new(6, 6);
        for y in 0..3 {
            for x in 0..3 {
                image.put_pixel(x, y, Rgba([10, 10, 10, 255]));
            }
        }
        image.put_pixel(3, 3, Rgba([20, 20, 20, 255]));

        let segments = segment(&image, &four_connected(1)).unwrap();
        assert_eq!(segments.len(), 2);

        let merged = merge_small_segments(segments, &image, 0, &PngPreviewEncoder::default()).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, SegmentId(0));
        assert_eq!(merged[0].area, 10);
        assert_eq!(merged[0].bounding_box, BoundingBox { x: 0, y: 0, width: 4, height: 4 });
        assert_eq!(merged[0].cropped_image.get_pixel(3, 3), &Rgba([20, 20, 20, 255]));
    }

    #[test]
    fn test_similar_sizes_stay_separate() {
        // Two 2x2 blocks touching diagonally
        let mut image = RgbaImage::new(4, 4);
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1), (2, 2), (3, 2), (2, 3), (3, 3)] {
            image.put_pixel(x, y, Rgba([1, 1, 1, 255]));
        }

        let segments = segment(&image, &four_connected(1)).unwrap();
        let merged = merge_small_segments(segments, &image, 0, &PngPreviewEncoder::default()).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|s| s.area == 4));
    }

    #[test]
    fn test_distant_segments_untouched() {
        let mut image = RgbaImage::new(10, 1);
        for x in 0..4 {
            image.put_pixel(x, 0, Rgba([1, 1, 1, 255]));
        }
        image.put_pixel(9, 0, Rgba([1, 1, 1, 255]));

        let segments = segment(&image, &four_connected(1)).unwrap();
        let merged = merge_small_segments(segments, &image, 0, &PngPreviewEncoder::default()).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].area, 4);
        assert_eq!(merged[1].area, 1);
    }
}
