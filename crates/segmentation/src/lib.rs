//! # Sticker Segmentation Library
//!
//! Splits a background-removed RGBA image into connected foreground segments,
//! each of which becomes a sticker candidate with its own cropped image,
//! preview encoding and statistics.
//!
//! ## Core Features
//!
//! - **Flood-fill segmentation**: breadth-first traversal over the alpha channel
//!   with 4- or 8-connectivity
//! - **Sticker extraction**: padded per-segment crops on a transparent canvas
//! - **Pluggable encoders**: previews go through the [`PreviewEncoder`] trait
//! - **Pipeline System**: blur filtering, fragment merging and sorting as
//!   composable post-processing steps
//! - **Export**: PNG stickers plus a JSON manifest with TypeScript bindings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use segmentation::Pipeline;
//!
//! let pipeline = Pipeline::builder()
//!     .min_area(100)
//!     .padding(8)
//!     .build();
//!
//! let image = image::open("cutout.png")?.to_rgba8();
//! let result = pipeline.process(&image)?;
//!
//! result.save_stickers("stickers")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use segmentation::{Pipeline, Connectivity, encoders::PngPreviewEncoder};
//!
//! let pipeline = Pipeline::builder()
//!     .alpha_threshold(16)
//!     .min_area(300)
//!     .connectivity(Connectivity::Four)
//!     .set_encoder(PngPreviewEncoder::fast())
//!     .with_merge_small_segments()
//!     .with_blur_filter(15.0)
//!     .sorted_by_area()
//!     .build();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod options;
pub mod traits;
pub mod algorithms;
pub mod encoders;
pub mod pipeline;
pub mod io;
pub mod manager;

// Re-exports for convenience
pub use error::{SegmentationError, Result};
pub use types::{BoundingBox, PixelCoord, Preview, Segment, SegmentId, SegmentationResult, SegmentationStats};
pub use options::{Connectivity, RawSegmentationOptions, SegmentationOptions};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use io::*;
pub use manager::{SegmentationManager, SegmentationCommand};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn create_test_image() -> RgbaImage {
        let mut img = RgbaImage::new(100, 100);
        // Opaque rectangle
        for y in 20..60 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgba([220, 40, 40, 255]));
            }
        }
        // Semi-transparent disc
        for y in 60..100 {
            for x in 60..100 {
                let dx = x as f32 - 80.0;
                let dy = y as f32 - 80.0;
                if dx * dx + dy * dy <= 15.0 * 15.0 {
                    img.put_pixel(x, y, Rgba([40, 40, 220, 180]));
                }
            }
        }
        // Specks below the default minimum area
        img.put_pixel(90, 5, Rgba([0, 0, 0, 255]));
        img.put_pixel(5, 90, Rgba([0, 0, 0, 255]));
        img
    }

    #[test]
    fn test_pipeline_basic() {
        let pipeline = Pipeline::builder().build();
        let image = create_test_image();

        let result = pipeline.process(&image).expect("Should process successfully");
        assert_eq!(result.segments.len(), 2, "Specks should be discarded");
        assert_eq!(result.image_width, 100);
        assert_eq!(result.image_height, 100);
        assert_eq!(result.segments[0].area, 1600);
        assert_eq!(result.segments[0].cropped_image.dimensions(), (56, 56));
    }

    #[test]
    fn test_pipeline_threshold_excludes_translucent_disc() {
        let pipeline = Pipeline::builder().alpha_threshold(180).build();
        let result = pipeline.process(&create_test_image()).expect("Should process successfully");
        assert_eq!(result.segments.len(), 1);
    }

    #[test]
    fn test_manager_compatibility() {
        let mut manager = SegmentationManager::new();
        manager.set_image(create_test_image());

        let result = manager.execute(SegmentationCommand::SegmentSortedByArea)
            .expect("Should segment successfully");

        assert_eq!(result.stats.count, 2);
        assert_eq!(result.stats.largest_id, Some(result.segments[0].id));
    }

    #[test]
    fn test_free_function_matches_pipeline() {
        let image = create_test_image();
        let options = SegmentationOptions::default();
        let direct = segment(&image, &options).expect("Should segment successfully");
        let piped = Pipeline::builder().with_options(options).build().process(&image).unwrap();

        assert_eq!(direct.len(), piped.segments.len());
        for (a, b) in direct.iter().zip(&piped.segments) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.pixels, b.pixels);
            assert_eq!(a.preview, b.preview);
        }
    }
}
