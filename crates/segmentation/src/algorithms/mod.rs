pub mod flood_fill;
pub mod extraction;
pub mod analysis;
pub mod blur;
pub mod merge;
pub mod postprocessing;

pub use flood_fill::{segment, segment_with_cancel, segment_with_encoder};
pub use extraction::{centroid, extract_segment_image, thumbnail, DEFAULT_THUMBNAIL_SIZE};
pub use analysis::{compute_stats, filter_by_min_area, sort_by_area_descending};
pub use blur::{blur_score, luminance, BlurScorer, DEFAULT_BLUR_THRESHOLD};
pub use merge::merge_small_segments;
pub use postprocessing::*;
