use tracing::debug;

use crate::{
    algorithms::{
        analysis::sort_in_place_by_area_descending,
        blur::{BlurScorer, DEFAULT_BLUR_THRESHOLD},
        merge::merge_small_segments,
    },
    error::Result,
    traits::{ProcessingContext, SegmentPostProcessor},
    types::Segment,
};

/// Drops segments smaller than `min_area`
#[derive(Debug, Clone)]
pub struct MinAreaFilter {
    pub min_area: usize,
}

impl SegmentPostProcessor for MinAreaFilter {
    fn name(&self) -> &str {
        "min_area_filter"
    }

    fn process(&self, segments: &mut Vec<Segment>, _context: &ProcessingContext<'_>) -> Result<()> {
        segments.retain(|segment| segment.area >= self.min_area);
        Ok(())
    }
}

/// Largest segments first, ties in discovery order
#[derive(Debug, Clone, Default)]
pub struct SortByAreaProcessor;

impl SegmentPostProcessor for SortByAreaProcessor {
    fn name(&self) -> &str {
        "sort_by_area"
    }

    fn process(&self, segments: &mut Vec<Segment>, _context: &ProcessingContext<'_>) -> Result<()> {
        sort_in_place_by_area_descending(segments);
        Ok(())
    }
}

/// Scores every segment for sharpness and drops the blurry ones
#[derive(Debug, Clone)]
pub struct BlurFilter {
    pub threshold: f64,
}

impl Default for BlurFilter {
    fn default() -> Self {
        Self { threshold: DEFAULT_BLUR_THRESHOLD }
    }
}

impl SegmentPostProcessor for BlurFilter {
    fn name(&self) -> &str {
        "blur_filter"
    }

    fn process(&self, segments: &mut Vec<Segment>, context: &ProcessingContext<'_>) -> Result<()> {
        if segments.is_empty() {
            return Ok(());
        }

        let scorer = BlurScorer::new(context.image);
        for segment in segments.iter_mut() {
            segment.blur_score = Some(scorer.score(&segment.bounding_box));
        }

        let before = segments.len();
        segments.retain(|segment| segment.blur_score.is_some_and(|score| score >= self.threshold));
        debug!(
            dropped = before - segments.len(),
            threshold = self.threshold,
            "blur filter applied"
        );
        Ok(())
    }
}

/// Folds small touching fragments into larger neighbours
#[derive(Debug, Clone, Default)]
pub struct MergeSmallSegmentsProcessor;

impl SegmentPostProcessor for MergeSmallSegmentsProcessor {
    fn name(&self) -> &str {
        "merge_small_segments"
    }

    fn process(&self, segments: &mut Vec<Segment>, context: &ProcessingContext<'_>) -> Result<()> {
        let taken = std::mem::take(segments);
        *segments = merge_small_segments(taken, context.image, context.options.padding, context.encoder)?;
        Ok(())
    }
}
