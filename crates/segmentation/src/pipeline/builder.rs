use crate::{
    pipeline::Pipeline,
    options::{Connectivity, SegmentationOptions},
    traits::{PreviewEncoder, SegmentPostProcessor},
    algorithms::{
        BlurFilter,
        MergeSmallSegmentsProcessor,
        SortByAreaProcessor,
    },
    encoders::PngPreviewEncoder,
};

/// Builder for creating segmentation pipelines with a fluent API
pub struct PipelineBuilder {
    options: SegmentationOptions,
    encoder: Option<Box<dyn PreviewEncoder>>,
    postprocessors: Vec<Box<dyn SegmentPostProcessor>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            options: SegmentationOptions::default(),
            encoder: None,
            postprocessors: Vec::new(),
        }
    }

    /// Replace all segmentation options at once
    pub fn with_options(mut self, options: SegmentationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.options.alpha_threshold = alpha_threshold;
        self
    }

    pub fn min_area(mut self, min_area: usize) -> Self {
        self.options.min_area = min_area;
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.options.padding = padding;
        self
    }

    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.options.connectivity = connectivity;
        self
    }

    pub fn max_segments(mut self, max_segments: usize) -> Self {
        self.options.max_segments = Some(max_segments);
        self
    }

    /// Set the preview encoder (replaces any existing one)
    pub fn set_encoder<E>(mut self, encoder: E) -> Self
    where
        E: PreviewEncoder + 'static,
    {
        self.encoder = Some(Box::new(encoder));
        self
    }

    /// Add a post-processor to the pipeline
    pub fn add_postprocessor<P>(mut self, postprocessor: P) -> Self
    where
        P: SegmentPostProcessor + 'static,
    {
        self.postprocessors.push(Box::new(postprocessor));
        self
    }

    /// Drop segments whose blur score is below `threshold`
    pub fn with_blur_filter(self, threshold: f64) -> Self {
        self.add_postprocessor(BlurFilter { threshold })
    }

    /// Fold small touching fragments into larger neighbours
    pub fn with_merge_small_segments(self) -> Self {
        self.add_postprocessor(MergeSmallSegmentsProcessor)
    }

    /// Order the output largest first
    pub fn sorted_by_area(self) -> Self {
        self.add_postprocessor(SortByAreaProcessor)
    }

    /// Build the pipeline, encoding previews as PNG unless told otherwise
    pub fn build(self) -> Pipeline {
        let encoder = self.encoder
            .unwrap_or_else(|| Box::new(PngPreviewEncoder::default()));

        Pipeline::new(self.options, encoder, self.postprocessors)
    }

    /// Build a pipeline that only runs the flood fill
    pub fn build_simple(options: SegmentationOptions) -> Pipeline {
        Self::new()
            .with_options(options)
            .build()
    }

    /// Build a pipeline returning segments largest first
    pub fn build_sorted(options: SegmentationOptions) -> Pipeline {
        Self::new()
            .with_options(options)
            .sorted_by_area()
            .build()
    }

    /// Build a pipeline that drops blurry segments and sorts the rest
    pub fn build_with_blur_filter(options: SegmentationOptions, threshold: f64) -> Pipeline {
        Self::new()
            .with_options(options)
            .with_blur_filter(threshold)
            .sorted_by_area()
            .build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::MinAreaFilter;

    #[test]
    fn test_builder_sets_options() {
        let pipeline = PipelineBuilder::new()
            .alpha_threshold(10)
            .min_area(3)
            .padding(0)
            .connectivity(Connectivity::Four)
            .max_segments(4)
            .build();

        let options = pipeline.options();
        assert_eq!(options.alpha_threshold, 10);
        assert_eq!(options.min_area, 3);
        assert_eq!(options.padding, 0);
        assert_eq!(options.connectivity, Connectivity::Four);
        assert_eq!(options.max_segments, Some(4));
    }

    #[test]
    fn test_info_lists_postprocessors() {
        let pipeline = PipelineBuilder::new()
            .add_postprocessor(MinAreaFilter { min_area: 10 })
            .with_merge_small_segments()
            .sorted_by_area()
            .build();

        let info = pipeline.info();
        assert!(info.contains("image/png"));
        assert!(info.contains("min_area_filter, merge_small_segments, sort_by_area"));
    }
}
