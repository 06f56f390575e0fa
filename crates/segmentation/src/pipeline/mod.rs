pub mod builder;

use std::sync::atomic::AtomicBool;

use image::RgbaImage;
use crate::{
    algorithms::{segment_with_cancel, segment_with_encoder},
    error::Result,
    options::SegmentationOptions,
    traits::{PreviewEncoder, ProcessingContext, SegmentPostProcessor},
    types::{Segment, SegmentationResult},
};

/// A segmentation run with its options, preview encoder and post-processing steps
pub struct Pipeline {
    options: SegmentationOptions,
    encoder: Box<dyn PreviewEncoder>,
    postprocessors: Vec<Box<dyn SegmentPostProcessor>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        options: SegmentationOptions,
        encoder: Box<dyn PreviewEncoder>,
        postprocessors: Vec<Box<dyn SegmentPostProcessor>>,
    ) -> Self {
        Self {
            options,
            encoder,
            postprocessors,
        }
    }

    pub fn options(&self) -> &SegmentationOptions {
        &self.options
    }

    /// Process an image through the entire pipeline
    pub fn process(&self, image: &RgbaImage) -> Result<SegmentationResult> {
        // Step 1: Find connected segments
        let segments = segment_with_encoder(image, &self.options, self.encoder.as_ref())?;

        // Step 2: Apply all post-processors in sequence
        self.finish(image, segments)
    }

    /// Like [`Pipeline::process`], giving up with `Cancelled` once `cancel` is set
    pub fn process_with_cancel(&self, image: &RgbaImage, cancel: &AtomicBool) -> Result<SegmentationResult> {
        let segments = segment_with_cancel(image, &self.options, self.encoder.as_ref(), cancel)?;
        self.finish(image, segments)
    }

    fn finish(&self, image: &RgbaImage, mut segments: Vec<Segment>) -> Result<SegmentationResult> {
        let context = ProcessingContext {
            image,
            options: &self.options,
            encoder: self.encoder.as_ref(),
        };

        for postprocessor in &self.postprocessors {
            postprocessor.process(&mut segments, &context)?;
        }

        Ok(SegmentationResult::new(segments, image.width(), image.height()))
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let steps: Vec<&str> = self.postprocessors.iter().map(|p| p.name()).collect();
        format!(
            "Pipeline: alpha > {}, min area {}, padding {}, {} connectivity, {} previews, postprocessors [{}]",
            self.options.alpha_threshold,
            self.options.min_area,
            self.options.padding,
            self.options.connectivity,
            self.encoder.mime_type(),
            steps.join(", ")
        )
    }
}
