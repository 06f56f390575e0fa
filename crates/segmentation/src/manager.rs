use std::{path::Path, sync::Arc};

use image::RgbaImage;
use crate::{
    error::{Result, SegmentationError},
    io::{BytesSource, PathSource},
    options::{RawSegmentationOptions, SegmentationOptions},
    pipeline::{Pipeline, builder::PipelineBuilder},
    traits::ImageSource,
    types::SegmentationResult,
};
use serde::{Serialize, Deserialize};
use schemars::JsonSchema;
use strum::{Display, EnumString, EnumIter, IntoEnumIterator, IntoStaticStr, VariantNames};
use tracing::info;

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum SegmentationCommand {
    /// Split the loaded image into sticker segments
    #[serde(rename = "segment")]
    Segment,

    /// Segment and return the largest segments first
    #[serde(rename = "segment_sorted_by_area")]
    SegmentSortedByArea,

    /// Segment with one-off options instead of the manager's pipeline
    #[serde(rename = "segment_with_options")]
    SegmentWithOptions {
        options: RawSegmentationOptions,
    },

    /// Segment and drop blurry segments
    #[serde(rename = "segment_with_blur_filter")]
    SegmentWithBlurFilter {
        #[schemars(range(min = 0.0))]
        threshold: f64,
    },
}

impl SegmentationCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SegmentationCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Get a description of the command
    pub fn description(&self) -> &'static str {
        match self {
            Self::Segment => "Split the loaded image into connected sticker segments",
            Self::SegmentSortedByArea => "Split the loaded image into segments ordered largest first",
            Self::SegmentWithOptions { .. } => "Split the loaded image using custom alpha threshold, minimum area and padding",
            Self::SegmentWithBlurFilter { .. } => "Split the loaded image and drop segments whose sharpness score is below a threshold",
        }
    }

    /// Get parameter requirements for the command
    pub fn parameters_info(&self) -> Vec<(&'static str, &'static str, bool)> {
        match self {
            Self::Segment | Self::SegmentSortedByArea => vec![],
            Self::SegmentWithOptions { .. } => vec![
                ("options", "alphaThreshold (0-255), minArea (>= 0), padding (>= 0), connectivity, maxSegments", true)
            ],
            Self::SegmentWithBlurFilter { .. } => vec![
                ("threshold", "Minimum Laplacian sharpness score to keep a segment", true)
            ],
        }
    }

    /// Human-readable listing of every command with its parameters
    pub fn help_text() -> String {
        let mut text = String::new();
        for command in Self::iter() {
            text.push_str(&format!("{}: {}\n", command, command.description()));
            for (name, info, required) in command.parameters_info() {
                let marker = if required { "required" } else { "optional" };
                text.push_str(&format!("    {name} ({marker}): {info}\n"));
            }
        }
        text
    }
}

/// Holds the image being worked on and the pipeline to run over it
#[derive(Clone)]
pub struct SegmentationManager {
    image: Option<RgbaImage>,
    pipeline: Arc<Pipeline>,
}

impl SegmentationManager {
    pub fn new() -> Self {
        Self {
            image: None,
            pipeline: Arc::new(PipelineBuilder::new().build()),
        }
    }

    /// Create a new manager with a custom pipeline
    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            image: None,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Load an image from any source
    pub fn load_from_source(&mut self, source: &dyn ImageSource) -> Result<()> {
        let image = source.load()?;
        info!(source = %source.describe(), width = image.width(), height = image.height(), "image loaded");
        self.image = Some(image);
        Ok(())
    }

    /// Load an image from file
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.load_from_source(&PathSource::new(path.as_ref()))
    }

    /// Load an image from encoded bytes in memory
    pub fn load_image_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.load_from_source(&BytesSource::new(bytes.to_vec()))
    }

    /// Set the image directly
    pub fn set_image(&mut self, image: RgbaImage) {
        self.image = Some(image);
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn execute(&self, command: SegmentationCommand) -> Result<SegmentationResult> {
        let image = self.image.as_ref()
            .ok_or(SegmentationError::NoImageLoaded)?;

        match command {
            SegmentationCommand::Segment => {
                self.pipeline.process(image)
            }
            SegmentationCommand::SegmentSortedByArea => {
                let pipeline = PipelineBuilder::build_sorted(self.pipeline.options().clone());
                pipeline.process(image)
            }
            SegmentationCommand::SegmentWithOptions { options } => {
                let options = SegmentationOptions::try_from(options)?;
                let pipeline = PipelineBuilder::build_simple(options);
                pipeline.process(image)
            }
            SegmentationCommand::SegmentWithBlurFilter { threshold } => {
                if !threshold.is_finite() || threshold < 0.0 {
                    return Err(SegmentationError::invalid_options(format!(
                        "blur threshold must be a non-negative number, got {threshold}"
                    )));
                }
                let pipeline = PipelineBuilder::build_with_blur_filter(self.pipeline.options().clone(), threshold);
                pipeline.process(image)
            }
        }
    }
}

impl Default for SegmentationManager {
    fn default() -> Self {
        Self::new()
    }
}
