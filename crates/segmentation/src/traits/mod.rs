use image::RgbaImage;
use crate::{
    error::Result,
    options::SegmentationOptions,
    types::{Preview, Segment},
};

/// Trait for turning a cropped segment into a display-ready encoding.
///
/// Implementations must preserve the alpha channel exactly.
pub trait PreviewEncoder: Send + Sync {
    /// MIME type of the produced bytes
    fn mime_type(&self) -> &str;

    /// Encode an RGBA buffer
    fn encode(&self, image: &RgbaImage) -> Result<Preview>;
}

/// Trait for anything that can supply a decoded RGBA image
pub trait ImageSource: Send + Sync {
    /// Load and decode the image
    fn load(&self) -> Result<RgbaImage>;

    /// Human readable origin, used in logs
    fn describe(&self) -> String;
}

/// Everything a post-processor may need besides the segments themselves
pub struct ProcessingContext<'a> {
    pub image: &'a RgbaImage,
    pub options: &'a SegmentationOptions,
    pub encoder: &'a dyn PreviewEncoder,
}

/// Trait for steps that run on the segment list after discovery
pub trait SegmentPostProcessor: Send + Sync {
    /// Short name shown in pipeline summaries
    fn name(&self) -> &str;

    /// Filter, reorder or rewrite the segments in place
    fn process(&self, segments: &mut Vec<Segment>, context: &ProcessingContext<'_>) -> Result<()>;
}
