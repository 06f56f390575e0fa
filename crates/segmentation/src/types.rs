use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::algorithms::compute_stats;

/// A pixel position in source image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelCoord {
    pub x: u32,
    pub y: u32,
}

impl PixelCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in source image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Build a box from inclusive min/max extents
    pub fn from_extents(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Inclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width - 1
    }

    /// Inclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height - 1
    }

    pub fn contains(&self, coord: PixelCoord) -> bool {
        coord.x >= self.x && coord.x <= self.right() && coord.y >= self.y && coord.y <= self.bottom()
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Smallest box covering both `self` and `other`
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::from_extents(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// Identifier of a segment, unique within one segmentation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, JsonSchema)]
#[serde(transparent)]
#[ts(export)]
pub struct SegmentId(pub usize);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment_{}", self.0)
    }
}

/// Encoded, display-ready form of a segment's cropped image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Preview {
    pub fn new<S: Into<String>>(mime_type: S, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Render as a `data:` URL suitable for an `<img src>` attribute
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A connected foreground component, materialised as a sticker candidate
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    /// Member pixels in traversal order
    pub pixels: Vec<PixelCoord>,
    pub bounding_box: BoundingBox,
    /// Always equal to `pixels.len()`
    pub area: usize,
    /// Mean position of the member pixels
    pub centroid: (f64, f64),
    /// Member pixels copied onto a transparent canvas of the padded bounding box
    pub cropped_image: RgbaImage,
    pub preview: Preview,
    /// Laplacian sharpness score, set by the blur filter
    pub blur_score: Option<f64>,
}

impl Segment {
    /// Padding that was applied around the bounding box in `cropped_image`
    pub fn padding(&self) -> u32 {
        (self.cropped_image.width() - self.bounding_box.width) / 2
    }
}

/// Summary figures over a list of segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SegmentationStats {
    pub count: usize,
    pub total_area: usize,
    /// Mean area rounded to the nearest integer, 0 for no segments
    pub average_area: usize,
    pub max_area: usize,
    pub min_area: usize,
    pub largest_id: Option<SegmentId>,
    pub smallest_id: Option<SegmentId>,
}

/// Output of a full pipeline run over one image
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    pub segments: Vec<Segment>,
    /// Original image dimensions
    pub image_width: u32,
    pub image_height: u32,
    pub stats: SegmentationStats,
}

impl SegmentationResult {
    pub fn new(segments: Vec<Segment>, image_width: u32, image_height: u32) -> Self {
        let stats = compute_stats(&segments);
        Self {
            segments,
            image_width,
            image_height,
            stats,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.id == id)
    }
}
