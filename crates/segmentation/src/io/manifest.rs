use std::{fs, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::{
    error::Result,
    types::{BoundingBox, SegmentId, SegmentationResult, SegmentationStats},
};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// One exported sticker
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
#[schemars(description = "A sticker cut out of the source image")]
pub struct StickerEntry {
    #[schemars(description = "Identifier of the segment within its run")]
    pub id: SegmentId,
    #[schemars(description = "PNG file name relative to the manifest")]
    pub file_name: String,
    #[schemars(description = "Tight bounding box in source image pixels")]
    pub bounding_box: BoundingBox,
    #[schemars(description = "Number of member pixels")]
    pub area: usize,
    #[schemars(description = "Mean member pixel position")]
    pub centroid: [f64; 2],
    #[schemars(description = "Padding around the bounding box in the sticker image")]
    pub padding: u32,
    #[schemars(description = "Laplacian sharpness score, when computed")]
    pub blur_score: Option<f64>,
}

/// Index of a directory of exported stickers
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StickerManifest {
    pub image_width: u32,
    pub image_height: u32,
    pub stats: SegmentationStats,
    pub stickers: Vec<StickerEntry>,
}

impl StickerManifest {
    /// Load a manifest from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

impl SegmentationResult {
    /// Describe the segments without writing anything
    pub fn to_manifest(&self) -> StickerManifest {
        let stickers = self.segments
            .iter()
            .map(|segment| StickerEntry {
                id: segment.id,
                file_name: format!("{}.png", segment.id),
                bounding_box: segment.bounding_box,
                area: segment.area,
                centroid: [segment.centroid.0, segment.centroid.1],
                padding: segment.padding(),
                blur_score: segment.blur_score,
            })
            .collect();

        StickerManifest {
            image_width: self.image_width,
            image_height: self.image_height,
            stats: self.stats.clone(),
            stickers,
        }
    }

    /// Export the manifest and serialize to a JSON string
    pub fn to_manifest_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_manifest())?)
    }

    /// Write every segment preview as `<id>.png` plus `manifest.json` into `dir`
    pub fn save_stickers<P: AsRef<Path>>(&self, dir: P) -> Result<StickerManifest> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let manifest = self.to_manifest();
        for (segment, entry) in self.segments.iter().zip(&manifest.stickers) {
            fs::write(dir.join(&entry.file_name), &segment.preview.bytes)?;
        }

        fs::write(dir.join(MANIFEST_FILE_NAME), serde_json::to_string_pretty(&manifest)?)?;
        info!(
            stickers = manifest.stickers.len(),
            dir = %dir.display(),
            "stickers saved"
        );

        Ok(manifest)
    }
}
