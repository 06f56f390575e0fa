use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use ts_rs::TS;

use crate::error::{Result, SegmentationError};

pub const DEFAULT_ALPHA_THRESHOLD: u8 = 50;
pub const DEFAULT_MIN_AREA: usize = 100;
pub const DEFAULT_PADDING: u32 = 8;

/// Pixel adjacency used when growing a component
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema, TS,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export)]
pub enum Connectivity {
    /// Edge neighbours only
    Four,
    /// Edge and diagonal neighbours
    #[default]
    Eight,
}

// Neighbour offsets as (dx, dy). The traversal visits them in this order.
const EIGHT_NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

const FOUR_NEIGHBOURS: [(i64, i64); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

impl Connectivity {
    pub fn offsets(self) -> &'static [(i64, i64)] {
        match self {
            Connectivity::Four => &FOUR_NEIGHBOURS,
            Connectivity::Eight => &EIGHT_NEIGHBOURS,
        }
    }
}

/// Validated options for a segmentation run
///
/// Deserializing goes through [`RawSegmentationOptions`], so out-of-range
/// values coming from JSON or TOML are rejected with the same message as
/// [`SegmentationOptions::try_from`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSegmentationOptions")]
pub struct SegmentationOptions {
    /// A pixel is foreground iff its alpha is strictly greater than this
    pub alpha_threshold: u8,
    /// Components smaller than this are dropped
    pub min_area: usize,
    /// Transparent border added around each cropped segment
    pub padding: u32,
    pub connectivity: Connectivity,
    /// Stop scanning once this many segments have been emitted
    pub max_segments: Option<usize>,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
            padding: DEFAULT_PADDING,
            connectivity: Connectivity::Eight,
            max_segments: None,
        }
    }
}

impl SegmentationOptions {
    /// Check the invariants the field types cannot express
    pub fn validate(&self) -> Result<()> {
        if self.max_segments == Some(0) {
            return Err(SegmentationError::invalid_options("maxSegments must be at least 1"));
        }
        Ok(())
    }
}

/// Unvalidated options as they arrive from config files, commands or flags.
/// Every field is optional and falls back to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RawSegmentationOptions {
    #[schemars(range(min = 0, max = 255))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_threshold: Option<i64>,
    #[schemars(range(min = 0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_area: Option<i64>,
    #[schemars(range(min = 0))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<Connectivity>,
    #[schemars(range(min = 1))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_segments: Option<i64>,
}

impl RawSegmentationOptions {
    /// Fill unset fields from `other`
    pub fn or(self, other: RawSegmentationOptions) -> RawSegmentationOptions {
        RawSegmentationOptions {
            alpha_threshold: self.alpha_threshold.or(other.alpha_threshold),
            min_area: self.min_area.or(other.min_area),
            padding: self.padding.or(other.padding),
            connectivity: self.connectivity.or(other.connectivity),
            max_segments: self.max_segments.or(other.max_segments),
        }
    }
}

impl TryFrom<RawSegmentationOptions> for SegmentationOptions {
    type Error = SegmentationError;

    fn try_from(raw: RawSegmentationOptions) -> Result<Self> {
        let defaults = SegmentationOptions::default();

        let alpha_threshold = match raw.alpha_threshold {
            Some(value) => u8::try_from(value).map_err(|_| {
                SegmentationError::invalid_options(format!(
                    "alphaThreshold must be within 0..=255, got {value}"
                ))
            })?,
            None => defaults.alpha_threshold,
        };

        let min_area = match raw.min_area {
            Some(value) => usize::try_from(value).map_err(|_| {
                SegmentationError::invalid_options(format!("minArea must be non-negative, got {value}"))
            })?,
            None => defaults.min_area,
        };

        let padding = match raw.padding {
            Some(value) if value < 0 => {
                return Err(SegmentationError::invalid_options(format!(
                    "padding must be non-negative, got {value}"
                )));
            }
            Some(value) => u32::try_from(value).map_err(|_| {
                SegmentationError::invalid_options(format!("padding {value} is too large"))
            })?,
            None => defaults.padding,
        };

        let max_segments = match raw.max_segments {
            Some(value) if value < 1 => {
                return Err(SegmentationError::invalid_options(format!(
                    "maxSegments must be at least 1, got {value}"
                )));
            }
            Some(value) => Some(usize::try_from(value).map_err(|_| {
                SegmentationError::invalid_options(format!("maxSegments {value} is too large"))
            })?),
            None => None,
        };

        Ok(SegmentationOptions {
            alpha_threshold,
            min_area,
            padding,
            connectivity: raw.connectivity.unwrap_or(defaults.connectivity),
            max_segments,
        })
    }
}

impl From<&SegmentationOptions> for RawSegmentationOptions {
    fn from(options: &SegmentationOptions) -> Self {
        Self {
            alpha_threshold: Some(options.alpha_threshold as i64),
            min_area: Some(options.min_area as i64),
            padding: Some(options.padding as i64),
            connectivity: Some(options.connectivity),
            max_segments: options.max_segments.map(|max| max as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SegmentationOptions::default();
        assert_eq!(options.alpha_threshold, 50);
        assert_eq!(options.min_area, 100);
        assert_eq!(options.padding, 8);
        assert_eq!(options.connectivity, Connectivity::Eight);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_raw_options_use_defaults() {
        let options = SegmentationOptions::try_from(RawSegmentationOptions::default()).unwrap();
        assert_eq!(options, SegmentationOptions::default());
    }

    #[test]
    fn test_out_of_range_alpha_threshold_rejected() {
        for value in [-1, 256] {
            let raw = RawSegmentationOptions { alpha_threshold: Some(value), ..Default::default() };
            let err = SegmentationOptions::try_from(raw).unwrap_err();
            assert!(matches!(err, SegmentationError::InvalidOptions(_)));
        }
    }

    #[test]
    fn test_negative_min_area_and_padding_rejected() {
        let raw = RawSegmentationOptions { min_area: Some(-1), ..Default::default() };
        assert!(matches!(SegmentationOptions::try_from(raw), Err(SegmentationError::InvalidOptions(_))));

        let raw = RawSegmentationOptions { padding: Some(-4), ..Default::default() };
        assert!(matches!(SegmentationOptions::try_from(raw), Err(SegmentationError::InvalidOptions(_))));
    }

    #[test]
    fn test_zero_max_segments_rejected() {
        let raw = RawSegmentationOptions { max_segments: Some(0), ..Default::default() };
        assert!(SegmentationOptions::try_from(raw).is_err());

        let options = SegmentationOptions { max_segments: Some(0), ..Default::default() };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let options: SegmentationOptions =
            serde_json::from_str(r#"{"alphaThreshold": 0, "minArea": 1, "connectivity": "four"}"#).unwrap();
        assert_eq!(options.alpha_threshold, 0);
        assert_eq!(options.min_area, 1);
        assert_eq!(options.padding, 8);
        assert_eq!(options.connectivity, Connectivity::Four);

        let err = serde_json::from_str::<SegmentationOptions>(r#"{"alphaThreshold": 300}"#).unwrap_err();
        assert!(err.to_string().contains("alphaThreshold"));
    }

    #[test]
    fn test_serialize_roundtrip_through_raw() {
        let options = SegmentationOptions { max_segments: Some(3), ..Default::default() };
        let json = serde_json::to_string(&options).unwrap();
        let parsed: SegmentationOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_raw_or_prefers_self() {
        let flags = RawSegmentationOptions { min_area: Some(5), ..Default::default() };
        let file = RawSegmentationOptions { min_area: Some(50), padding: Some(0), ..Default::default() };
        let merged = flags.or(file);
        assert_eq!(merged.min_area, Some(5));
        assert_eq!(merged.padding, Some(0));
    }

    #[test]
    fn test_connectivity_offsets() {
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert!(Connectivity::Four.offsets().iter().all(|(dx, dy)| dx.abs() + dy.abs() == 1));
        assert_eq!("four".parse::<Connectivity>().unwrap(), Connectivity::Four);
    }
}
