use schemars::JsonSchema;
use segmentation::{
    thumbnail, Pipeline, PipelineBuilder, RawSegmentationOptions, SegmentationError,
    SegmentationOptions, SegmentationStats, DEFAULT_THUMBNAIL_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use thiserror::Error;
use tracing::{debug, info};


#[derive(Error, Debug)]
pub enum StickerCliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    ImageError(#[from] image::ImageError),
    #[error(transparent)]
    Segmentation(#[from] SegmentationError),
    #[error("No input images given")]
    MissingInputs,
    #[error("Missing 'output_dir' field")]
    MissingOutputDir,
    #[error("Input path has no file name: {0}")]
    InvalidInputPath(String),
    #[error("Inputs {0} and {1} would both be written to '{2}'")]
    DuplicateOutputName(String, String, String),
    #[error("Output directory {0} is not empty; pass --overwrite to replace it")]
    OutputExists(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}


/// A batch of background-removed images to cut into stickers
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct SegmentConfig {
    /// Images to segment
    pub inputs: Vec<String>,
    /// Each input gets its own sub-directory here, named after the file stem
    pub output_dir: String,
    #[serde(default)]
    pub options: RawSegmentationOptions,
    /// Drop segments with a Laplacian sharpness score below this
    #[serde(default)]
    pub blur_threshold: Option<f64>,
    /// Fold small touching fragments into larger neighbours
    #[serde(default)]
    pub merge_small_segments: bool,
    /// Emit the largest segments first
    #[serde(default)]
    pub sort_by_area: bool,
    /// Also write thumbnails
    #[serde(default)]
    pub thumbnails: bool,
    /// Thumbnail square edge; implies `thumbnails`
    #[serde(default)]
    pub thumbnail_size: Option<u32>,
    /// Replace existing per-image output directories
    #[serde(default)]
    pub overwrite: bool,
}

/// Where and how per-image results are written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub root: PathBuf,
    pub thumbnail_size: Option<u32>,
    pub overwrite: bool,
}

/// What was produced for one input image
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub stats: SegmentationStats,
}

impl SegmentConfig {
    /// Load SegmentConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, StickerCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load SegmentConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, StickerCliError> {
        let config: SegmentConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load SegmentConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StickerCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load SegmentConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, StickerCliError> {
        let config: SegmentConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StickerCliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(StickerCliError::UnsupportedFileFormat),
        }
    }

    /// Save SegmentConfig to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StickerCliError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert SegmentConfig to TOML string
    pub fn to_toml(&self) -> Result<String, StickerCliError> {
        let toml = toml::to_string_pretty(&self)?;
        Ok(toml)
    }

    /// Save SegmentConfig to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StickerCliError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert SegmentConfig to JSON string
    pub fn to_json(&self) -> Result<String, StickerCliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Check required fields and option ranges before any image is touched
    pub fn validate(&self) -> Result<SegmentationOptions, StickerCliError> {
        if self.inputs.is_empty() {
            return Err(StickerCliError::MissingInputs);
        }
        if self.output_dir.trim().is_empty() {
            return Err(StickerCliError::MissingOutputDir);
        }
        if let Some(threshold) = self.blur_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(SegmentationError::invalid_options(format!(
                    "blur threshold must be a non-negative number, got {threshold}"
                ))
                .into());
            }
        }
        if self.thumbnail_size == Some(0) {
            return Err(SegmentationError::invalid_options("thumbnail size must be positive").into());
        }

        let mut claimed: HashMap<&str, &str> = HashMap::new();
        for input in &self.inputs {
            let name = output_name(Path::new(input))?;
            if let Some(previous) = claimed.insert(name, input) {
                return Err(StickerCliError::DuplicateOutputName(
                    previous.to_string(),
                    input.clone(),
                    name.to_string(),
                ));
            }
        }

        Ok(SegmentationOptions::try_from(self.options.clone())?)
    }

    /// Build the pipeline described by this config
    pub fn pipeline(&self) -> Result<Pipeline, StickerCliError> {
        let options = self.validate()?;

        let mut builder = PipelineBuilder::new().with_options(options);
        if self.merge_small_segments {
            if let Some(threshold) = self.blur_threshold {
                // Blurry fragments are dropped before they can be absorbed
                builder = builder.with_blur_filter(threshold);
            }
            builder = builder.with_merge_small_segments();
        }
        if let Some(threshold) = self.blur_threshold {
            builder = builder.with_blur_filter(threshold);
        }
        if self.sort_by_area {
            builder = builder.sorted_by_area();
        }

        Ok(builder.build())
    }

    pub fn output_settings(&self) -> OutputSettings {
        OutputSettings {
            root: PathBuf::from(&self.output_dir),
            thumbnail_size: self
                .thumbnail_size
                .or(self.thumbnails.then_some(DEFAULT_THUMBNAIL_SIZE)),
            overwrite: self.overwrite,
        }
    }
}

/// Sub-directory name for one input: its file stem
fn output_name(input: &Path) -> Result<&str, StickerCliError> {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| StickerCliError::InvalidInputPath(input.display().to_string()))
}

/// Empty `dir`, or refuse when it holds files and overwriting is off
fn prepare_output_dir(dir: &Path, overwrite: bool) -> Result<(), StickerCliError> {
    if dir.exists() && fs::read_dir(dir)?.next().is_some() {
        if !overwrite {
            return Err(StickerCliError::OutputExists(dir.display().to_string()));
        }
        debug!(dir = %dir.display(), "clearing previous output");
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Segment one image and write its stickers under `<root>/<file stem>/`
pub fn process_image(
    input: &Path,
    settings: &OutputSettings,
    pipeline: &Pipeline,
    cancel: &AtomicBool,
) -> Result<ImageReport, StickerCliError> {
    let output_dir = settings.root.join(output_name(input)?);

    let image = image::open(input)?.to_rgba8();
    debug!(input = %input.display(), width = image.width(), height = image.height(), "decoded input");

    let result = pipeline.process_with_cancel(&image, cancel)?;
    prepare_output_dir(&output_dir, settings.overwrite)?;
    result.save_stickers(&output_dir)?;

    if let Some(size) = settings.thumbnail_size {
        let thumbnails_dir = output_dir.join("thumbnails");
        fs::create_dir_all(&thumbnails_dir)?;
        for segment in &result.segments {
            let thumb = thumbnail(segment, size)?;
            thumb.save(thumbnails_dir.join(format!("{}.png", segment.id)))?;
        }
    }

    info!(
        input = %input.display(),
        stickers = result.stats.count,
        "image processed"
    );

    Ok(ImageReport {
        input: input.to_path_buf(),
        output_dir,
        stats: result.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use segmentation::{Connectivity, StickerManifest, MANIFEST_FILE_NAME};

    fn sample_config() -> SegmentConfig {
        SegmentConfig {
            inputs: vec!["cutout.png".to_string()],
            output_dir: "stickers".to_string(),
            options: RawSegmentationOptions {
                alpha_threshold: Some(16),
                min_area: Some(300),
                connectivity: Some(Connectivity::Four),
                ..Default::default()
            },
            blur_threshold: Some(15.0),
            merge_small_segments: true,
            sort_by_area: true,
            ..Default::default()
        }
    }

    fn write_square(path: &Path, size: u32) {
        let mut image = RgbaImage::new(30, 30);
        for y in 3..3 + size {
            for x in 3..3 + size {
                image.put_pixel(x, y, Rgba([200, 30, 30, 255]));
            }
        }
        image.save(path).unwrap();
    }

    fn settings_in(dir: &Path) -> OutputSettings {
        OutputSettings {
            root: dir.join("out"),
            thumbnail_size: None,
            overwrite: false,
        }
    }

    fn small_area_pipeline() -> Pipeline {
        PipelineBuilder::new().min_area(1).build()
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = sample_config();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("alphaThreshold = 16"));
        assert_eq!(SegmentConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_config_files_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample_config();

        let toml_path = dir.path().join("stickers.toml");
        config.to_toml_file(&toml_path).unwrap();
        assert_eq!(SegmentConfig::from_file(&toml_path).unwrap(), config);

        let json_path = dir.path().join("stickers.json");
        config.to_json_file(&json_path).unwrap();
        assert_eq!(SegmentConfig::from_file(&json_path).unwrap(), config);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = SegmentConfig::from_json(r#"{"inputs": ["a.png"], "output_dir": "out"}"#).unwrap();
        let options = config.validate().unwrap();
        assert_eq!(options, SegmentationOptions::default());
        assert!(!config.sort_by_area);
        assert_eq!(config.output_settings().thumbnail_size, None);
    }

    #[test]
    fn test_thumbnail_size_resolution() {
        let mut config = sample_config();
        config.thumbnails = true;
        assert_eq!(config.output_settings().thumbnail_size, Some(DEFAULT_THUMBNAIL_SIZE));

        config.thumbnail_size = Some(48);
        assert_eq!(config.output_settings().thumbnail_size, Some(48));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = SegmentConfig::from_file("config.yaml");
        assert!(matches!(result, Err(StickerCliError::UnsupportedFileFormat)));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut config = sample_config();
        config.inputs.clear();
        assert!(matches!(config.validate(), Err(StickerCliError::MissingInputs)));

        let mut config = sample_config();
        config.options.padding = Some(-1);
        assert!(matches!(
            config.validate(),
            Err(StickerCliError::Segmentation(SegmentationError::InvalidOptions(_)))
        ));

        let mut config = sample_config();
        config.blur_threshold = Some(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inputs_sharing_a_stem() {
        let mut config = sample_config();
        config.inputs = vec!["a/foo.png".to_string(), "b/bar.png".to_string(), "b/foo.webp".to_string()];

        match config.validate() {
            Err(StickerCliError::DuplicateOutputName(first, second, name)) => {
                assert_eq!(first, "a/foo.png");
                assert_eq!(second, "b/foo.webp");
                assert_eq!(name, "foo");
            }
            other => panic!("expected duplicate output name, got {other:?}"),
        }
    }

    #[test]
    fn test_pipeline_filters_blur_before_and_after_merging() {
        let info = sample_config().pipeline().unwrap().info();
        assert!(info.contains("[blur_filter, merge_small_segments, blur_filter, sort_by_area]"));
        assert!(info.contains("four connectivity"));

        let mut config = sample_config();
        config.merge_small_segments = false;
        let info = config.pipeline().unwrap().info();
        assert!(info.contains("[blur_filter, sort_by_area]"));
    }

    #[test]
    fn test_process_image_writes_stickers_and_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("apple.png");
        write_square(&input, 10);

        let config = SegmentConfig {
            inputs: vec![input.display().to_string()],
            output_dir: dir.path().join("out").display().to_string(),
            options: RawSegmentationOptions { min_area: Some(1), ..Default::default() },
            thumbnail_size: Some(20),
            ..Default::default()
        };
        let pipeline = config.pipeline().unwrap();

        let report = process_image(&input, &config.output_settings(), &pipeline, &AtomicBool::new(false)).unwrap();

        assert_eq!(report.stats.count, 1);
        assert_eq!(report.output_dir, dir.path().join("out").join("apple"));

        let manifest = StickerManifest::from_file(report.output_dir.join(MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(manifest.stickers[0].area, 100);
        assert!(report.output_dir.join("segment_0.png").exists());

        let thumb = image::open(report.output_dir.join("thumbnails").join("segment_0.png")).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (20, 20));
    }

    #[test]
    fn test_existing_output_is_refused_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("apple.png");
        write_square(&input, 10);
        let stale = dir.path().join("out").join("apple").join("segment_7.png");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();

        let settings = settings_in(dir.path());
        let result = process_image(&input, &settings, &small_area_pipeline(), &AtomicBool::new(false));
        assert!(matches!(result, Err(StickerCliError::OutputExists(_))));
        assert!(stale.exists());
    }

    #[test]
    fn test_overwrite_clears_stale_stickers() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("apple.png");
        write_square(&input, 10);
        let stale = dir.path().join("out").join("apple").join("segment_7.png");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();

        let settings = OutputSettings { overwrite: true, ..settings_in(dir.path()) };
        let report = process_image(&input, &settings, &small_area_pipeline(), &AtomicBool::new(false)).unwrap();

        assert!(!stale.exists());
        assert!(report.output_dir.join("segment_0.png").exists());
        let manifest = StickerManifest::from_file(report.output_dir.join(MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(manifest.stickers.len(), 1);
    }
}
