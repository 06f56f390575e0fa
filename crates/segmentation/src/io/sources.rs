use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::{error::Result, traits::ImageSource};

/// Image file on disk, format guessed from the contents
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
}

impl PathSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl ImageSource for PathSource {
    fn load(&self) -> Result<RgbaImage> {
        let image = image::ImageReader::open(&self.path)?
            .with_guessed_format()?
            .decode()?;
        Ok(image.to_rgba8())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Encoded image held in memory, e.g. an upload body
#[derive(Debug, Clone)]
pub struct BytesSource {
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ImageSource for BytesSource {
    fn load(&self) -> Result<RgbaImage> {
        Ok(image::load_from_memory(&self.bytes)?.to_rgba8())
    }

    fn describe(&self) -> String {
        format!("{} bytes in memory", self.bytes.len())
    }
}
