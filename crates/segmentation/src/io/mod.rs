pub mod manifest;
pub mod sources;

pub use manifest::{StickerEntry, StickerManifest, MANIFEST_FILE_NAME};
pub use sources::{BytesSource, PathSource};
