//! Error taxonomy for the mapping core.
//!
//! Split by recovery strategy:
//! - `UnknownRegion` / `UnknownPreset`: caller bugs, fail fast
//! - `ImageDecode`: bad input data, surfaced to the user for re-upload;
//!   the previous placement (if any) is left untouched
//!
//! A single region failing to draw is NOT an error here - the composite
//! stays valid for the other regions and the failure is logged (see
//! `composite::CompositeCanvas::rebuild_all`).

/// Errors from the public session surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperError {
    /// Region name not present in the registry table.
    UnknownRegion(String),
    /// Preset name not present in the preset table.
    UnknownPreset(String),
    /// Image bytes/file could not be decoded to a raster image.
    ImageDecode(String),
}

impl std::fmt::Display for MapperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapperError::UnknownRegion(name) => write!(f, "Unknown region: {}", name),
            MapperError::UnknownPreset(name) => write!(f, "Unknown preset: {}", name),
            MapperError::ImageDecode(e) => write!(f, "Image decode error: {}", e),
        }
    }
}

impl std::error::Error for MapperError {}
