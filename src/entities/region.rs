//! Garment regions and the region registry.
//!
//! A `Region` is a named rectangular placement zone in the garment's
//! texture space. The registry is built once from configuration at session
//! startup and is read-only afterwards, except for operator-level rect
//! edits via `set_rect` (region "edit" mode).
//!
//! Iteration order of `list()` matches configuration order - the UI
//! iterates regions in this order, so `IndexMap` rather than `HashMap`.

use glam::{Vec2, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MapperError;
use super::keys::R_FRONT;
use super::placement::PlacementTransform;

/// Camera views the garment can be inspected from.
///
/// Each region is associated with the view that shows it head-on; the
/// session resolves the active region from the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraView {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

impl CameraView {
    /// Canonical world-space facing direction for this view.
    ///
    /// Garment space: +Z out of the chest, +X towards the wearer's left
    /// sleeve as seen from the front, +Y up.
    pub fn facing(self) -> Vec3 {
        match self {
            CameraView::Front => Vec3::Z,
            CameraView::Back => Vec3::NEG_Z,
            CameraView::Left => Vec3::NEG_X,
            CameraView::Right => Vec3::X,
        }
    }
}

/// Axis-aligned rectangle in normalized [0,1]² texture space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RegionRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// True if the rect has positive area and lies fully inside [0,1]².
    pub fn is_normalized(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= 1.0
            && self.y + self.height <= 1.0
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Width / height ratio of the rect as mapped onto the texture.
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    pub fn contains_uv(&self, uv: Vec2) -> bool {
        uv.x >= self.x
            && uv.y >= self.y
            && uv.x <= self.x + self.width
            && uv.y <= self.y + self.height
    }

    pub fn intersects(&self, other: &RegionRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Pixel bounds `(x0, y0, x1, y1)` on a canvas, end-exclusive, clamped.
    pub fn to_pixels(&self, canvas: (usize, usize)) -> (usize, usize, usize, usize) {
        let (w, h) = (canvas.0 as f32, canvas.1 as f32);
        let x0 = (self.x * w).floor().max(0.0) as usize;
        let y0 = (self.y * h).floor().max(0.0) as usize;
        let x1 = (((self.x + self.width) * w).ceil() as usize).min(canvas.0);
        let y1 = (((self.y + self.height) * h).ceil() as usize).min(canvas.1);
        (x0, y0, x1, y1)
    }
}

/// One placement zone on the garment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Unique name ("front", "back", "left_arm", ...). See `keys::R_*`.
    pub name: String,

    /// Bounding rectangle in normalized texture space.
    pub rect: RegionRect,

    /// Camera view that shows this region head-on.
    pub view: CameraView,

    /// Transform a fresh placement starts from.
    #[serde(default)]
    pub default_transform: PlacementTransform,
}

/// Static table of garment regions. Pure lookups, no side effects.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    regions: IndexMap<String, Region>,
}

impl RegionRegistry {
    /// Build from configuration order. Rejects duplicate names and rects
    /// that escape [0,1]² - both indicate a broken config table.
    pub fn from_regions(regions: Vec<Region>) -> anyhow::Result<Self> {
        let mut map = IndexMap::with_capacity(regions.len());
        for region in regions {
            if !region.rect.is_normalized() {
                anyhow::bail!(
                    "Region '{}' rect {:?} escapes [0,1] texture space",
                    region.name,
                    region.rect
                );
            }
            if map.insert(region.name.clone(), region).is_some() {
                anyhow::bail!("Duplicate region name in config");
            }
        }
        Ok(Self { regions: map })
    }

    pub fn get(&self, name: &str) -> Result<&Region, MapperError> {
        self.regions
            .get(name)
            .ok_or_else(|| MapperError::UnknownRegion(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    /// Regions in configuration order (drives UI iteration).
    pub fn list(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Default region for a camera view: first region associated with the
    /// view in config order, falling back to "front", then to the first
    /// configured region.
    pub fn for_camera_view(&self, view: CameraView) -> Option<&Region> {
        self.regions
            .values()
            .find(|r| r.view == view)
            .or_else(|| self.regions.get(R_FRONT))
            .or_else(|| self.regions.values().next())
    }

    /// Operator-level rect edit (region "edit" mode). Same containment
    /// validation as construction.
    pub fn set_rect(&mut self, name: &str, rect: RegionRect) -> anyhow::Result<()> {
        if !rect.is_normalized() {
            anyhow::bail!("Rect {:?} escapes [0,1] texture space", rect);
        }
        let region = self
            .regions
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!(MapperError::UnknownRegion(name.to_string())))?;
        region.rect = rect;
        Ok(())
    }

    /// Names of regions whose rects intersect the given rect, including
    /// the owner itself. A region redraw clears its whole rect, so every
    /// overlapping neighbor has to be redrawn with it.
    pub fn overlapping(&self, rect: &RegionRect) -> Vec<String> {
        self.regions
            .values()
            .filter(|r| r.rect.intersects(rect))
            .map(|r| r.name.clone())
            .collect()
    }
}
