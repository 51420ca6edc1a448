//! Session configuration: region table, preset table, view corrections
//! and fabric parameters.
//!
//! The whole configuration surface is one plain options struct passed in
//! at session construction - no ambient globals, no runtime-built control
//! panels. Ships with a built-in T-shirt layout; a JSON file can replace
//! any part of it.

use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::entities::fabric::FabricParams;
use crate::entities::keys::*;
use crate::entities::placement::{FitMode, PlacementTransform, PresetTransform};
use crate::entities::region::{CameraView, Region, RegionRect};
use crate::entities::uv::ViewCorrection;

/// Everything a `TextureMapperSession` needs to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Composite canvas size in pixels (matches the model's texture).
    pub canvas_width: usize,
    pub canvas_height: usize,

    /// Garment regions in UI iteration order.
    pub regions: Vec<Region>,

    /// Named absolute placement transforms.
    pub presets: IndexMap<String, PresetTransform>,

    /// Per-camera-view perspective approximation factors.
    pub view_corrections: IndexMap<CameraView, ViewCorrection>,

    pub fabric: FabricParams,

    /// Settle delay before the bilinear re-render pass.
    pub fine_pass_delay_ms: u64,

    /// Decode worker threads. 0 = half the CPUs.
    pub decode_threads: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            canvas_width: 2048,
            canvas_height: 2048,
            regions: default_regions(),
            presets: default_presets(),
            view_corrections: default_view_corrections(),
            fabric: FabricParams::default(),
            fine_pass_delay_ms: 120,
            decode_threads: 0,
        }
    }
}

impl SessionOptions {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let options = serde_json::from_str(&text)?;
        Ok(options)
    }

    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Effective decode thread count.
    pub fn decode_threads(&self) -> usize {
        if self.decode_threads > 0 {
            self.decode_threads
        } else {
            (num_cpus::get() / 2).max(1)
        }
    }
}

/// Built-in T-shirt region layout in the model's UV atlas: body panels in
/// the lower half, sleeves along the top, pocket zone inside the front
/// panel.
pub fn default_regions() -> Vec<Region> {
    vec![
        Region {
            name: R_FRONT.into(),
            rect: RegionRect::new(0.05, 0.30, 0.40, 0.45),
            view: CameraView::Front,
            default_transform: PlacementTransform::default(),
        },
        Region {
            name: R_BACK.into(),
            rect: RegionRect::new(0.55, 0.30, 0.40, 0.45),
            view: CameraView::Back,
            default_transform: PlacementTransform::default(),
        },
        Region {
            name: R_LEFT_ARM.into(),
            rect: RegionRect::new(0.05, 0.05, 0.25, 0.18),
            view: CameraView::Left,
            default_transform: PlacementTransform::default(),
        },
        Region {
            name: R_RIGHT_ARM.into(),
            rect: RegionRect::new(0.55, 0.05, 0.25, 0.18),
            view: CameraView::Right,
            default_transform: PlacementTransform::default(),
        },
        Region {
            name: R_POCKET.into(),
            rect: RegionRect::new(0.30, 0.38, 0.12, 0.10),
            view: CameraView::Front,
            default_transform: PlacementTransform::default(),
        },
    ]
}

static DEFAULT_PRESETS: Lazy<IndexMap<String, PresetTransform>> = Lazy::new(|| {
    let anchor = |x: f32, y: f32| PresetTransform {
        offset: [x, y],
        rotation: 0.0,
        scale: [0.5, 0.5],
        fit: FitMode::Contain,
    };

    let mut presets = IndexMap::new();
    presets.insert(P_CENTER.to_string(), anchor(0.5, 0.5));
    presets.insert(P_TOP_LEFT.to_string(), anchor(0.25, 0.25));
    presets.insert(P_TOP.to_string(), anchor(0.5, 0.25));
    presets.insert(P_TOP_RIGHT.to_string(), anchor(0.75, 0.25));
    presets.insert(P_LEFT.to_string(), anchor(0.25, 0.5));
    presets.insert(P_RIGHT.to_string(), anchor(0.75, 0.5));
    presets.insert(P_BOTTOM_LEFT.to_string(), anchor(0.25, 0.75));
    presets.insert(P_BOTTOM.to_string(), anchor(0.5, 0.75));
    presets.insert(P_BOTTOM_RIGHT.to_string(), anchor(0.75, 0.75));
    presets.insert(
        P_POCKET.to_string(),
        PresetTransform {
            offset: [0.70, 0.35],
            rotation: 0.0,
            scale: [0.22, 0.22],
            fit: FitMode::Contain,
        },
    );
    presets.insert(
        P_FULL.to_string(),
        PresetTransform {
            offset: [0.5, 0.5],
            rotation: 0.0,
            scale: [1.0, 1.0],
            fit: FitMode::Cover,
        },
    );
    presets
});

pub fn default_presets() -> IndexMap<String, PresetTransform> {
    DEFAULT_PRESETS.clone()
}

/// Foreshortening approximations per view. Body panels are seen head-on;
/// sleeves sit at an angle, so they compress horizontally with a slight
/// opposing shear per side.
pub fn default_view_corrections() -> IndexMap<CameraView, ViewCorrection> {
    let mut corrections = IndexMap::new();
    corrections.insert(CameraView::Front, ViewCorrection::IDENTITY);
    corrections.insert(CameraView::Back, ViewCorrection::IDENTITY);
    corrections.insert(
        CameraView::Left,
        ViewCorrection {
            scale: [0.85, 1.0],
            skew: 0.08,
        },
    );
    corrections.insert(
        CameraView::Right,
        ViewCorrection {
            scale: [0.85, 1.0],
            skew: -0.08,
        },
    );
    corrections
}
