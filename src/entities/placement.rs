//! Per-region decal placement state.
//!
//! A `Placement` records which image a region currently holds and where it
//! sits: translation in region-local normalized units, rotation, and a
//! scale relative to the fitted base size. Interactive gestures mutate the
//! transform incrementally; presets assign it absolutely.
//!
//! # Conventions
//!
//! - Region-local space is the region rect normalized to [0,1]², y down
//!   (texture raster orientation). `offset = [0.5, 0.5]` centers the decal.
//! - Rotation is radians, clockwise-positive on screen (y-down space).
//! - `scale = [1, 1]` means "as fitted" - the fitted base size comes from
//!   the image aspect, the region aspect and the fit mode, so presets stay
//!   deterministic regardless of image dimensions.
//!
//! Serializable values are plain `[f32; N]` arrays; glam types only appear
//! at math time.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::image::PixelImage;

/// How a decal's base quad is fitted into its region rect before the user
/// scale applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Largest size that keeps the whole image inside the rect (no crop).
    #[default]
    Contain,
    /// Smallest size that covers the whole rect (crops one axis).
    Cover,
}

/// 2D placement transform in region-local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementTransform {
    /// Decal center in region-local normalized units.
    pub offset: [f32; 2],
    /// Radians, clockwise-positive.
    pub rotation: f32,
    /// Non-uniform factor on top of the fitted base size.
    pub scale: [f32; 2],
}

impl Default for PlacementTransform {
    fn default() -> Self {
        Self {
            offset: [0.5, 0.5],
            rotation: 0.0,
            scale: [1.0, 1.0],
        }
    }
}

/// Offset must keep the decal center within reach of the region; the decal
/// itself may extend past the box by design (soft constraint).
const OFFSET_SOFT_MIN: f32 = -0.5;
const OFFSET_SOFT_MAX: f32 = 1.5;

/// Degenerate/negative scale guard.
const SCALE_MIN: f32 = 0.01;
const SCALE_MAX: f32 = 20.0;

impl PlacementTransform {
    pub fn offset_vec(&self) -> Vec2 {
        Vec2::from(self.offset)
    }

    pub fn scale_vec(&self) -> Vec2 {
        Vec2::from(self.scale)
    }
}

/// Interactive gesture primitives. The UI layer translates raw
/// pointer/touch events into these; the engine only sees deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Move by `(dx, dy)` region-local units.
    Translate { dx: f32, dy: f32 },
    /// Rotate by `delta` radians.
    Rotate { delta: f32 },
    /// Scale both axes by `1 + delta`.
    Scale { delta: f32 },
}

impl Gesture {
    /// Zero-delta gestures are no-ops by contract.
    pub fn is_noop(&self) -> bool {
        match *self {
            Gesture::Translate { dx, dy } => dx == 0.0 && dy == 0.0,
            Gesture::Rotate { delta } => delta == 0.0,
            Gesture::Scale { delta } => delta == 0.0,
        }
    }
}

/// Named absolute transform applied in one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetTransform {
    pub offset: [f32; 2],
    #[serde(default)]
    pub rotation: f32,
    pub scale: [f32; 2],
    #[serde(default)]
    pub fit: FitMode,
}

/// Live placement of one image on one region.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Decoded bitmap, shared with rebuild jobs.
    pub image: Arc<PixelImage>,
    pub transform: PlacementTransform,
    pub fit: FitMode,
    /// Alpha multiplier in [0,1] applied on top of the image's own alpha.
    pub opacity: f32,
    /// Composite canvas must redraw this region.
    dirty: bool,
}

impl Placement {
    pub fn new(image: Arc<PixelImage>, transform: PlacementTransform) -> Self {
        Self {
            image,
            transform,
            fit: FitMode::Contain,
            opacity: 1.0,
            dirty: true,
        }
    }

    /// Apply a gesture delta. Returns true if the transform changed;
    /// zero-delta gestures leave it untouched and report false, so
    /// repeated no-op calls never schedule a redraw.
    pub fn apply_gesture(&mut self, gesture: Gesture) -> bool {
        if gesture.is_noop() {
            return false;
        }
        match gesture {
            Gesture::Translate { dx, dy } => {
                let t = &mut self.transform;
                t.offset[0] = (t.offset[0] + dx).clamp(OFFSET_SOFT_MIN, OFFSET_SOFT_MAX);
                t.offset[1] = (t.offset[1] + dy).clamp(OFFSET_SOFT_MIN, OFFSET_SOFT_MAX);
            }
            Gesture::Rotate { delta } => {
                self.transform.rotation += delta;
            }
            Gesture::Scale { delta } => {
                let factor = 1.0 + delta;
                let t = &mut self.transform;
                t.scale[0] = (t.scale[0] * factor).clamp(SCALE_MIN, SCALE_MAX);
                t.scale[1] = (t.scale[1] * factor).clamp(SCALE_MIN, SCALE_MAX);
            }
        }
        self.dirty = true;
        true
    }

    /// Assign an absolute preset transform (gesture history is discarded).
    pub fn apply_preset(&mut self, preset: &PresetTransform) {
        self.transform = PlacementTransform {
            offset: preset.offset,
            rotation: preset.rotation,
            scale: preset.scale,
        };
        self.fit = preset.fit;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Fitted base size of a decal, as a fraction of the region rect.
///
/// `image_aspect` and `rect_aspect` are width/height ratios measured in
/// the same (texture) space. Contain keeps the whole image visible, Cover
/// fills the rect; both preserve the image's aspect within the rect.
pub fn fit_scale(image_aspect: f32, rect_aspect: f32, fit: FitMode) -> Vec2 {
    // Relative aspect of the image quad inside the rect's own unit square.
    let rel = image_aspect / rect_aspect;
    match fit {
        FitMode::Contain => {
            if rel >= 1.0 {
                Vec2::new(1.0, 1.0 / rel)
            } else {
                Vec2::new(rel, 1.0)
            }
        }
        FitMode::Cover => {
            if rel >= 1.0 {
                Vec2::new(rel, 1.0)
            } else {
                Vec2::new(1.0, 1.0 / rel)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_placement() -> Placement {
        Placement::new(
            Arc::new(PixelImage::solid(8, 8, [255, 0, 0, 255])),
            PlacementTransform::default(),
        )
    }

    /// Zero-delta gestures leave the transform structurally unchanged.
    #[test]
    fn test_zero_delta_idempotent() {
        let mut p = test_placement();
        let _ = p.apply_gesture(Gesture::Rotate { delta: 0.4 });
        p.clear_dirty();
        let before = p.transform;

        for _ in 0..10 {
            assert!(!p.apply_gesture(Gesture::Translate { dx: 0.0, dy: 0.0 }));
            assert!(!p.apply_gesture(Gesture::Rotate { delta: 0.0 }));
            assert!(!p.apply_gesture(Gesture::Scale { delta: 0.0 }));
        }
        assert_eq!(p.transform, before);
        assert!(!p.is_dirty());
    }

    /// Sequential rotations accumulate.
    #[test]
    fn test_rotation_accumulates() {
        let mut p = test_placement();
        let (a, b) = (0.3, 0.25);
        p.apply_gesture(Gesture::Rotate { delta: a });
        p.apply_gesture(Gesture::Rotate { delta: b });
        assert!((p.transform.rotation - (a + b)).abs() < 1e-6);
    }

    #[test]
    fn test_scale_multiplicative() {
        let mut p = test_placement();
        p.apply_gesture(Gesture::Scale { delta: 0.5 });
        p.apply_gesture(Gesture::Scale { delta: 0.5 });
        assert!((p.transform.scale[0] - 2.25).abs() < 1e-6);
        assert!((p.transform.scale[1] - 2.25).abs() < 1e-6);
    }

    /// Presets yield the same absolute transform regardless of history.
    #[test]
    fn test_preset_deterministic() {
        let preset = PresetTransform {
            offset: [0.5, 0.5],
            rotation: 0.0,
            scale: [1.0, 1.0],
            fit: FitMode::Contain,
        };

        let mut a = test_placement();
        a.apply_preset(&preset);

        let mut b = test_placement();
        b.apply_gesture(Gesture::Translate { dx: 0.3, dy: -0.2 });
        b.apply_gesture(Gesture::Rotate { delta: 1.1 });
        b.apply_gesture(Gesture::Scale { delta: 0.7 });
        b.apply_preset(&preset);

        assert_eq!(a.transform, b.transform);
    }

    /// Offset is soft-clamped: the decal may extend past the region box,
    /// but its center cannot run away entirely.
    #[test]
    fn test_offset_soft_bounds() {
        let mut p = test_placement();
        for _ in 0..100 {
            p.apply_gesture(Gesture::Translate { dx: 0.5, dy: 0.5 });
        }
        assert!(p.transform.offset[0] <= 1.5);
        assert!(p.transform.offset[1] <= 1.5);
    }

    #[test]
    fn test_fit_scale() {
        // Wide image in a square rect: contain shrinks y, cover grows x.
        let contain = fit_scale(2.0, 1.0, FitMode::Contain);
        assert!((contain.x - 1.0).abs() < 1e-6);
        assert!((contain.y - 0.5).abs() < 1e-6);

        let cover = fit_scale(2.0, 1.0, FitMode::Cover);
        assert!((cover.x - 2.0).abs() < 1e-6);
        assert!((cover.y - 1.0).abs() < 1e-6);

        // Matching aspects: both are exact fit.
        assert_eq!(fit_scale(1.5, 1.5, FitMode::Contain), Vec2::ONE);
        assert_eq!(fit_scale(1.5, 1.5, FitMode::Cover), Vec2::ONE);
    }
}
