//! Projection of placement transforms into UV space.
//!
//! Forward chain (decal space -> UV):
//!
//! ```text
//! uv = rect_affine * view_correction * (offset + R(rot) * (eff_scale * p))
//! ```
//!
//! where `eff_scale` is the fitted base size times the user scale, and
//! `view_correction` is a per-camera-view scale/skew adjustment about the
//! region center.
//!
//! # Perspective approximation
//!
//! The correction is an affine scale/skew, NOT a projective homography.
//! Combined with dot-product visibility blending (below) this reproduces
//! the customizer's look: decals fade out towards the silhouette of a
//! curved region instead of cutting off hard, at the cost of true
//! perspective accuracy. Do not "fix" this by swapping in a homography -
//! it changes visual output.
//!
//! # Visibility blending
//!
//! Per fragment: `vis = clamp(dot(normal, facing), 0, 1)`. Fragments with
//! `vis < 0.1` keep their original UV; the rest lerp between original and
//! remapped UV by `vis`.

use glam::{Affine2, Mat2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::placement::{fit_scale, FitMode, Placement, PlacementTransform};
use super::region::{CameraView, Region};
use super::space;

/// Fragments facing away more than this keep their original UV unchanged.
pub const VISIBILITY_CUTOFF: f32 = 0.1;

/// Camera-dependent correction applied in region space, about the region
/// center. Approximates foreshortening of off-axis regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewCorrection {
    /// Axis compression (e.g. a sleeve seen at an angle compresses in x).
    pub scale: [f32; 2],
    /// Horizontal shear coefficient: `x += skew * (y - 0.5)`.
    pub skew: f32,
}

impl Default for ViewCorrection {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewCorrection {
    pub const IDENTITY: Self = Self {
        scale: [1.0, 1.0],
        skew: 0.0,
    };

    pub fn is_identity(&self) -> bool {
        self.scale == [1.0, 1.0] && self.skew == 0.0
    }

    /// Affine acting in region space, fixed point at the region center.
    fn to_affine(&self) -> Affine2 {
        let center = Vec2::splat(0.5);
        let m = Mat2::from_cols(
            Vec2::new(self.scale[0], 0.0),
            Vec2::new(self.skew, self.scale[1]),
        );
        Affine2::from_translation(center)
            * Affine2::from_mat2(m)
            * Affine2::from_translation(-center)
    }
}

/// Forward affine from decal space into region space for one transform.
fn region_from_decal(transform: &PlacementTransform, eff_scale: Vec2) -> Affine2 {
    Affine2::from_translation(transform.offset_vec())
        * Affine2::from_angle(transform.rotation)
        * Affine2::from_scale(eff_scale)
}

/// Placement transform projected into the garment's UV space.
///
/// Owns both directions of the mapping plus the facing vector used for
/// visibility blending. Rebuilt whenever the placement or camera view
/// changes; cheap (two affines).
#[derive(Debug, Clone, Copy)]
pub struct UvTransform {
    /// decal space -> UV.
    uv_from_decal: Affine2,
    /// UV -> decal space (inverse of the above).
    decal_from_uv: Affine2,
    /// UV -> UV remap: current placement relative to the region default.
    /// Identity when the placement sits at its default transform.
    remap: Affine2,
    /// Canonical facing direction of the region's camera view.
    pub facing: Vec3,
}

impl UvTransform {
    /// Build for a region's current placement.
    pub fn build(region: &Region, placement: &Placement, correction: &ViewCorrection) -> Self {
        let rect = &region.rect;
        let base = fit_scale(placement.image.aspect(), rect.aspect(), placement.fit);
        let eff = base * placement.transform.scale_vec();

        let rect_affine =
            Affine2::from_translation(rect.min()) * Affine2::from_scale(rect.size());
        let forward = rect_affine * correction.to_affine()
            * region_from_decal(&placement.transform, eff);

        // Default mapping: same image fitted at the region's default
        // transform with no correction. The remap sends a fragment's
        // original UV to where the current placement wants it to sample.
        let default_base = fit_scale(placement.image.aspect(), rect.aspect(), FitMode::Contain);
        let default_eff = default_base * region.default_transform.scale_vec();
        let default_forward =
            rect_affine * region_from_decal(&region.default_transform, default_eff);

        Self {
            uv_from_decal: forward,
            decal_from_uv: forward.inverse(),
            remap: forward * default_forward.inverse(),
            facing: region.view.facing(),
        }
    }

    /// Decal point -> UV.
    pub fn apply(&self, decal_pt: Vec2) -> Vec2 {
        self.uv_from_decal.transform_point2(decal_pt)
    }

    /// UV -> decal point.
    pub fn unapply(&self, uv: Vec2) -> Vec2 {
        self.decal_from_uv.transform_point2(uv)
    }

    /// UV -> source image pixel for sampling.
    pub fn uv_to_src(&self, uv: Vec2, src_size: (usize, usize)) -> Vec2 {
        space::decal_to_src(self.unapply(uv), src_size)
    }

    /// Visibility factor of a surface normal against this view's facing
    /// direction. 1 = head-on, 0 = silhouette edge or facing away.
    pub fn visibility(&self, normal: Vec3) -> f32 {
        normal.normalize_or_zero().dot(self.facing).clamp(0.0, 1.0)
    }

    /// Per-fragment UV with visibility blending: below the cutoff the
    /// original UV survives unchanged, otherwise a linear blend towards
    /// the placement-transformed UV. Gives the soft silhouette fade.
    pub fn blend(&self, original_uv: Vec2, normal: Vec3) -> Vec2 {
        let vis = self.visibility(normal);
        if vis < VISIBILITY_CUTOFF {
            return original_uv;
        }
        let mapped = self.remap.transform_point2(original_uv);
        original_uv.lerp(mapped, vis)
    }
}

/// Resolve the correction table entry for a camera view.
pub fn correction_for_view(
    table: &indexmap::IndexMap<CameraView, ViewCorrection>,
    view: CameraView,
) -> ViewCorrection {
    table.get(&view).copied().unwrap_or(ViewCorrection::IDENTITY)
}
