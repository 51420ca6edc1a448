//! Coordinate space conversions for the mapping pipeline.
//!
//! ## Coordinate Spaces
//!
//! - **Canvas space**: composite canvas pixels, origin top-left, +Y down.
//! - **UV space**: [0,1]² texture parameterization, aligned with canvas
//!   (u = x/w, v = y/h). Any GL-style V flip is the render layer's business.
//! - **Region space**: one region rect normalized to [0,1]², +Y down.
//!   `(0.5, 0.5)` = rect center.
//! - **Decal space**: origin at decal center, unit quad [-0.5,0.5]², +Y
//!   down. Local space for rotation/scale.
//!
//! ## Mapping Pipeline
//!
//! ```text
//! Canvas pixel
//!     |  canvas_to_uv()
//!     v
//! UV space
//!     |  uv_to_region()          (region rect affine)
//!     v
//! Region space
//!     |  inverse placement transform (see uv::UvTransform)
//!     v
//! Decal space
//!     |  decal_to_src()
//!     v
//! Source pixel (for image sampling)
//! ```
//!
//! All spaces share the y-down raster orientation, so no axis flips hide
//! in the conversions; rotation is clockwise-positive throughout.

use glam::Vec2;

use super::region::RegionRect;

/// Canvas pixel center -> UV.
#[inline]
pub fn canvas_to_uv(p: Vec2, canvas: (usize, usize)) -> Vec2 {
    Vec2::new(p.x / canvas.0 as f32, p.y / canvas.1 as f32)
}

/// UV -> canvas pixels.
#[inline]
pub fn uv_to_canvas(uv: Vec2, canvas: (usize, usize)) -> Vec2 {
    Vec2::new(uv.x * canvas.0 as f32, uv.y * canvas.1 as f32)
}

/// UV -> region-local [0,1]² of the given rect.
///
/// Points outside the rect map outside [0,1]² - callers that care must
/// check `RegionRect::contains_uv` first.
#[inline]
pub fn uv_to_region(uv: Vec2, rect: &RegionRect) -> Vec2 {
    (uv - rect.min()) / rect.size()
}

/// Region-local [0,1]² -> UV.
#[inline]
pub fn region_to_uv(p: Vec2, rect: &RegionRect) -> Vec2 {
    rect.min() + p * rect.size()
}

/// Decal space [-0.5,0.5]² -> source image pixels.
#[inline]
pub fn decal_to_src(p: Vec2, src_size: (usize, usize)) -> Vec2 {
    Vec2::new(
        (p.x + 0.5) * src_size.0 as f32,
        (p.y + 0.5) * src_size.1 as f32,
    )
}

/// Source image pixels -> decal space.
#[inline]
pub fn src_to_decal(p: Vec2, src_size: (usize, usize)) -> Vec2 {
    Vec2::new(
        p.x / src_size.0 as f32 - 0.5,
        p.y / src_size.1 as f32 - 0.5,
    )
}
