//! Shared composite canvas - the union of all placements.
//!
//! One RGBA8 canvas in the model's UV layout, owned exclusively by this
//! module: the transform engine maintains transforms, never pixels. Each
//! region redraw first restores the base fabric fill for the region's
//! rect, then inverse-maps the placement image over it, so a failed draw
//! can only ever leave the base fabric behind - never a half-drawn decal.
//!
//! Drawing is reverse mapping per output pixel (canvas -> UV -> decal ->
//! source sample), bilinear for settled content and nearest-neighbor for
//! draft passes during gesture storms, with rayon row parallelism.
//!
//! Failure semantics: a region that cannot draw (zero-area bitmap) is
//! skipped with a warning; the rest of the composite stays valid.

use std::sync::Arc;

use glam::Vec2;
use log::{debug, warn};
use rayon::prelude::*;

use super::fabric::{fabric_texel, generate_bump, FabricParams};
use super::image::PixelImage;
use super::placement::Placement;
use super::region::Region;
use super::uv::{UvTransform, ViewCorrection};

/// Sampling quality for a rebuild pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleQuality {
    /// Nearest-neighbor, for interactive feedback while gestures stream.
    Draft,
    /// Bilinear, for settled content.
    Fine,
}

#[inline]
fn to_u8(c: f32) -> u8 {
    (c * 255.0).clamp(0.0, 255.0) as u8
}

/// The shared composite texture and its derived bump layer.
pub struct CompositeCanvas {
    width: usize,
    height: usize,
    /// RGBA8, row-major.
    buffer: Vec<u8>,
    fabric: FabricParams,
    /// Bump layer cached by fabric parameter hash; shared with
    /// texture-updated notifications.
    bump: Option<(u64, Arc<PixelImage>)>,
    /// Bumped on every pixel mutation; render layers compare it to decide
    /// whether a GPU upload is due.
    revision: u64,
}

impl CompositeCanvas {
    /// Create the canvas filled with the base fabric.
    pub fn new(width: usize, height: usize, fabric: FabricParams) -> Self {
        let mut canvas = Self {
            width,
            height,
            buffer: vec![0u8; width * height * 4],
            fabric,
            bump: None,
            revision: 0,
        };
        canvas.fill_fabric(0, 0, width, height);
        canvas
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pixels(&self) -> &[u8] {
        &self.buffer
    }

    /// RGBA of one canvas pixel.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.buffer[idx],
            self.buffer[idx + 1],
            self.buffer[idx + 2],
            self.buffer[idx + 3],
        ]
    }

    pub fn fabric(&self) -> &FabricParams {
        &self.fabric
    }

    /// Swap fabric parameters. The caller is responsible for marking
    /// regions dirty; the bump cache invalidates itself via the key.
    pub fn set_fabric(&mut self, fabric: FabricParams) {
        self.fabric = fabric;
    }

    /// Base fabric color at a pixel, quantized exactly as the fill writes
    /// it (tests compare composite pixels against this).
    pub fn fabric_pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let u = (x as f32 + 0.5) / self.width as f32;
        let v = (y as f32 + 0.5) / self.height as f32;
        let c = fabric_texel(&self.fabric, u, v);
        [to_u8(c[0]), to_u8(c[1]), to_u8(c[2]), to_u8(c[3])]
    }

    fn fill_fabric(&mut self, x0: usize, y0: usize, x1: usize, y1: usize) {
        let w = self.width;
        let h = self.height;
        let fabric = self.fabric;
        self.buffer
            .par_chunks_mut(w * 4)
            .enumerate()
            .filter(|(y, _)| *y >= y0 && *y < y1)
            .for_each(|(y, row)| {
                let v = (y as f32 + 0.5) / h as f32;
                for x in x0..x1 {
                    let u = (x as f32 + 0.5) / w as f32;
                    let c = fabric_texel(&fabric, u, v);
                    let idx = x * 4;
                    row[idx] = to_u8(c[0]);
                    row[idx + 1] = to_u8(c[1]);
                    row[idx + 2] = to_u8(c[2]);
                    row[idx + 3] = to_u8(c[3]);
                }
            });
        self.revision += 1;
    }

    /// Restore the base fabric over an arbitrary rect (used when a region
    /// rect is edited and its old footprint must not keep decal pixels).
    pub fn clear_rect(&mut self, rect: &super::region::RegionRect) {
        let (x0, y0, x1, y1) = rect.to_pixels(self.size());
        self.fill_fabric(x0, y0, x1, y1);
    }

    /// Re-fill the whole canvas with the current fabric (fabric swap).
    /// Region redraws afterwards restore any placements on top.
    pub fn clear_background(&mut self) {
        self.fill_fabric(0, 0, self.width, self.height);
    }

    /// Redraw one region's sub-rectangle.
    ///
    /// Restores the base fabric fill, then draws the placement (if any)
    /// at its current transform. Returns true if a decal was drawn; a
    /// skipped draw (no placement, or undrawable bitmap) leaves the base
    /// fabric and returns false. Never leaves stale pixels behind.
    pub fn rebuild_region(
        &mut self,
        region: &Region,
        placement: Option<&Placement>,
        correction: &ViewCorrection,
        quality: SampleQuality,
    ) -> bool {
        let (x0, y0, x1, y1) = region.rect.to_pixels(self.size());
        if x0 >= x1 || y0 >= y1 {
            warn!("Region '{}' maps to an empty pixel rect, skipping", region.name);
            return false;
        }

        self.fill_fabric(x0, y0, x1, y1);

        let Some(placement) = placement else {
            return false;
        };
        if placement.image.is_empty() {
            warn!(
                "Region '{}': zero-area bitmap, keeping base fabric",
                region.name
            );
            return false;
        }
        if placement.opacity <= 0.0 {
            debug!("Region '{}': opacity 0, keeping base fabric", region.name);
            return false;
        }

        let transform = UvTransform::build(region, placement, correction);
        let image = placement.image.clone();
        let src_size = (image.width(), image.height());
        let opacity = placement.opacity.clamp(0.0, 1.0);
        let (w, h) = (self.width, self.height);

        self.buffer
            .par_chunks_mut(w * 4)
            .enumerate()
            .filter(|(y, _)| *y >= y0 && *y < y1)
            .for_each(|(y, row)| {
                for x in x0..x1 {
                    let uv = Vec2::new((x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32);
                    let src_pt = transform.uv_to_src(uv, src_size);
                    let c = match quality {
                        SampleQuality::Draft => image.sample_nearest(src_pt.x, src_pt.y),
                        SampleQuality::Fine => image.sample_bilinear(src_pt.x, src_pt.y),
                    };

                    let alpha = c[3] * opacity;
                    if alpha <= 0.0 {
                        continue; // outside the decal quad or transparent
                    }
                    let inv = 1.0 - alpha;
                    let idx = x * 4;
                    let base = [
                        row[idx] as f32 / 255.0,
                        row[idx + 1] as f32 / 255.0,
                        row[idx + 2] as f32 / 255.0,
                        row[idx + 3] as f32 / 255.0,
                    ];
                    row[idx] = to_u8(base[0] * inv + c[0] * alpha);
                    row[idx + 1] = to_u8(base[1] * inv + c[1] * alpha);
                    row[idx + 2] = to_u8(base[2] * inv + c[2] * alpha);
                    row[idx + 3] = to_u8(base[3] * inv + alpha);
                }
            });

        self.revision += 1;
        debug!(
            "Rebuilt region '{}' ({}x{} px, {:?})",
            region.name,
            x1 - x0,
            y1 - y0,
            quality
        );
        true
    }

    /// Redraw every region in registry order.
    ///
    /// Each region's draw is its own failure boundary: a region that
    /// cannot draw is skipped (logged above) and the rest of the
    /// composite stays valid.
    pub fn rebuild_all<'a, I>(&mut self, regions: I, quality: SampleQuality)
    where
        I: IntoIterator<Item = (&'a Region, Option<&'a Placement>, &'a ViewCorrection)>,
    {
        for (region, placement, correction) in regions {
            self.rebuild_region(region, placement, correction, quality);
        }
    }

    /// The bump/height layer for the current fabric. Regenerated only when
    /// the fabric parameters change; placement edits reuse the cache.
    pub fn bump_map(&mut self) -> &PixelImage {
        self.ensure_bump();
        self.bump.as_ref().unwrap().1.as_ref() // safe: just ensured
    }

    /// Same layer as a shared handle, for event payloads. The `Arc` stays
    /// identical between fabric changes.
    pub fn bump_map_shared(&mut self) -> Arc<PixelImage> {
        self.ensure_bump();
        Arc::clone(&self.bump.as_ref().unwrap().1) // safe: just ensured
    }

    fn ensure_bump(&mut self) {
        let key = self.fabric.cache_key();
        let stale = match &self.bump {
            Some((cached_key, _)) => *cached_key != key,
            None => true,
        };
        if stale {
            debug!("Regenerating bump layer (key {:016x})", key);
            let layer = generate_bump(&self.fabric, self.size());
            self.bump = Some((key, Arc::new(layer)));
        }
    }

    /// Copy the composite out as an image (for encoding/export).
    pub fn to_image(&self) -> PixelImage {
        PixelImage::from_u8_buffer(self.buffer.clone(), self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::entities::image::PixelBuffer;
    use crate::entities::keys::{R_BACK, R_FRONT};
    use crate::entities::placement::PlacementTransform;
    use crate::entities::region::{CameraView, RegionRect};

    fn region(name: &str, rect: RegionRect) -> Region {
        Region {
            name: name.into(),
            rect,
            view: CameraView::Front,
            default_transform: PlacementTransform::default(),
        }
    }

    fn front() -> Region {
        region(R_FRONT, RegionRect::new(0.25, 0.25, 0.5, 0.5))
    }

    fn red_placement() -> Placement {
        Placement::new(
            Arc::new(PixelImage::solid(8, 8, [255, 0, 0, 255])),
            PlacementTransform::default(),
        )
    }

    #[test]
    fn test_new_canvas_is_fabric() {
        let canvas = CompositeCanvas::new(64, 64, FabricParams::default());
        for &(x, y) in &[(0, 0), (31, 17), (63, 63)] {
            assert_eq!(canvas.pixel(x, y), canvas.fabric_pixel(x, y));
        }
    }

    /// A centered opaque decal lands on the region center pixel.
    #[test]
    fn test_decal_drawn_at_center() {
        let mut canvas = CompositeCanvas::new(64, 64, FabricParams::default());
        let region = front();
        let placement = red_placement();
        let drawn = canvas.rebuild_region(
            &region,
            Some(&placement),
            &ViewCorrection::IDENTITY,
            SampleQuality::Fine,
        );
        assert!(drawn);
        // Region center = canvas center.
        assert_eq!(canvas.pixel(32, 32), [255, 0, 0, 255]);
        // Outside the region rect the fabric is untouched.
        assert_eq!(canvas.pixel(2, 2), canvas.fabric_pixel(2, 2));
    }

    /// Rebuild with no placement restores the base fabric - no stale
    /// pixels from a previous decal survive.
    #[test]
    fn test_rebuild_clears_stale_decal() {
        let mut canvas = CompositeCanvas::new(64, 64, FabricParams::default());
        let region = region(R_BACK, RegionRect::new(0.25, 0.25, 0.5, 0.5));
        let placement = red_placement();

        canvas.rebuild_region(
            &region,
            Some(&placement),
            &ViewCorrection::IDENTITY,
            SampleQuality::Fine,
        );
        assert_eq!(canvas.pixel(32, 32), [255, 0, 0, 255]);

        let drawn = canvas.rebuild_region(
            &region,
            None,
            &ViewCorrection::IDENTITY,
            SampleQuality::Fine,
        );
        assert!(!drawn);
        let (x0, y0, x1, y1) = region.rect.to_pixels(canvas.size());
        for y in y0..y1 {
            for x in x0..x1 {
                assert_eq!(canvas.pixel(x, y), canvas.fabric_pixel(x, y));
            }
        }
    }

    /// A zero-area bitmap is skipped; the rest of a bulk rebuild still
    /// draws (partial-failure isolation).
    #[test]
    fn test_partial_failure_isolation() {
        let mut canvas = CompositeCanvas::new(64, 64, FabricParams::default());
        let left = region("left", RegionRect::new(0.0, 0.0, 0.5, 1.0));
        let right = region("right", RegionRect::new(0.5, 0.0, 0.5, 1.0));

        let bad = Placement::new(
            Arc::new(PixelImage::solid(0, 0, [0, 0, 0, 0])),
            PlacementTransform::default(),
        );
        let good = red_placement();

        let correction = ViewCorrection::IDENTITY;
        canvas.rebuild_all(
            vec![
                (&left, Some(&bad), &correction),
                (&right, Some(&good), &correction),
            ],
            SampleQuality::Fine,
        );

        // Bad region reverted to fabric, good region drew its decal.
        assert_eq!(canvas.pixel(16, 32), canvas.fabric_pixel(16, 32));
        assert_eq!(canvas.pixel(48, 32), [255, 0, 0, 255]);
    }

    #[test]
    fn test_opacity_blend() {
        let mut fabric = FabricParams::default();
        fabric.base_color = [0, 0, 0, 255];
        fabric.bump_strength = 0.0; // flat black base for exact math
        let mut canvas = CompositeCanvas::new(64, 64, fabric);

        let mut placement = red_placement();
        placement.opacity = 0.5;
        canvas.rebuild_region(
            &front(),
            Some(&placement),
            &ViewCorrection::IDENTITY,
            SampleQuality::Fine,
        );

        let px = canvas.pixel(32, 32);
        assert!((px[0] as i32 - 127).abs() <= 1); // half red over black
        assert_eq!(px[1], 0);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_revision_increments() {
        let mut canvas = CompositeCanvas::new(32, 32, FabricParams::default());
        let r0 = canvas.revision();
        canvas.rebuild_region(
            &front(),
            Some(&red_placement()),
            &ViewCorrection::IDENTITY,
            SampleQuality::Draft,
        );
        assert!(canvas.revision() > r0);
    }

    /// Bump layer regenerates on fabric change only.
    #[test]
    fn test_bump_cached_by_fabric() {
        let mut canvas = CompositeCanvas::new(32, 32, FabricParams::default());
        let ptr0 = match canvas.bump_map().buffer() {
            PixelBuffer::F32(buf) => buf.as_ptr() as usize,
            _ => panic!("bump layer must be F32"),
        };
        // Placement edits don't touch the cache.
        canvas.rebuild_region(
            &front(),
            Some(&red_placement()),
            &ViewCorrection::IDENTITY,
            SampleQuality::Fine,
        );
        let ptr1 = match canvas.bump_map().buffer() {
            PixelBuffer::F32(buf) => buf.as_ptr() as usize,
            _ => unreachable!(),
        };
        assert_eq!(ptr0, ptr1);

        // Fabric change invalidates.
        let mut fabric = *canvas.fabric();
        fabric.weave = crate::entities::fabric::WeavePattern::Twill;
        canvas.set_fabric(fabric);
        let ptr2 = match canvas.bump_map().buffer() {
            PixelBuffer::F32(buf) => buf.as_ptr() as usize,
            _ => unreachable!(),
        };
        assert_ne!(ptr0, ptr2);
    }
}
