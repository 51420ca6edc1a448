//! `TextureMapperSession` - the mapping core's public surface.
//!
//! One session instance per loaded model, owned by the render-layer
//! controller and passed by reference into UI callbacks. All engine state
//! lives here - registry, placements, composite canvas, decode pool -
//! there are no module-level globals and no debug hooks on any ambient
//! namespace.
//!
//! # Execution model
//!
//! Single logical owner, driven by the host's render tick:
//!
//! - UI callbacks mutate transform state synchronously (`apply_gesture`,
//!   `apply_preset`, `clear_image`) and only mark regions dirty.
//! - `set_image` enqueues the decode on the worker pool and returns; the
//!   render tick is never blocked by decoding.
//! - `tick()` drains finished decodes, coalesces dirty regions (at most
//!   one redraw per region per tick, latest transform wins) and redraws.
//!
//! # Decode cancellation
//!
//! Every async `set_image` gets a fresh token; `clear_image` drops the
//! region's token, so a decode that finishes after the clear is discarded
//! instead of resurrecting the placement (stale-write race).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionOptions;
use crate::core::debounce::FinePassDebouncer;
use crate::core::event_bus::EventBus;
use crate::core::workers::Workers;
use crate::entities::composite::{CompositeCanvas, SampleQuality};
use crate::entities::fabric::FabricParams;
use crate::entities::image::PixelImage;
use crate::entities::placement::{Gesture, Placement};
use crate::entities::region::{CameraView, Region, RegionRect, RegionRegistry};
use crate::entities::uv::{correction_for_view, UvTransform, ViewCorrection};
use crate::error::MapperError;
use crate::events::{
    CameraViewChangedEvent, DecodeFailedEvent, FabricChangedEvent, PlacementChangedEvent,
    RegionClearedEvent, RegionRectChangedEvent, TextureUpdatedEvent,
};

/// Clear-target accepted by [`TextureMapperSession::clear_image`].
pub const CLEAR_ALL: &str = "all";

/// Image input for `set_image`. Path and byte sources decode on the
/// worker pool; an already-decoded image installs synchronously.
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Decoded(PixelImage),
}

/// Finished decode coming back from a worker.
struct DecodeResult {
    region: String,
    token: Uuid,
    result: Result<PixelImage, MapperError>,
}

pub struct TextureMapperSession {
    registry: RegionRegistry,
    options: SessionOptions,
    placements: HashMap<String, Placement>,
    canvas: CompositeCanvas,
    bus: EventBus,
    workers: Workers,
    decode_tx: Sender<DecodeResult>,
    decode_rx: Receiver<DecodeResult>,
    /// Live decode token per region; a result with any other token is stale.
    pending: HashMap<String, Uuid>,
    /// Regions to redraw on the next tick, with the quality they need.
    /// Fine wins over Draft when both are requested within one tick.
    dirty: HashMap<String, SampleQuality>,
    debouncer: FinePassDebouncer,
    camera_view: CameraView,
}

impl TextureMapperSession {
    pub fn new(options: SessionOptions) -> anyhow::Result<Self> {
        let registry = RegionRegistry::from_regions(options.regions.clone())?;
        let canvas = CompositeCanvas::new(options.canvas_width, options.canvas_height, options.fabric);
        let workers = Workers::new(options.decode_threads());
        let (decode_tx, decode_rx) = unbounded();
        let debouncer = FinePassDebouncer::new(options.fine_pass_delay_ms);

        info!(
            "Session: {} regions, {}x{} canvas",
            registry.len(),
            options.canvas_width,
            options.canvas_height
        );

        Ok(Self {
            registry,
            options,
            placements: HashMap::new(),
            canvas,
            bus: EventBus::new(),
            workers,
            decode_tx,
            decode_rx,
            pending: HashMap::new(),
            dirty: HashMap::new(),
            debouncer,
            camera_view: CameraView::Front,
        })
    }

    /// Event bus for render-layer / UI subscriptions.
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    // ========== Registry surface ==========

    /// Regions in configuration order (drives UI iteration).
    pub fn list_regions(&self) -> impl Iterator<Item = &Region> {
        self.registry.list()
    }

    pub fn region(&self, name: &str) -> Result<&Region, MapperError> {
        self.registry.get(name)
    }

    /// Operator-level rect edit. The old footprint is restored to fabric
    /// and every region touching either rect is redrawn.
    pub fn set_region_rect(&mut self, name: &str, rect: RegionRect) -> anyhow::Result<()> {
        let old_rect = self.registry.get(name)?.rect;
        self.registry.set_rect(name, rect)?;
        self.canvas.clear_rect(&old_rect);
        for touched in self.registry.overlapping(&old_rect) {
            self.mark_dirty(&touched, SampleQuality::Fine);
        }
        self.mark_dirty(name, SampleQuality::Fine);
        self.bus.emit(RegionRectChangedEvent {
            region: name.to_string(),
        });
        Ok(())
    }

    // ========== Camera view ==========

    pub fn camera_view(&self) -> CameraView {
        self.camera_view
    }

    /// Consume the render layer's "camera view changed" signal and
    /// re-resolve the active region.
    pub fn set_camera_view(&mut self, view: CameraView) {
        self.camera_view = view;
        if let Some(region) = self.registry.for_camera_view(view) {
            self.bus.emit(CameraViewChangedEvent {
                view,
                active_region: region.name.clone(),
            });
        }
    }

    /// Region targeted by the current camera view ("front" fallback).
    pub fn active_region(&self) -> Option<&Region> {
        self.registry.for_camera_view(self.camera_view)
    }

    // ========== Transform engine surface ==========

    /// Apply an image to a region.
    ///
    /// Path/byte sources decode in the background; the placement appears
    /// on the tick the decode finishes. A decode failure leaves any
    /// previous placement untouched and surfaces a [`DecodeFailedEvent`].
    /// Fails fast with `UnknownRegion` for a bad region name.
    pub fn set_image(&mut self, region: &str, source: ImageSource) -> Result<(), MapperError> {
        self.registry.get(region)?;

        match source {
            ImageSource::Decoded(image) => {
                self.pending.remove(region);
                self.install_placement(region, image);
                Ok(())
            }
            ImageSource::Path(path) => {
                self.spawn_decode(region, move || PixelImage::decode_path(&path));
                Ok(())
            }
            ImageSource::Bytes(bytes) => {
                self.spawn_decode(region, move || PixelImage::decode_bytes(&bytes));
                Ok(())
            }
        }
    }

    fn spawn_decode<F>(&mut self, region: &str, decode: F)
    where
        F: FnOnce() -> Result<PixelImage, MapperError> + Send + 'static,
    {
        let token = Uuid::new_v4();
        // Replacing a pending token also orphans the older decode.
        self.pending.insert(region.to_string(), token);

        let tx = self.decode_tx.clone();
        let region = region.to_string();
        let epoch = self.workers.current_epoch();
        self.workers.execute_with_epoch(epoch, move || {
            let result = decode();
            // Receiver gone = session dropped; nothing to do.
            let _ = tx.send(DecodeResult { region, token, result });
        });
    }

    fn install_placement(&mut self, region: &str, image: PixelImage) {
        let default_transform = self
            .registry
            .get(region)
            .map(|r| r.default_transform)
            .unwrap_or_default();
        debug!(
            "Region '{}': installing {}x{} image",
            region,
            image.width(),
            image.height()
        );
        self.placements
            .insert(region.to_string(), Placement::new(Arc::new(image), default_transform));
        self.mark_dirty(region, SampleQuality::Fine);
        self.bus.emit(PlacementChangedEvent {
            region: region.to_string(),
        });
    }

    /// Remove the placement for one region, or every region with
    /// [`CLEAR_ALL`]. Cancels any in-flight decode for the cleared
    /// region(s); the cleared area reverts to the base fabric on the next
    /// tick.
    pub fn clear_image(&mut self, region: &str) -> Result<(), MapperError> {
        if region == CLEAR_ALL {
            // Epoch bump skips every queued decode in one move.
            self.workers.bump_epoch();
            self.pending.clear();
            self.debouncer.cancel_all();
            let names: Vec<String> = self.placements.drain().map(|(name, _)| name).collect();
            for name in names {
                self.mark_dirty(&name, SampleQuality::Fine);
            }
            self.bus.emit(RegionClearedEvent { region: None });
            return Ok(());
        }

        self.registry.get(region)?;
        self.pending.remove(region);
        self.debouncer.cancel(region);
        if self.placements.remove(region).is_some() {
            self.mark_dirty(region, SampleQuality::Fine);
        }
        self.bus.emit(RegionClearedEvent {
            region: Some(region.to_string()),
        });
        Ok(())
    }

    /// Apply an incremental gesture to a region's placement.
    ///
    /// Silent no-op when the region holds no placement; zero-delta
    /// gestures change nothing and schedule nothing. Fails fast with
    /// `UnknownRegion` for a bad region name.
    pub fn apply_gesture(&mut self, region: &str, gesture: Gesture) -> Result<(), MapperError> {
        self.registry.get(region)?;
        let Some(placement) = self.placements.get_mut(region) else {
            return Ok(());
        };
        if !placement.apply_gesture(gesture) {
            return Ok(());
        }
        // Draft redraw now, fine pass once the gesture stream settles.
        self.mark_dirty(region, SampleQuality::Draft);
        self.debouncer.schedule(region);
        self.bus.emit(PlacementChangedEvent {
            region: region.to_string(),
        });
        Ok(())
    }

    /// Assign a named preset transform in one step. Unknown preset names
    /// fail fast; a region without a placement is a silent no-op, like
    /// gestures.
    pub fn apply_preset(&mut self, region: &str, preset: &str) -> Result<(), MapperError> {
        self.registry.get(region)?;
        let transform = self
            .options
            .presets
            .get(preset)
            .copied()
            .ok_or_else(|| MapperError::UnknownPreset(preset.to_string()))?;

        let Some(placement) = self.placements.get_mut(region) else {
            debug!("Preset '{}' on empty region '{}', ignoring", preset, region);
            return Ok(());
        };
        placement.apply_preset(&transform);
        self.mark_dirty(region, SampleQuality::Fine);
        self.bus.emit(PlacementChangedEvent {
            region: region.to_string(),
        });
        Ok(())
    }

    /// Project a region's placement into UV space. `Ok(None)` when the
    /// region holds no placement.
    pub fn to_uv(&self, region: &str) -> Result<Option<UvTransform>, MapperError> {
        let region = self.registry.get(region)?;
        Ok(self.placements.get(&region.name).map(|placement| {
            let correction = self.correction_for(region);
            UvTransform::build(region, placement, &correction)
        }))
    }

    pub fn placement(&self, region: &str) -> Option<&Placement> {
        self.placements.get(region)
    }

    /// True while an async decode for this region is in flight.
    pub fn has_pending_decode(&self, region: &str) -> bool {
        self.pending.contains_key(region)
    }

    // ========== Fabric ==========

    pub fn fabric(&self) -> &FabricParams {
        self.canvas.fabric()
    }

    /// Swap fabric appearance; every region redraws over the new base and
    /// the bump layer regenerates lazily.
    pub fn set_fabric(&mut self, params: FabricParams) {
        self.canvas.set_fabric(params);
        let names: Vec<String> = self.registry.list().map(|r| r.name.clone()).collect();
        for name in names {
            self.mark_dirty(&name, SampleQuality::Fine);
        }
        // Area outside any region keeps the old fill otherwise.
        self.canvas.clear_background();
        self.bus.emit(FabricChangedEvent { params });
    }

    // ========== Render tick ==========

    /// One render-tick's worth of work: drain finished decodes, run due
    /// fine passes, redraw dirty regions (once each, latest transform),
    /// and notify listeners. Returns true if the composite changed.
    pub fn tick(&mut self) -> bool {
        self.drain_decodes();

        for region in self.debouncer.tick() {
            if self.placements.contains_key(&region) {
                self.mark_dirty(&region, SampleQuality::Fine);
            }
        }

        let changed = self.flush_dirty();
        if changed {
            // Listeners get both material inputs with the notification;
            // the base snapshot is one buffer copy per changed tick.
            let revision = self.canvas.revision();
            let base_texture = Arc::new(self.canvas.to_image());
            let bump_map = self.canvas.bump_map_shared();
            self.bus.emit(TextureUpdatedEvent {
                base_texture,
                bump_map,
                revision,
            });
        }
        changed
    }

    fn drain_decodes(&mut self) {
        while let Ok(done) = self.decode_rx.try_recv() {
            match self.pending.get(&done.region) {
                Some(token) if *token == done.token => {
                    self.pending.remove(&done.region);
                    match done.result {
                        Ok(image) => self.install_placement(&done.region, image),
                        Err(e) => {
                            // Previous placement stays; the UI prompts re-upload.
                            warn!("Region '{}': decode failed: {}", done.region, e);
                            self.bus.emit(DecodeFailedEvent {
                                region: done.region,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                _ => {
                    debug!(
                        "Region '{}': discarding stale decode result",
                        done.region
                    );
                }
            }
        }
    }

    fn mark_dirty(&mut self, region: &str, quality: SampleQuality) {
        let entry = self.dirty.entry(region.to_string()).or_insert(quality);
        if quality == SampleQuality::Fine {
            *entry = SampleQuality::Fine;
        }
    }

    /// Redraw every dirty region exactly once, expanding to neighbors
    /// whose rects overlap (a redraw clears its whole rect first).
    fn flush_dirty(&mut self) -> bool {
        if self.dirty.is_empty() {
            return false;
        }

        let mut work: HashMap<String, SampleQuality> = HashMap::new();
        for (name, quality) in self.dirty.drain() {
            let Ok(region) = self.registry.get(&name) else {
                continue; // rect edit may have raced a rename; skip
            };
            for neighbor in self.registry.overlapping(&region.rect) {
                let entry = work.entry(neighbor).or_insert(quality);
                if quality == SampleQuality::Fine {
                    *entry = SampleQuality::Fine;
                }
            }
        }

        // Registry order keeps overlap layering stable (pocket over front).
        let names: Vec<String> = self
            .registry
            .list()
            .filter(|r| work.contains_key(&r.name))
            .map(|r| r.name.clone())
            .collect();
        for name in names {
            let quality = work[&name];
            let region = self.registry.get(&name).expect("dirty region exists").clone();
            let correction = self.correction_for(&region);
            let placement = self.placements.get(&name);
            self.canvas
                .rebuild_region(&region, placement, &correction, quality);
            if let Some(placement) = self.placements.get_mut(&name) {
                placement.clear_dirty();
            }
        }
        true
    }

    fn correction_for(&self, region: &Region) -> ViewCorrection {
        correction_for_view(&self.options.view_corrections, region.view)
    }

    // ========== Composite surface ==========

    /// The shared composite texture. Guaranteed current: pending dirty
    /// regions are flushed before returning.
    pub fn composite(&mut self) -> &CompositeCanvas {
        self.flush_dirty();
        &self.canvas
    }

    /// Composite revision without forcing a flush.
    pub fn revision(&self) -> u64 {
        self.canvas.revision()
    }

    /// The fabric bump/height layer (cached per fabric parameters).
    pub fn bump_map(&mut self) -> &PixelImage {
        self.canvas.bump_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::keys::*;
    use std::time::Duration;

    fn session() -> TextureMapperSession {
        let mut options = SessionOptions::default();
        // Small canvas keeps the pixel tests fast.
        options.canvas_width = 128;
        options.canvas_height = 128;
        options.fine_pass_delay_ms = 5;
        options.decode_threads = 2;
        TextureMapperSession::new(options).unwrap()
    }

    fn red_image() -> PixelImage {
        PixelImage::solid(8, 8, [255, 0, 0, 255])
    }

    fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba(rgba));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Tick until a condition holds (async decode paths).
    fn tick_until(session: &mut TextureMapperSession, cond: impl Fn(&TextureMapperSession) -> bool) {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            session.tick();
            if cond(session) {
                return;
            }
            assert!(std::time::Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_unknown_region_fails_fast() {
        let mut s = session();
        assert!(matches!(
            s.set_image("hood", ImageSource::Decoded(red_image())),
            Err(MapperError::UnknownRegion(_))
        ));
        assert!(matches!(
            s.apply_gesture("hood", Gesture::Rotate { delta: 0.1 }),
            Err(MapperError::UnknownRegion(_))
        ));
        assert!(matches!(
            s.clear_image("hood"),
            Err(MapperError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_unknown_preset_fails_fast() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Decoded(red_image())).unwrap();
        assert!(matches!(
            s.apply_preset(R_FRONT, "upside_down"),
            Err(MapperError::UnknownPreset(_))
        ));
    }

    /// Gestures on an empty region are silent no-ops.
    #[test]
    fn test_gesture_without_placement_noop() {
        let mut s = session();
        s.apply_gesture(R_FRONT, Gesture::Rotate { delta: 1.0 }).unwrap();
        assert!(!s.tick());
    }

    #[test]
    fn test_set_image_sync_and_redraw() {
        let mut s = session();
        let r0 = s.revision();
        s.set_image(R_BACK, ImageSource::Decoded(red_image())).unwrap();
        assert!(s.tick());
        assert!(s.revision() > r0);
        assert!(s.placement(R_BACK).is_some());

        // Back region center (default rect {0.55,0.30,0.40,0.45}) shows
        // the decal; contain-fitted square decal covers the rect center.
        let canvas = s.composite();
        let x = ((0.55 + 0.20) * 128.0) as usize;
        let y = ((0.30 + 0.225) * 128.0) as usize;
        assert_eq!(canvas.pixel(x, y), [255, 0, 0, 255]);
    }

    #[test]
    fn test_async_decode_installs_on_tick() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Bytes(png_bytes([0, 255, 0, 255])))
            .unwrap();
        assert!(s.has_pending_decode(R_FRONT));
        assert!(s.placement(R_FRONT).is_none());

        tick_until(&mut s, |s| s.placement(R_FRONT).is_some());
        assert!(!s.has_pending_decode(R_FRONT));
    }

    /// Decode failure leaves the previous placement untouched.
    #[test]
    fn test_decode_failure_keeps_previous() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Decoded(red_image())).unwrap();
        s.tick();

        s.set_image(R_FRONT, ImageSource::Bytes(vec![1, 2, 3, 4])).unwrap();
        tick_until(&mut s, |s| !s.has_pending_decode(R_FRONT));

        let placement = s.placement(R_FRONT).expect("previous placement kept");
        assert_eq!(placement.image.width(), 8);
    }

    /// Clear-then-decode race: the slow decode's result is discarded.
    #[test]
    fn test_clear_cancels_pending_decode() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Bytes(png_bytes([0, 0, 255, 255])))
            .unwrap();
        s.clear_image(R_FRONT).unwrap();
        assert!(!s.has_pending_decode(R_FRONT));

        // Let the worker finish and deliver; the result must be dropped.
        std::thread::sleep(Duration::from_millis(100));
        s.tick();
        assert!(s.placement(R_FRONT).is_none());
    }

    /// A second upload for the same region orphans the first decode.
    #[test]
    fn test_replacement_decode_wins() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Bytes(png_bytes([10, 0, 0, 255])))
            .unwrap();
        s.set_image(R_FRONT, ImageSource::Decoded(red_image())).unwrap();
        // Sync install cleared the pending token; the byte decode is stale.
        std::thread::sleep(Duration::from_millis(100));
        s.tick();
        let placement = s.placement(R_FRONT).unwrap();
        assert_eq!(placement.image.width(), 8); // the decoded 8x8, not the 4x4 PNG
    }

    #[test]
    fn test_clear_all() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Decoded(red_image())).unwrap();
        s.set_image(R_BACK, ImageSource::Decoded(red_image())).unwrap();
        s.tick();

        s.clear_image(CLEAR_ALL).unwrap();
        assert!(s.placement(R_FRONT).is_none());
        assert!(s.placement(R_BACK).is_none());
        assert!(s.tick());

        // Cleared regions are fabric again.
        let canvas = s.composite();
        let x = ((0.55 + 0.20) * 128.0) as usize;
        let y = ((0.30 + 0.225) * 128.0) as usize;
        assert_eq!(canvas.pixel(x, y), canvas.fabric_pixel(x, y));
    }

    /// Preset translation is the preset's fixed offset, independent of
    /// the image's dimensions.
    #[test]
    fn test_preset_offset_independent_of_image() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Decoded(PixelImage::solid(64, 16, [1, 2, 3, 255])))
            .unwrap();
        s.apply_preset(R_FRONT, P_TOP_LEFT).unwrap();
        let wide = s.placement(R_FRONT).unwrap().transform;

        s.set_image(R_FRONT, ImageSource::Decoded(PixelImage::solid(5, 90, [1, 2, 3, 255])))
            .unwrap();
        s.apply_preset(R_FRONT, P_TOP_LEFT).unwrap();
        let tall = s.placement(R_FRONT).unwrap().transform;

        assert_eq!(wide.offset, [0.25, 0.25]);
        assert_eq!(tall.offset, wide.offset);
    }

    /// Gestures coalesce: many moves within one tick produce one redraw.
    #[test]
    fn test_gesture_coalescing() {
        let mut s = session();
        s.set_image(R_FRONT, ImageSource::Decoded(red_image())).unwrap();
        s.tick();

        let r0 = s.revision();
        for _ in 0..50 {
            s.apply_gesture(R_FRONT, Gesture::Translate { dx: 0.001, dy: 0.0 }).unwrap();
        }
        s.tick();
        // One draft redraw for front plus its overlapping pocket neighbor.
        assert!(s.revision() - r0 <= 3);
    }

    /// The debounced fine pass fires after the gesture stream settles.
    #[test]
    fn test_fine_pass_after_settle() {
        let mut options = SessionOptions::default();
        options.canvas_width = 128;
        options.canvas_height = 128;
        options.fine_pass_delay_ms = 100;
        options.decode_threads = 1;
        let mut s = TextureMapperSession::new(options).unwrap();

        s.set_image(R_LEFT_ARM, ImageSource::Decoded(red_image())).unwrap();
        s.tick();

        s.apply_gesture(R_LEFT_ARM, Gesture::Rotate { delta: 0.3 }).unwrap();
        assert!(s.tick()); // draft pass, well within the settle window
        let r_draft = s.revision();
        assert!(!s.tick()); // still settling - nothing to redraw

        std::thread::sleep(Duration::from_millis(150));
        assert!(s.tick()); // fine pass fired
        assert!(s.revision() > r_draft);
    }

    #[test]
    fn test_to_uv_surface() {
        let mut s = session();
        assert!(s.to_uv(R_FRONT).unwrap().is_none());
        assert!(s.to_uv("hood").is_err());

        s.set_image(R_FRONT, ImageSource::Decoded(red_image())).unwrap();
        let t = s.to_uv(R_FRONT).unwrap().expect("placement projected");
        // Decal center lands inside the front rect.
        let uv = t.apply(glam::Vec2::ZERO);
        assert!(s.region(R_FRONT).unwrap().rect.contains_uv(uv));
    }

    #[test]
    fn test_camera_view_events() {
        let mut s = session();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        s.events().subscribe::<CameraViewChangedEvent, _>(move |e| {
            sink.lock().unwrap().push((e.view, e.active_region.clone()));
        });

        s.set_camera_view(CameraView::Back);
        s.set_camera_view(CameraView::Left);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (CameraView::Back, R_BACK.to_string()));
        assert_eq!(seen[1], (CameraView::Left, R_LEFT_ARM.to_string()));
        assert_eq!(s.active_region().unwrap().name, R_LEFT_ARM);
    }

    /// The texture-updated notification carries both material inputs, so
    /// a listener can apply them without reaching back into the session.
    #[test]
    fn test_texture_updated_event_payload() {
        let mut s = session();
        let updates = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&updates);
        s.events().subscribe::<TextureUpdatedEvent, _>(move |e| {
            sink.lock().unwrap().push((
                e.revision,
                std::sync::Arc::clone(&e.base_texture),
                std::sync::Arc::clone(&e.bump_map),
            ));
        });

        s.set_image(R_FRONT, ImageSource::Decoded(red_image())).unwrap();
        s.tick();
        s.tick(); // nothing dirty - no event

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (revision, base, bump) = &updates[0];
        assert!(*revision > 0);
        // Base snapshot matches the canvas, bump layer covers it too.
        assert_eq!((base.width(), base.height()), (128, 128));
        assert_eq!((bump.width(), bump.height()), (128, 128));
        // Decal pixels made it into the snapshot (front rect center).
        let x = (0.05 + 0.20) * 128.0;
        let y = (0.30 + 0.225) * 128.0;
        assert_eq!(base.sample_nearest(x, y), [1.0, 0.0, 0.0, 1.0]);
    }

    /// Fabric change redraws everything over the new base color.
    #[test]
    fn test_set_fabric_redraws() {
        let mut s = session();
        s.tick();

        let mut fabric = *s.fabric();
        fabric.base_color = [20, 20, 120, 255];
        s.set_fabric(fabric);
        assert!(s.tick());

        let canvas = s.composite();
        // An empty region shows the new base.
        let x = ((0.05 + 0.20) * 128.0) as usize;
        let y = ((0.30 + 0.225) * 128.0) as usize;
        assert_eq!(canvas.pixel(x, y), canvas.fabric_pixel(x, y));
        let px = canvas.pixel(x, y);
        assert!(px[2] > px[0]); // blue-ish now
    }
}
