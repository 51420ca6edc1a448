//! Session events for render-layer and UI notification.
//!
//! # Event Flow
//!
//! The session emits, collaborators subscribe (see `core::event_bus`):
//!
//! - [`TextureUpdatedEvent`] is the render layer's signal to re-upload to
//!   the GPU. It carries both material inputs, so the listener applies
//!   them without knowing how they were produced and never touches the
//!   session's canvas.
//! - [`DecodeFailedEvent`] is the UI's cue to prompt a re-upload; the
//!   previous placement (if any) is still intact.
//!
//! Emission is fire-and-continue: multiple listeners, non-blocking,
//! at-least-once within a session.

use std::sync::Arc;

use crate::entities::fabric::FabricParams;
use crate::entities::image::PixelImage;
use crate::entities::region::CameraView;

/// Composite (and/or bump layer) changed; GPU upload is due.
///
/// `base_texture` is a snapshot copied out of the canvas once per changed
/// tick; `bump_map` shares the fabric cache (same `Arc` until the fabric
/// parameters change). Listeners upload, they do not mutate.
#[derive(Clone, Debug)]
pub struct TextureUpdatedEvent {
    /// Composite base-color texture, RGBA8.
    pub base_texture: Arc<PixelImage>,
    /// Fabric bump/height layer, RGBA F32.
    pub bump_map: Arc<PixelImage>,
    /// Canvas revision after the rebuild. Strictly increasing; cheap
    /// "is an upload due" check without comparing pixels.
    pub revision: u64,
}

/// A region's placement transform or image changed.
#[derive(Clone, Debug)]
pub struct PlacementChangedEvent {
    pub region: String,
}

/// A region (or all of them, `region == None`) lost its placement.
#[derive(Clone, Debug)]
pub struct RegionClearedEvent {
    pub region: Option<String>,
}

/// The active camera view changed; the session re-resolved its active
/// region accordingly.
#[derive(Clone, Debug)]
pub struct CameraViewChangedEvent {
    pub view: CameraView,
    /// Region now targeted by view-relative operations.
    pub active_region: String,
}

/// An async image decode failed. User-recoverable: prompt re-upload.
#[derive(Clone, Debug)]
pub struct DecodeFailedEvent {
    pub region: String,
    pub error: String,
}

/// Fabric parameters changed (base color, weave, density).
#[derive(Clone, Debug)]
pub struct FabricChangedEvent {
    pub params: FabricParams,
}

/// Operator edited a region's bounding rectangle.
#[derive(Clone, Debug)]
pub struct RegionRectChangedEvent {
    pub region: String,
}
