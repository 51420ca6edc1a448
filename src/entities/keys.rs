//! Name constants for regions, presets and camera views.
//!
//! Avoid string typos, enable IDE autocomplete.
//! Usage: `session.apply_preset(R_FRONT, P_CENTER)`

// === Region names ===
/// Chest panel
pub const R_FRONT: &str = "front";
/// Back panel
pub const R_BACK: &str = "back";
/// Left sleeve
pub const R_LEFT_ARM: &str = "left_arm";
/// Right sleeve
pub const R_RIGHT_ARM: &str = "right_arm";
/// Chest pocket area (overlaps the front panel)
pub const R_POCKET: &str = "pocket";

// === Preset names ===
pub const P_CENTER: &str = "center";
pub const P_TOP_LEFT: &str = "top_left";
pub const P_TOP: &str = "top";
pub const P_TOP_RIGHT: &str = "top_right";
pub const P_LEFT: &str = "left";
pub const P_RIGHT: &str = "right";
pub const P_BOTTOM_LEFT: &str = "bottom_left";
pub const P_BOTTOM: &str = "bottom";
pub const P_BOTTOM_RIGHT: &str = "bottom_right";
/// Small decal at the classic pocket-print position
pub const P_POCKET: &str = "pocket";
/// Cover the whole region (all-over print)
pub const P_FULL: &str = "full";
