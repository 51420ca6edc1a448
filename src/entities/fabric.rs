//! Fabric appearance: base color fill and the procedural bump layer.
//!
//! The bump/height layer is derived from fabric parameters only (thread
//! density, weave pattern) blended with per-pixel micro-noise - it never
//! depends on placement content, so it is cached by a parameter hash and
//! regenerated on fabric change, not on placement edits.
//!
//! Noise is a deterministic integer hash, not an RNG: the same parameters
//! always produce the same pixels (bump regeneration must be stable across
//! rebuilds and in tests).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::image::PixelImage;

/// Yarn interlacing pattern, controls the bump waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeavePattern {
    /// Checkerboard over/under (cotton jersey look).
    #[default]
    Plain,
    /// Diagonal ridges (denim look).
    Twill,
    /// Vertical ribs (cuff knit look).
    Rib,
}

/// Fabric appearance parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FabricParams {
    /// Garment base color, RGBA.
    pub base_color: [u8; 4],
    /// Thread crossings per texture unit.
    pub thread_density: f32,
    pub weave: WeavePattern,
    /// Bump amplitude in [0,1].
    pub bump_strength: f32,
    /// Micro-noise contribution in [0,1].
    pub noise_amount: f32,
}

impl Default for FabricParams {
    fn default() -> Self {
        Self {
            base_color: [235, 235, 235, 255],
            thread_density: 220.0,
            weave: WeavePattern::Plain,
            bump_strength: 0.35,
            noise_amount: 0.15,
        }
    }
}

impl FabricParams {
    /// Cache key for the bump layer. Floats hashed as bits (same trick as
    /// any layer-configuration hash: exact equality is what we want).
    pub fn cache_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.base_color.hash(&mut hasher);
        self.thread_density.to_bits().hash(&mut hasher);
        self.weave.hash(&mut hasher);
        self.bump_strength.to_bits().hash(&mut hasher);
        self.noise_amount.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}

/// Deterministic per-pixel hash noise in [0,1).
#[inline]
fn hash_noise(x: u32, y: u32) -> f32 {
    // Wang-style integer mix of the pixel coordinates.
    let mut h = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h = h.wrapping_mul(0x297A_2D39);
    h ^= h >> 15;
    (h & 0x00FF_FFFF) as f32 / 0x0100_0000 as f32
}

/// Weave waveform at UV, in [0,1].
#[inline]
fn weave_wave(params: &FabricParams, u: f32, v: f32) -> f32 {
    use std::f32::consts::TAU;
    let d = params.thread_density;
    match params.weave {
        WeavePattern::Plain => {
            ((u * d * TAU).sin() * (v * d * TAU).sin()) * 0.5 + 0.5
        }
        WeavePattern::Twill => ((u - v) * d * TAU).sin() * 0.5 + 0.5,
        WeavePattern::Rib => (u * d * TAU).sin() * 0.5 + 0.5,
    }
}

/// Base fabric color at UV in 0-1 RGBA, weave modulation baked in.
///
/// This is the fill the composite uses for empty regions (and under
/// decals), so tests can compare composite pixels against it exactly.
#[inline]
pub fn fabric_texel(params: &FabricParams, u: f32, v: f32) -> [f32; 4] {
    // Subtle darkening in the weave valleys; keeps the base color readable.
    let wave = weave_wave(params, u, v);
    let shade = 1.0 - params.bump_strength * 0.08 * (1.0 - wave);
    [
        params.base_color[0] as f32 / 255.0 * shade,
        params.base_color[1] as f32 / 255.0 * shade,
        params.base_color[2] as f32 / 255.0 * shade,
        params.base_color[3] as f32 / 255.0,
    ]
}

/// Generate the bump/height layer for the whole canvas.
///
/// Output is F32 RGBA with height replicated into RGB and alpha 1; the
/// render layer converts to whatever normal/bump encoding it needs.
pub fn generate_bump(params: &FabricParams, size: (usize, usize)) -> PixelImage {
    let (w, h) = size;
    let mut buf = vec![0.0f32; w * h * 4];

    buf.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        let v = (y as f32 + 0.5) / h as f32;
        for x in 0..w {
            let u = (x as f32 + 0.5) / w as f32;
            let wave = weave_wave(params, u, v);
            let noise = hash_noise(x as u32, y as u32);
            let height = (wave * (1.0 - params.noise_amount)
                + noise * params.noise_amount)
                * params.bump_strength;

            let idx = x * 4;
            row[idx] = height;
            row[idx + 1] = height;
            row[idx + 2] = height;
            row[idx + 3] = 1.0;
        }
    });

    PixelImage::from_f32_buffer(buf, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::image::PixelBuffer;

    #[test]
    fn test_bump_deterministic() {
        let params = FabricParams::default();
        let a = generate_bump(&params, (64, 64));
        let b = generate_bump(&params, (64, 64));
        match (a.buffer(), b.buffer()) {
            (PixelBuffer::F32(a), PixelBuffer::F32(b)) => assert_eq!(a, b),
            _ => panic!("bump layer must be F32"),
        }
    }

    #[test]
    fn test_cache_key_tracks_params() {
        let base = FabricParams::default();
        assert_eq!(base.cache_key(), FabricParams::default().cache_key());

        let mut denser = base;
        denser.thread_density += 1.0;
        assert_ne!(base.cache_key(), denser.cache_key());

        let mut twill = base;
        twill.weave = WeavePattern::Twill;
        assert_ne!(base.cache_key(), twill.cache_key());
    }

    /// Rib weave varies along u only; the waveform must be constant in v.
    #[test]
    fn test_rib_constant_vertically() {
        let mut params = FabricParams::default();
        params.weave = WeavePattern::Rib;
        let a = weave_wave(&params, 0.123, 0.1);
        let b = weave_wave(&params, 0.123, 0.9);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_bump_height_bounded() {
        let params = FabricParams::default();
        let bump = generate_bump(&params, (32, 32));
        if let PixelBuffer::F32(buf) = bump.buffer() {
            for px in buf.chunks(4) {
                assert!(px[0] >= 0.0 && px[0] <= params.bump_strength + 1e-6);
                assert_eq!(px[3], 1.0);
            }
        } else {
            panic!("bump layer must be F32");
        }
    }

    #[test]
    fn test_fabric_texel_alpha_and_tint() {
        let mut params = FabricParams::default();
        params.base_color = [100, 150, 200, 255];
        let px = fabric_texel(&params, 0.3, 0.7);
        assert!((px[3] - 1.0).abs() < 1e-6);
        // Shading only ever darkens, never exceeds the base color.
        assert!(px[0] <= 100.0 / 255.0 + 1e-6);
        assert!(px[1] <= 150.0 / 255.0 + 1e-6);
    }
}
