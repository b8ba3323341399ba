use glam::Vec3;

use crate::texture_pipeline::image::{LinearColor, LinearImage};

/// Alpha below this is treated as real transparency.
const OPAQUE_ALPHA: f32 = 254.0 / 255.0;

/// `g = 1 - clamp(g)`, converting between normal-map Y conventions.
pub fn flip_green_channel(image: &mut LinearImage) {
    for pixel in &mut image.pixels {
        pixel.g = 1.0 - pixel.g.clamp(0.0, 1.0);
    }
}

pub fn replicate_red_channel(mips: &mut [LinearImage]) {
    for pixel in mips.iter_mut().flat_map(|m| m.pixels.iter_mut()) {
        *pixel = LinearColor::new(pixel.r, pixel.r, pixel.r, pixel.r);
    }
}

pub fn replicate_alpha_channel(mips: &mut [LinearImage]) {
    for pixel in mips.iter_mut().flat_map(|m| m.pixels.iter_mut()) {
        *pixel = LinearColor::new(pixel.a, pixel.a, pixel.a, pixel.a);
    }
}

/// Decodes RGB as a `[-1, 1]` vector.
#[inline]
pub fn decode_normal(color: &LinearColor) -> Vec3 {
    Vec3::new(color.r * 2.0 - 1.0, color.g * 2.0 - 1.0, color.b * 2.0 - 1.0)
}

/// Renormalizes tangent-space normals in place; zero vectors stay zero.
pub fn normalize_mip(image: &mut LinearImage) {
    for pixel in &mut image.pixels {
        let n = decode_normal(pixel).normalize_or_zero();
        *pixel = LinearColor::new(n.x * 0.5 + 0.5, n.y * 0.5 + 0.5, n.z * 0.5 + 0.5, pixel.a);
    }
}

/// True when any texel is visibly transparent.
pub fn detect_alpha_channel(image: &LinearImage) -> bool {
    image.pixels.iter().any(|p| p.a < OPAQUE_ALPHA)
}
