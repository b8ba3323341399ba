//! Roughness adjustment driven by normal map variance (Toksvig).

use tracing::warn;

use super::channels::decode_normal;
use crate::texture_pipeline::image::LinearImage;
use crate::texture_pipeline::settings::CompositeTextureMode;

const VARIANCE_BIAS: f32 = 0.00004;

/// Widens `roughness` by the variance implied by a shortened normal.
///
/// Closed form of the specular power round trip
/// `p' = p / (1 + variance * p)` that stays finite at roughness 0.
pub fn toksvig_roughness(roughness: f32, normal_length: f32, power: f32) -> f32 {
    // zero-length normals read as fully rough instead of NaN
    let length = normal_length.clamp(1e-6, 1.0);
    let variance = ((1.0 - length) / length - VARIANCE_BIAS).max(0.0) * power;

    let a = roughness * roughness;
    let a2 = a * a;
    let b = 2.0 * variance * (a2 - 1.0);
    ((b - a2) / (b - 1.0)).powf(0.25)
}

fn apply_level(target: &mut LinearImage, normals: &LinearImage, channel: usize, power: f32) {
    debug_assert_eq!(target.pixels.len(), normals.pixels.len());
    for (pixel, normal) in target.pixels.iter_mut().zip(&normals.pixels) {
        let length = decode_normal(normal).length();
        let value = pixel.channel_mut(channel);
        *value = toksvig_roughness(*value, length, power);
    }
}

/// Applies the composite normal chain to `target`, pairing mips from the
/// smallest end. Returns false, leaving `target` untouched, when the
/// first comparable level differs in size.
pub fn apply_composite_texture(
    target: &mut [LinearImage],
    normals: &[LinearImage],
    mode: CompositeTextureMode,
    power: f32,
) -> bool {
    let Some(channel) = mode.channel() else {
        return true;
    };
    let levels = target.len().min(normals.len());
    if levels == 0 {
        warn!("composite texture has no mips");
        return false;
    }

    let first_target = &target[target.len() - levels];
    let first_normal = &normals[normals.len() - levels];
    if (first_target.width, first_target.height, first_target.slices)
        != (first_normal.width, first_normal.height, first_normal.slices)
    {
        warn!(
            target_width = first_target.width,
            target_height = first_target.height,
            normal_width = first_normal.width,
            normal_height = first_normal.height,
            "composite texture size mismatch"
        );
        return false;
    }

    for level in 0..levels {
        let t = target.len() - 1 - level;
        let n = normals.len() - 1 - level;
        apply_level(&mut target[t], &normals[n], channel, power);
    }
    true
}
