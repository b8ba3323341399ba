//! Cache key derivation
//!
//! Every build setting is written in a fixed order as little-endian bytes
//! and hashed together with the source identity and the target format.

use sha2::{Digest, Sha256};

use crate::texture_pipeline::image::LinearColor;
use crate::texture_pipeline::settings::{BuildSettings, ColorAdjustment};

/// Bumped when the key layout itself changes.
const KEY_LAYOUT_VERSION: u32 = 1;

struct KeyWriter {
    hasher: Sha256,
}

impl KeyWriter {
    fn new() -> Self {
        Self { hasher: Sha256::new() }
    }

    fn u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    fn usize(&mut self, value: usize) {
        self.hasher.update((value as u64).to_le_bytes());
    }

    fn f32(&mut self, value: f32) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    fn bool(&mut self, value: bool) {
        self.hasher.update([u8::from(value)]);
    }

    fn str(&mut self, value: &str) {
        self.usize(value.len());
        self.hasher.update(value.as_bytes());
    }

    fn color(&mut self, color: LinearColor) {
        for channel in color.to_array() {
            self.f32(channel);
        }
    }

    fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

fn write_settings(w: &mut KeyWriter, settings: &BuildSettings) {
    // destructured so a new field cannot be left out of the key
    let BuildSettings {
        color_adjustment,
        alpha_coverage_thresholds,
        mip_sharpening,
        sharpen_mip_kernel_size,
        diffuse_convolve_mip_level,
        max_texture_resolution,
        texture_format_name,
        mip_gen_settings,
        cubemap,
        long_lat_source,
        srgb,
        use_legacy_gamma,
        preserve_border,
        border_color_black,
        dither_mip_alpha,
        compute_bokeh_alpha,
        replicate_red,
        replicate_alpha,
        downsample_with_average,
        sharpen_without_color_shift,
        flip_green_channel,
        apply_kernel_to_top_mip,
        renormalize_top_mip,
        compression_no_alpha,
        composite_texture_mode,
        composite_power,
        power_of_two_mode,
        padding_color,
        chroma_key_texture,
        chroma_key_color,
        chroma_key_threshold,
        compression_quality,
        lod_bias,
        streamable,
        top_mip_size: _,
    } = settings;

    let ColorAdjustment {
        brightness,
        brightness_curve,
        saturation,
        vibrance,
        rgb_curve,
        hue,
        min_alpha,
        max_alpha,
    } = *color_adjustment;
    for value in [brightness, brightness_curve, saturation, vibrance, rgb_curve, hue, min_alpha, max_alpha] {
        w.f32(value);
    }

    for threshold in alpha_coverage_thresholds {
        w.f32(*threshold);
    }
    w.f32(*mip_sharpening);
    w.usize(*sharpen_mip_kernel_size);
    w.usize(*diffuse_convolve_mip_level);
    w.usize(*max_texture_resolution);
    w.str(texture_format_name);
    w.u32(*mip_gen_settings as u32);
    for flag in [
        cubemap,
        long_lat_source,
        srgb,
        use_legacy_gamma,
        preserve_border,
        border_color_black,
        dither_mip_alpha,
        compute_bokeh_alpha,
        replicate_red,
        replicate_alpha,
        downsample_with_average,
        sharpen_without_color_shift,
        flip_green_channel,
        apply_kernel_to_top_mip,
        renormalize_top_mip,
        compression_no_alpha,
    ] {
        w.bool(*flag);
    }
    w.u32(*composite_texture_mode as u32);
    w.f32(*composite_power);
    w.u32(*power_of_two_mode as u32);
    w.color(*padding_color);
    w.bool(*chroma_key_texture);
    w.color(*chroma_key_color);
    w.f32(*chroma_key_threshold);
    w.u32(*compression_quality as u32);
    w.u32(*lod_bias);
    w.bool(*streamable);
}

/// Deterministic key suffix for one source, settings and target format.
///
/// `top_mip_size` is derived during the build and does not contribute.
pub fn cache_key_suffix(
    source_content_id: &str,
    settings: &BuildSettings,
    format_name: &str,
    format_version: u16,
) -> String {
    let mut w = KeyWriter::new();
    w.u32(KEY_LAYOUT_VERSION);
    w.str(source_content_id);
    w.str(format_name);
    w.u32(u32::from(format_version));
    write_settings(&mut w, settings);
    format!("{format_name}_{format_version}_{}", w.finish())
}

/// Blob key of a mip stored outside the primary record.
pub fn streamed_mip_key(primary_key: &str, index: usize, width: usize, height: usize) -> String {
    format!("{primary_key}_MIP{index}_{width}x{height}")
}
