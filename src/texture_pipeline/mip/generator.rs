//! Mip chain generation for 2D and array images.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::kernel::SeparableKernel2D;
use crate::texture_pipeline::image::{LinearColor, LinearImage, SliceView};
use crate::texture_pipeline::settings::BuildSettings;

const COVERAGE_TOLERANCE: f32 = 1e-4;
const ALPHA_SCALE_ITERATIONS: usize = 8;
const MAX_ALPHA_SCALE: f32 = 4.0;

const DITHER_ALPHA_THRESHOLD: f32 = 5.0 / 255.0;
const DITHER_MIN_ALPHA: f32 = 85.0 / 255.0;
const DITHER_MAX_ALPHA: f32 = 1.0;

/// How out-of-range source lookups are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Wrap,
    Clamp,
    /// Transparent black outside the image.
    BorderBlack,
}

impl AddressMode {
    pub fn for_settings(settings: &BuildSettings) -> Self {
        match (settings.preserve_border, settings.border_color_black) {
            (false, _) => AddressMode::Wrap,
            (true, false) => AddressMode::Clamp,
            (true, true) => AddressMode::BorderBlack,
        }
    }
}

/// Reads `(x, y)` from `view`, resolving out-of-range coordinates with `mode`.
#[inline]
pub fn lookup_source_mip(view: &SliceView<'_>, mode: AddressMode, x: i64, y: i64) -> LinearColor {
    let w = view.width as i64;
    let h = view.height as i64;
    let (x, y) = match mode {
        AddressMode::Wrap => (x.rem_euclid(w), y.rem_euclid(h)),
        AddressMode::Clamp => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
        AddressMode::BorderBlack => {
            if x < 0 || x >= w || y < 0 || y >= h {
                return LinearColor::TRANSPARENT;
            }
            (x, y)
        }
    };
    view.at(x as usize, y as usize)
}

/// Fraction of texels whose scaled channel value passes each threshold.
/// Channels with a zero threshold report zero coverage.
pub fn compute_alpha_coverage(thresholds: [f32; 4], scales: [f32; 4], pixels: &[LinearColor]) -> [f32; 4] {
    let mut covered = [0usize; 4];
    for pixel in pixels {
        for c in 0..4 {
            if thresholds[c] != 0.0 && pixel.channel(c) * scales[c] >= thresholds[c] {
                covered[c] += 1;
            }
        }
    }
    let count = pixels.len().max(1) as f32;
    covered.map(|n| n as f32 / count)
}

/// Binary-searches a per-channel scale in `[0, 4]` that reproduces
/// `target` coverage on `pixels`.
pub fn compute_alpha_scale(target: [f32; 4], thresholds: [f32; 4], pixels: &[LinearColor]) -> [f32; 4] {
    let mut min_scale = [0.0f32; 4];
    let mut max_scale = [MAX_ALPHA_SCALE; 4];
    let mut scale = [1.0f32; 4];

    for _ in 0..ALPHA_SCALE_ITERATIONS {
        let coverage = compute_alpha_coverage(thresholds, scale, pixels);

        for c in 0..4 {
            if thresholds[c] == 0.0 || (coverage[c] - target[c]).abs() < COVERAGE_TOLERANCE {
                continue;
            }
            if coverage[c] < target[c] {
                min_scale[c] = scale[c];
            } else {
                max_scale[c] = scale[c];
            }
            scale[c] = (min_scale[c] + max_scale[c]) * 0.5;
        }

        if (0..4).all(|c| (coverage[c] - target[c]).abs() < COVERAGE_TOLERANCE) {
            break;
        }
    }
    scale
}

/// Filter parameters shared by every level of one chain.
#[derive(Debug, Clone, Copy)]
pub struct MipFilterParams {
    pub address_mode: AddressMode,
    pub dither_alpha: bool,
    pub sharpen_without_color_shift: bool,
    pub alpha_thresholds: [f32; 4],
    /// Coverage measured on the top mip; ignored when all thresholds are 0.
    pub alpha_coverages: [f32; 4],
}

impl MipFilterParams {
    pub fn from_settings(settings: &BuildSettings) -> Self {
        Self {
            address_mode: AddressMode::for_settings(settings),
            dither_alpha: settings.dither_mip_alpha,
            sharpen_without_color_shift: settings.sharpen_without_color_shift,
            alpha_thresholds: settings.alpha_coverage_thresholds,
            alpha_coverages: [0.0; 4],
        }
    }

    fn preserves_coverage(&self) -> bool {
        self.alpha_thresholds.iter().any(|&t| t != 0.0)
    }
}

/// Filters `src` into `dst` (`dst_width` x `dst_height`), sampling the
/// kernel centered at `dst * scale_factor`.
pub fn generate_sharpened_mip(
    src: SliceView<'_>,
    dst: &mut [LinearColor],
    dst_width: usize,
    dst_height: usize,
    kernel: &SeparableKernel2D,
    scale_factor: usize,
    params: &MipFilterParams,
) {
    debug_assert_eq!(dst.len(), dst_width * dst_height);
    // odd source extents drop their trailing texel
    debug_assert!(src.width >= dst_width * scale_factor || dst_width == 1);
    debug_assert!(src.height >= dst_height * scale_factor || dst_height == 1);

    let mode = params.address_mode;
    let size = kernel.size();
    let center = (size / 2) as i64 - 1;

    let filter_at = |sx: i64, sy: i64| -> LinearColor {
        let mut sum = LinearColor::TRANSPARENT;
        for ky in 0..size {
            for kx in 0..size {
                let sample = lookup_source_mip(&src, mode, sx + kx as i64 - center, sy + ky as i64 - center);
                sum += kernel.weight(kx, ky) * sample;
            }
        }
        sum
    };

    for dy in 0..dst_height {
        for dx in 0..dst_width {
            let sx = (dx * scale_factor) as i64;
            let sy = (dy * scale_factor) as i64;

            let sharpened = filter_at(sx, sy);
            let color = if params.sharpen_without_color_shift {
                let boxed = (lookup_source_mip(&src, mode, sx, sy)
                    + lookup_source_mip(&src, mode, sx + 1, sy)
                    + lookup_source_mip(&src, mode, sx, sy + 1)
                    + lookup_source_mip(&src, mode, sx + 1, sy + 1))
                    * 0.25;
                let old_luminance = boxed.luminance();
                let mut color = boxed;
                if old_luminance > 0.001 {
                    let factor = sharpened.luminance() / old_luminance;
                    color.r *= factor;
                    color.g *= factor;
                    color.b *= factor;
                }
                color.a = sharpened.a;
                color
            } else {
                sharpened
            };
            dst[dx + dy * dst_width] = color;
        }
    }

    if params.preserves_coverage() {
        let scale = compute_alpha_scale(params.alpha_coverages, params.alpha_thresholds, dst);
        trace!(?scale, "alpha coverage scale");
        for pixel in dst.iter_mut() {
            for (c, s) in scale.iter().enumerate() {
                *pixel.channel_mut(c) *= s;
            }
        }
    }

    if params.dither_alpha {
        // fixed seed keeps builds reproducible
        let mut rng = StdRng::seed_from_u64(0);
        for pixel in dst.iter_mut() {
            if pixel.a > DITHER_ALPHA_THRESHOLD {
                let t: f32 = rng.random();
                pixel.a = DITHER_MIN_ALPHA + (DITHER_MAX_ALPHA - DITHER_MIN_ALPHA) * t;
            }
        }
    }
}

/// Rewrites only the outermost ring of `dst` by averaging the source border
/// texels under each destination texel. Interior texels are left alone.
pub fn generate_mip_border(src: SliceView<'_>, dst: &mut [LinearColor], dst_width: usize, dst_height: usize) {
    debug_assert_eq!(dst.len(), dst_width * dst_height);
    let src_w = src.width as i64;
    let src_h = src.height as i64;

    let mut redraw = |dx: usize, dy: usize| {
        let mut sum = LinearColor::TRANSPARENT;
        let mut weight = 0.0f32;
        for ky in 0..2i64 {
            for kx in 0..2i64 {
                let sx = (dx * 2) as i64 + kx;
                let sy = (dy * 2) as i64 + ky;
                let on_border = sx == 0 || sx == src_w - 1 || sy == 0 || sy == src_h - 1;
                if on_border {
                    sum += lookup_source_mip(&src, AddressMode::Wrap, sx, sy);
                    weight += 1.0;
                }
            }
        }
        if weight > 0.0 {
            dst[dx + dy * dst_width] = sum / weight;
        }
    };

    for dy in 0..dst_height {
        if dy == 0 || dy + 1 == dst_height {
            for dx in 0..dst_width {
                redraw(dx, dy);
            }
        } else {
            redraw(0, dy);
            if dst_width > 1 {
                redraw(dst_width - 1, dy);
            }
        }
    }
}

/// Kernel edge used by [`generate_top_mip`]: half the chain kernel, even, at least 2.
pub fn top_mip_kernel_size(settings: &BuildSettings) -> usize {
    (settings.sharpen_mip_kernel_size / 2).max(2).next_multiple_of(2)
}

/// Applies the configured kernel at full resolution.
pub fn generate_top_mip(src: &LinearImage, settings: &BuildSettings) -> LinearImage {
    let kernel = SeparableKernel2D::with_sharpening(top_mip_kernel_size(settings), settings.mip_sharpening);
    let params = MipFilterParams {
        alpha_thresholds: [0.0; 4],
        ..MipFilterParams::from_settings(settings)
    };

    let mut dst = LinearImage::new(src.width, src.height, src.slices);
    for slice in 0..src.slices {
        generate_sharpened_mip(
            src.slice(slice),
            dst.slice_pixels_mut(slice),
            src.width,
            src.height,
            &kernel,
            1,
            &params,
        );
    }
    dst
}

/// Next level down: each axis halves and never drops below 1.
pub fn next_mip_size(width: usize, height: usize) -> (usize, usize) {
    ((width >> 1).max(1), (height >> 1).max(1))
}

/// Number of levels in a full chain for `width` x `height`, base included.
pub fn full_chain_length(width: usize, height: usize) -> usize {
    let largest = width.max(height).max(1);
    largest.ilog2() as usize + 1
}

/// Generates up to `depth` levels below `base`, stopping at 1x1.
/// The result excludes `base`; pass `usize::MAX` for a full chain.
pub fn generate_mip_chain(settings: &BuildSettings, base: &LinearImage, depth: usize) -> Vec<LinearImage> {
    let slices = base.slices;
    let mut chain = Vec::new();
    if depth == 0 || (base.width == 1 && base.height == 1) {
        return chain;
    }

    let kernel_average = SeparableKernel2D::with_sharpening(2, 0.0);
    let kernel_downsample =
        SeparableKernel2D::with_sharpening(settings.sharpen_mip_kernel_size, settings.mip_sharpening);

    let mut params = MipFilterParams::from_settings(settings);
    let redraw_border = settings.preserve_border && !settings.border_color_black;
    if params.preserves_coverage() {
        params.alpha_coverages = compute_alpha_coverage(params.alpha_thresholds, [1.0; 4], base.slice(0).pixels);
        debug!(coverage = ?params.alpha_coverages, "preserving alpha coverage");
    }

    let mut source = base.clone();
    let mut remaining = depth;
    while remaining > 0 {
        let (dst_width, dst_height) = next_mip_size(source.width, source.height);
        let mut dest = LinearImage::new(dst_width, dst_height, slices);
        let mut next_source = if settings.downsample_with_average {
            Some(LinearImage::new(dst_width, dst_height, slices))
        } else {
            None
        };

        for slice in 0..slices {
            generate_sharpened_mip(
                source.slice(slice),
                dest.slice_pixels_mut(slice),
                dst_width,
                dst_height,
                &kernel_downsample,
                2,
                &params,
            );
            if let Some(averaged) = next_source.as_mut() {
                generate_sharpened_mip(
                    source.slice(slice),
                    averaged.slice_pixels_mut(slice),
                    dst_width,
                    dst_height,
                    &kernel_average,
                    2,
                    &params,
                );
            }
        }

        let mut next_source = next_source.unwrap_or_else(|| dest.clone());

        if redraw_border {
            for slice in 0..slices {
                generate_mip_border(source.slice(slice), dest.slice_pixels_mut(slice), dst_width, dst_height);
                generate_mip_border(
                    source.slice(slice),
                    next_source.slice_pixels_mut(slice),
                    dst_width,
                    dst_height,
                );
            }
        }

        trace!(width = dst_width, height = dst_height, "generated mip");
        chain.push(dest);
        remaining -= 1;

        if dst_width == 1 && dst_height == 1 {
            break;
        }
        std::mem::swap(&mut source, &mut next_source);
    }

    chain
}
