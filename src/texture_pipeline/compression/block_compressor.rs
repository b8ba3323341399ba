//! BCn block compression through `image_dds`.

use image_dds::{ImageFormat, Mipmaps, Quality, SurfaceRgba8, SurfaceRgba32Float};
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::texture_pipeline::common::error::{Result, TextureBuildError};
use crate::texture_pipeline::compression::compressor::{TextureCompressor, check_request};
use crate::texture_pipeline::compression::types::{CompressedMip, PixelFormat};
use crate::texture_pipeline::image::{ColorSpace, LinearImage, SliceView, encode_u8, quantize_u8};
use crate::texture_pipeline::settings::{BuildSettings, CompressionQuality};

const BLOCK: usize = 4;

/// Row banding used to spread one large mip over the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandConfig {
    /// Texel rows per band, rounded down to whole block rows.
    pub band_rows: usize,
    /// Padded height below which a mip is encoded as a single band.
    pub min_parallel_height: usize,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            band_rows: 64,
            min_parallel_height: 256,
        }
    }
}

/// Texels of one slice, padded to whole blocks.
pub(crate) enum BlockSurface {
    Unorm8(Vec<[u8; 4]>),
    Float(Vec<[f32; 4]>),
}

impl BlockSurface {
    fn encode_rows(&self, width: usize, first_row: usize, rows: usize, format: ImageFormat, quality: Quality) -> Result<Vec<u8>> {
        let range = first_row * width..(first_row + rows) * width;
        let encoded = match self {
            BlockSurface::Unorm8(texels) => SurfaceRgba8 {
                width: width as u32,
                height: rows as u32,
                depth: 1,
                layers: 1,
                mipmaps: 1,
                data: texels[range].as_flattened(),
            }
            .encode(format, quality, Mipmaps::Disabled),
            BlockSurface::Float(texels) => SurfaceRgba32Float {
                width: width as u32,
                height: rows as u32,
                depth: 1,
                layers: 1,
                mipmaps: 1,
                data: texels[range].as_flattened(),
            }
            .encode(format, quality, Mipmaps::Disabled),
        };
        encoded.map(|surface| surface.data).map_err(|e| TextureBuildError::CompressionFailed {
            format: format!("{format:?}"),
            reason: e.to_string(),
        })
    }
}

/// Copies `texels` into a canvas rounded up to whole blocks, repeating the
/// last column and row into the padding.
pub(crate) fn pad_edge_replicate<T: Copy>(texels: &[T], width: usize, height: usize) -> (Vec<T>, usize, usize) {
    let padded_w = width.div_ceil(BLOCK) * BLOCK;
    let padded_h = height.div_ceil(BLOCK) * BLOCK;
    if padded_w == width && padded_h == height {
        return (texels.to_vec(), width, height);
    }

    let mut padded = Vec::with_capacity(padded_w * padded_h);
    for y in 0..padded_h {
        let row = &texels[y.min(height - 1) * width..][..width];
        padded.extend_from_slice(row);
        padded.extend(std::iter::repeat_n(row[width - 1], padded_w - width));
    }
    (padded, padded_w, padded_h)
}

/// Encodes block rows, optionally fanning bands out over rayon.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BandEncoder {
    pub config: BandConfig,
}

impl BandEncoder {
    /// Encodes a padded `width` x `height` surface into `bytes_per_block`
    /// blocks. Full bands run on the pool; the ragged remainder band is
    /// encoded on the calling thread.
    pub fn encode(
        &self,
        surface: &BlockSurface,
        width: usize,
        height: usize,
        format: ImageFormat,
        bytes_per_block: usize,
        quality: Quality,
        parallel: bool,
    ) -> Result<Vec<u8>> {
        let blocks_x = width / BLOCK;
        let blocks_y = height / BLOCK;
        let block_row_bytes = blocks_x * bytes_per_block;
        let band_block_rows = (self.config.band_rows / BLOCK).max(1);
        let full_bands = blocks_y / band_block_rows;

        if !parallel || height < self.config.min_parallel_height || full_bands == 0 {
            return surface.encode_rows(width, 0, height, format, quality);
        }

        trace!(full_bands, band_block_rows, blocks_y, "banded block encode");
        let mut out = vec![0u8; blocks_y * block_row_bytes];
        let (bands, remainder) = out.split_at_mut(full_bands * band_block_rows * block_row_bytes);
        let band_bytes = band_block_rows * block_row_bytes;

        let encode_into = |first_block_row: usize, dst: &mut [u8]| -> Result<()> {
            let rows = dst.len() / block_row_bytes * BLOCK;
            let encoded = surface.encode_rows(width, first_block_row * BLOCK, rows, format, quality)?;
            dst.copy_from_slice(&encoded);
            Ok(())
        };

        let (remainder_result, band_results) = rayon::join(
            || {
                if remainder.is_empty() {
                    Ok(())
                } else {
                    encode_into(full_bands * band_block_rows, remainder)
                }
            },
            || {
                bands
                    .par_chunks_mut(band_bytes)
                    .enumerate()
                    .map(|(band, dst)| encode_into(band * band_block_rows, dst))
                    .collect::<Result<Vec<()>>>()
            },
        );
        remainder_result?;
        band_results?;
        Ok(out)
    }
}

pub(crate) fn image_dds_quality(quality: CompressionQuality) -> Quality {
    match quality {
        CompressionQuality::Fast => Quality::Fast,
        CompressionQuality::Normal => Quality::Normal,
        CompressionQuality::High => Quality::Slow,
    }
}

/// Encodes all slices of `image` through `encoder`, reporting the
/// unpadded (at least one block) size.
pub(crate) fn compress_slices(
    encoder: &BandEncoder,
    image: &LinearImage,
    pixel_format: PixelFormat,
    dds_format: ImageFormat,
    settings: &BuildSettings,
    parallel: bool,
    to_surface: impl Fn(SliceView<'_>) -> BlockSurface,
) -> Result<CompressedMip> {
    let quality = image_dds_quality(settings.compression_quality);
    let mut data = Vec::with_capacity(pixel_format.data_size(image.width, image.height, image.slices));

    for slice in 0..image.slices {
        let surface = to_surface(image.slice(slice));
        let (width, height) = (image.width.div_ceil(BLOCK) * BLOCK, image.height.div_ceil(BLOCK) * BLOCK);
        let encoded = encoder.encode(
            &surface,
            width,
            height,
            dds_format,
            pixel_format.bytes_per_block(),
            quality,
            parallel,
        )?;
        data.extend_from_slice(&encoded);
    }

    Ok(CompressedMip {
        width: image.width.max(BLOCK),
        height: image.height.max(BLOCK),
        slices: image.slices,
        pixel_format,
        data,
    })
}

fn rgba8_surface(view: SliceView<'_>, color_space: ColorSpace) -> BlockSurface {
    let texels: Vec<[u8; 4]> = view
        .pixels
        .iter()
        .map(|c| {
            [
                encode_u8(c.r, color_space),
                encode_u8(c.g, color_space),
                encode_u8(c.b, color_space),
                quantize_u8(c.a),
            ]
        })
        .collect();
    let (padded, _, _) = pad_edge_replicate(&texels, view.width, view.height);
    BlockSurface::Unorm8(padded)
}

fn float_surface(view: SliceView<'_>) -> BlockSurface {
    let texels: Vec<[f32; 4]> = view.pixels.iter().map(|c| [c.r.max(0.0), c.g.max(0.0), c.b.max(0.0), 1.0]).collect();
    let (padded, _, _) = pad_edge_replicate(&texels, view.width, view.height);
    BlockSurface::Float(padded)
}

/// DXT1, DXT5, BC4, BC6H and BC7.
#[derive(Debug, Default)]
pub struct BlockCompressor {
    encoder: BandEncoder,
}

impl BlockCompressor {
    pub fn new(config: BandConfig) -> Self {
        Self {
            encoder: BandEncoder { config },
        }
    }

    fn resolve(format: &str, has_alpha: bool) -> Option<(PixelFormat, ImageFormat)> {
        Some(match format {
            "DXT1" => (PixelFormat::DXT1, ImageFormat::BC1RgbaUnorm),
            "DXT5" => (PixelFormat::DXT5, ImageFormat::BC3RgbaUnorm),
            // picks the alpha-capable layout only when alpha is present
            "AutoDXT" if has_alpha => (PixelFormat::DXT5, ImageFormat::BC3RgbaUnorm),
            "AutoDXT" => (PixelFormat::DXT1, ImageFormat::BC1RgbaUnorm),
            "BC4" => (PixelFormat::BC4, ImageFormat::BC4RUnorm),
            "BC6H" => (PixelFormat::BC6H, ImageFormat::BC6hRgbUfloat),
            "BC7" => (PixelFormat::BC7, ImageFormat::BC7RgbaUnorm),
            _ => return None,
        })
    }
}

impl TextureCompressor for BlockCompressor {
    fn name(&self) -> &str {
        "block"
    }

    fn supported_formats(&self) -> &[&'static str] {
        &["DXT1", "DXT5", "AutoDXT", "BC4", "BC6H", "BC7"]
    }

    fn format_version(&self, _format: &str) -> u16 {
        1
    }

    #[instrument(skip(self, image, settings), fields(format = %settings.texture_format_name))]
    fn compress(&self, image: &LinearImage, settings: &BuildSettings, has_alpha: bool) -> Result<CompressedMip> {
        check_request(self, image, settings)?;
        let format = settings.texture_format_name.as_str();
        let (pixel_format, dds_format) = Self::resolve(format, has_alpha)
            .ok_or_else(|| TextureBuildError::UnsupportedFormat(format.to_string()))?;
        debug!(
            width = image.width,
            height = image.height,
            slices = image.slices,
            ?pixel_format,
            "block compressing"
        );

        let color_space = match pixel_format {
            PixelFormat::BC4 => ColorSpace::Linear,
            _ => settings.output_color_space(),
        };
        let parallel = self.allows_parallel_build();
        if pixel_format == PixelFormat::BC6H {
            compress_slices(&self.encoder, image, pixel_format, dds_format, settings, parallel, float_surface)
        } else {
            compress_slices(&self.encoder, image, pixel_format, dds_format, settings, parallel, |view| {
                rgba8_surface(view, color_space)
            })
        }
    }
}
