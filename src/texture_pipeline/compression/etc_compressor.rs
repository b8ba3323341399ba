//! ETC1 encoder, individual mode only.
//!
//! Each 4x4 block is split into two sub-blocks (side by side or stacked),
//! each with a 4-bit-per-channel base color and one of eight modifier
//! tables. Both split orientations are tried and the lower weighted error
//! wins.

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::texture_pipeline::common::error::Result;
use crate::texture_pipeline::compression::compressor::{TextureCompressor, check_request};
use crate::texture_pipeline::compression::types::{CompressedMip, PixelFormat};
use crate::texture_pipeline::compression::uncompressed_compressor::encode_uncompressed;
use crate::texture_pipeline::image::{LinearImage, SliceView, encode_u8};
use crate::texture_pipeline::settings::BuildSettings;

const MODIFIER_TABLES: [[i32; 2]; 8] = [
    [2, 8],
    [5, 17],
    [9, 29],
    [13, 42],
    [18, 60],
    [24, 80],
    [33, 106],
    [47, 183],
];

const CHANNEL_WEIGHTS: [i32; 3] = [3, 6, 1];

type Rgb = [u8; 3];

/// Modifier for a 2-bit pixel index: 0 +a, 1 +b, 2 -a, 3 -b.
fn modifier(table: usize, index: usize) -> i32 {
    let [a, b] = MODIFIER_TABLES[table];
    match index {
        0 => a,
        1 => b,
        2 => -a,
        _ => -b,
    }
}

fn weighted_error(base: [i32; 3], delta: i32, texel: Rgb) -> i32 {
    (0..3)
        .map(|c| {
            let d = (base[c] + delta).clamp(0, 255) - texel[c] as i32;
            CHANNEL_WEIGHTS[c] * d * d
        })
        .sum()
}

struct SubBlockFit {
    base: [u8; 3],
    table: usize,
    /// 2-bit index per member texel, in member order.
    indices: [usize; 8],
    error: i32,
}

/// Quantizes the average color to 4 bits and picks the table with the
/// lowest error.
fn fit_sub_block(texels: &[Rgb; 8]) -> SubBlockFit {
    let mut sum = [0u32; 3];
    for texel in texels {
        for c in 0..3 {
            sum[c] += texel[c] as u32;
        }
    }
    let base4 = sum.map(|s| ((s as f32 / 8.0) * 15.0 / 255.0).round() as u8);
    let expanded = base4.map(|v| (v << 4 | v) as i32);

    let mut best = SubBlockFit {
        base: base4,
        table: 0,
        indices: [0; 8],
        error: i32::MAX,
    };
    for table in 0..MODIFIER_TABLES.len() {
        let mut indices = [0usize; 8];
        let mut error = 0;
        for (slot, texel) in texels.iter().enumerate() {
            let (index, texel_error) = (0..4)
                .map(|index| (index, weighted_error(expanded, modifier(table, index), *texel)))
                .min_by_key(|&(_, e)| e)
                .unwrap_or((0, 0));
            indices[slot] = index;
            error += texel_error;
        }
        if error < best.error {
            best = SubBlockFit {
                base: base4,
                table,
                indices,
                error,
            };
        }
    }
    best
}

/// Texel coordinates of each sub-block for a split orientation.
fn sub_block_members(flip: bool) -> [[(usize, usize); 8]; 2] {
    let mut members = [[(0, 0); 8]; 2];
    let mut counts = [0usize; 2];
    for y in 0..4 {
        for x in 0..4 {
            let half = if flip { usize::from(y >= 2) } else { usize::from(x >= 2) };
            members[half][counts[half]] = (x, y);
            counts[half] += 1;
        }
    }
    members
}

/// Encodes one 4x4 block of RGB texels, indexed `[y][x]`.
pub fn encode_etc1_block(block: &[[Rgb; 4]; 4]) -> [u8; 8] {
    let mut best: Option<(i32, u64)> = None;

    for flip in [false, true] {
        let members = sub_block_members(flip);
        let fits = members.map(|coords| fit_sub_block(&coords.map(|(x, y)| block[y][x])));
        let error = fits[0].error + fits[1].error;
        if best.is_some_and(|(e, _)| e <= error) {
            continue;
        }

        let mut bits = 0u64;
        for c in 0..3 {
            bits |= (fits[0].base[c] as u64) << (60 - 8 * c);
            bits |= (fits[1].base[c] as u64) << (56 - 8 * c);
        }
        bits |= (fits[0].table as u64) << 37;
        bits |= (fits[1].table as u64) << 34;
        bits |= u64::from(flip) << 32;

        for (fit, coords) in fits.iter().zip(&members) {
            for (&index, &(x, y)) in fit.indices.iter().zip(coords) {
                let j = x * 4 + y;
                bits |= ((index as u64 >> 1) & 1) << (16 + j);
                bits |= (index as u64 & 1) << j;
            }
        }
        best = Some((error, bits));
    }

    best.map(|(_, bits)| bits).unwrap_or(0).to_be_bytes()
}

fn encode_slice(view: SliceView<'_>, settings: &BuildSettings, parallel: bool) -> Vec<u8> {
    let color_space = settings.output_color_space();
    let blocks_x = view.width.div_ceil(4);
    let blocks_y = view.height.div_ceil(4);
    let mut out = vec![0u8; blocks_x * blocks_y * 8];

    let encode_row = |(by, row): (usize, &mut [u8])| {
        for bx in 0..blocks_x {
            let mut block = [[[0u8; 3]; 4]; 4];
            for (y, block_row) in block.iter_mut().enumerate() {
                for (x, texel) in block_row.iter_mut().enumerate() {
                    let c = view.at((bx * 4 + x).min(view.width - 1), (by * 4 + y).min(view.height - 1));
                    *texel = [
                        encode_u8(c.r, color_space),
                        encode_u8(c.g, color_space),
                        encode_u8(c.b, color_space),
                    ];
                }
            }
            row[bx * 8..][..8].copy_from_slice(&encode_etc1_block(&block));
        }
    };

    if parallel {
        out.par_chunks_mut(blocks_x * 8).enumerate().for_each(encode_row);
    } else {
        out.chunks_mut(blocks_x * 8).enumerate().for_each(encode_row);
    }
    out
}

/// ETC1 for opaque textures; textures with alpha fall back to RGBA8.
#[derive(Debug, Default)]
pub struct EtcCompressor;

impl TextureCompressor for EtcCompressor {
    fn name(&self) -> &str {
        "etc"
    }

    fn supported_formats(&self) -> &[&'static str] {
        &["ETC1"]
    }

    fn format_version(&self, _format: &str) -> u16 {
        1
    }

    #[instrument(skip(self, image, settings))]
    fn compress(&self, image: &LinearImage, settings: &BuildSettings, has_alpha: bool) -> Result<CompressedMip> {
        check_request(self, image, settings)?;
        if has_alpha {
            warn!(
                width = image.width,
                height = image.height,
                "ETC1 has no alpha channel, storing R8G8B8A8"
            );
            return encode_uncompressed(image, PixelFormat::R8G8B8A8, settings.output_color_space());
        }
        debug!(width = image.width, height = image.height, "compressing ETC1");

        let parallel = self.allows_parallel_build();
        let mut data = Vec::with_capacity(PixelFormat::ETC1.data_size(image.width, image.height, image.slices));
        for slice in 0..image.slices {
            data.extend_from_slice(&encode_slice(image.slice(slice), settings, parallel));
        }

        Ok(CompressedMip {
            width: image.width.max(4),
            height: image.height.max(4),
            slices: image.slices,
            pixel_format: PixelFormat::ETC1,
            data,
        })
    }
}
