//! Format and gamma conversion between [`Image`] and [`LinearImage`].
//!
//! Conversions always produce a new buffer; the source is never touched.

use half::f16;

use super::types::{ColorSpace, Image, LinearColor, LinearImage, RawFormat};

#[inline]
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
pub fn linear_to_srgb(value: f32) -> f32 {
    let value = value.clamp(0.0, 1.0);
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn decode_u8(value: u8, color_space: ColorSpace) -> f32 {
    let v = value as f32 / 255.0;
    match color_space {
        ColorSpace::Linear => v,
        ColorSpace::Srgb => srgb_to_linear(v),
        ColorSpace::Pow22 => v.powf(2.2),
    }
}

#[inline]
pub(crate) fn quantize_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[inline]
pub(crate) fn encode_u8(value: f32, color_space: ColorSpace) -> u8 {
    let v = match color_space {
        ColorSpace::Linear => value,
        ColorSpace::Srgb => linear_to_srgb(value),
        ColorSpace::Pow22 => value.clamp(0.0, 1.0).powf(1.0 / 2.2),
    };
    quantize_u8(v)
}

/// Shared-exponent decode; an exponent byte of zero is black.
fn decode_rgbe(b: u8, g: u8, r: u8, e: u8) -> LinearColor {
    if e == 0 {
        return LinearColor::BLACK;
    }
    let scale = (1.0f32 / 255.0) * 2f32.powi(e as i32 - 128);
    LinearColor::new(r as f32 * scale, g as f32 * scale, b as f32 * scale, 1.0)
}

fn encode_rgbe(color: LinearColor) -> [u8; 4] {
    let primary = color.r.max(color.g).max(color.b);
    if primary < 1e-32 {
        return [0, 0, 0, 0];
    }
    // frexp: primary = mantissa * 2^exponent with mantissa in [0.5, 1)
    let mut exponent = primary.log2().floor() as i32 + 1;
    let mut mantissa = primary / 2f32.powi(exponent);
    if mantissa >= 1.0 {
        mantissa *= 0.5;
        exponent += 1;
    }
    let scale = mantissa / primary * 255.0;
    let channel = |c: f32| (c.max(0.0) * scale).min(255.0) as u8;
    [
        channel(color.b),
        channel(color.g),
        channel(color.r),
        (exponent.clamp(-128, 127) + 128) as u8,
    ]
}

impl Image {
    /// Converts to linear RGBA32F, removing the transfer function.
    pub fn to_linear(&self) -> LinearImage {
        let cs = self.color_space;
        let pixels: Vec<LinearColor> = match self.format {
            RawFormat::G8 => self
                .data
                .iter()
                .map(|&v| {
                    let l = decode_u8(v, cs);
                    LinearColor::new(l, l, l, 1.0)
                })
                .collect(),
            RawFormat::Bgra8 => self
                .data
                .chunks_exact(4)
                .map(|p| {
                    LinearColor::new(
                        decode_u8(p[2], cs),
                        decode_u8(p[1], cs),
                        decode_u8(p[0], cs),
                        p[3] as f32 / 255.0,
                    )
                })
                .collect(),
            RawFormat::Bgre8 => self
                .data
                .chunks_exact(4)
                .map(|p| decode_rgbe(p[0], p[1], p[2], p[3]))
                .collect(),
            RawFormat::Rgba16 => self
                .data
                .chunks_exact(8)
                .map(|p| {
                    let c = |i: usize| u16::from_le_bytes([p[i], p[i + 1]]) as f32 / 65535.0;
                    LinearColor::new(c(0), c(2), c(4), c(6))
                })
                .collect(),
            RawFormat::Rgba16F => self
                .data
                .chunks_exact(8)
                .map(|p| {
                    let c = |i: usize| f16::from_le_bytes([p[i], p[i + 1]]).to_f32();
                    LinearColor::new(c(0), c(2), c(4), c(6))
                })
                .collect(),
            RawFormat::Rgba32F => self
                .data
                .chunks_exact(16)
                .map(|p| {
                    let c = |i: usize| f32::from_le_bytes([p[i], p[i + 1], p[i + 2], p[i + 3]]);
                    LinearColor::new(c(0), c(4), c(8), c(12))
                })
                .collect(),
        };

        LinearImage::from_pixels(self.width, self.height, self.slices, pixels)
    }
}

impl LinearImage {
    /// Converts to `format`, applying `color_space` to 8-bit formats.
    pub fn to_image(&self, format: RawFormat, color_space: ColorSpace) -> Image {
        let mut data = Vec::with_capacity(self.pixels.len() * format.bytes_per_pixel());
        for c in &self.pixels {
            match format {
                RawFormat::G8 => data.push(encode_u8(c.r, color_space)),
                RawFormat::Bgra8 => data.extend_from_slice(&[
                    encode_u8(c.b, color_space),
                    encode_u8(c.g, color_space),
                    encode_u8(c.r, color_space),
                    quantize_u8(c.a),
                ]),
                RawFormat::Bgre8 => data.extend_from_slice(&encode_rgbe(*c)),
                RawFormat::Rgba16 => {
                    for v in c.to_array() {
                        let q = (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
                        data.extend_from_slice(&q.to_le_bytes());
                    }
                }
                RawFormat::Rgba16F => {
                    for v in c.to_array() {
                        data.extend_from_slice(&f16::from_f32(v).to_le_bytes());
                    }
                }
                RawFormat::Rgba32F => {
                    for v in c.to_array() {
                        data.extend_from_slice(&v.to_le_bytes());
                    }
                }
            }
        }

        let color_space = match format {
            RawFormat::G8 | RawFormat::Bgra8 => color_space,
            _ => ColorSpace::Linear,
        };
        Image {
            width: self.width,
            height: self.height,
            slices: self.slices,
            format,
            color_space,
            data,
        }
    }
}
