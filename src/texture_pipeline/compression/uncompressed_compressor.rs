use half::f16;
use tracing::{debug, instrument};

use crate::texture_pipeline::common::error::{Result, TextureBuildError};
use crate::texture_pipeline::compression::compressor::{TextureCompressor, check_request};
use crate::texture_pipeline::compression::types::{CompressedMip, PixelFormat};
use crate::texture_pipeline::image::{ColorSpace, LinearImage, encode_u8, quantize_u8};
use crate::texture_pipeline::settings::BuildSettings;

fn snorm8(value: f32) -> u8 {
    ((value * 2.0 - 1.0).clamp(-1.0, 1.0) * 127.0).round() as i8 as u8
}

/// Writes every texel of `image` in `pixel_format`. 8-bit color channels
/// use `color_space`; alpha and wide formats stay linear.
pub(crate) fn encode_uncompressed(
    image: &LinearImage,
    pixel_format: PixelFormat,
    color_space: ColorSpace,
) -> Result<CompressedMip> {
    let mut data = Vec::with_capacity(pixel_format.data_size(image.width, image.height, image.slices));
    for c in &image.pixels {
        match pixel_format {
            PixelFormat::B8G8R8A8 => data.extend_from_slice(&[
                encode_u8(c.b, color_space),
                encode_u8(c.g, color_space),
                encode_u8(c.r, color_space),
                quantize_u8(c.a),
            ]),
            PixelFormat::R8G8B8A8 => data.extend_from_slice(&[
                encode_u8(c.r, color_space),
                encode_u8(c.g, color_space),
                encode_u8(c.b, color_space),
                quantize_u8(c.a),
            ]),
            PixelFormat::G8 => data.push(encode_u8(c.r, color_space)),
            PixelFormat::G16 => {
                let v = (c.r.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
                data.extend_from_slice(&v.to_le_bytes());
            }
            PixelFormat::FloatRGBA => {
                for v in c.to_array() {
                    data.extend_from_slice(&f16::from_f32(v).to_le_bytes());
                }
            }
            PixelFormat::A32B32G32R32F => {
                for v in c.to_array() {
                    data.extend_from_slice(&v.to_le_bytes());
                }
            }
            PixelFormat::V8U8 => data.extend_from_slice(&[snorm8(c.r), snorm8(c.g)]),
            other => {
                return Err(TextureBuildError::UnsupportedFormat(format!("{other:?}")));
            }
        }
    }

    Ok(CompressedMip {
        width: image.width,
        height: image.height,
        slices: image.slices,
        pixel_format,
        data,
    })
}

/// Plain per-texel formats.
#[derive(Debug, Default)]
pub struct UncompressedCompressor;

impl UncompressedCompressor {
    fn resolve(format: &str) -> Option<PixelFormat> {
        Some(match format {
            "BGRA8" => PixelFormat::B8G8R8A8,
            "RGBA8" => PixelFormat::R8G8B8A8,
            "G8" => PixelFormat::G8,
            "G16" => PixelFormat::G16,
            "RGBA16F" => PixelFormat::FloatRGBA,
            "RGBA32F" => PixelFormat::A32B32G32R32F,
            "V8U8" => PixelFormat::V8U8,
            _ => return None,
        })
    }
}

impl TextureCompressor for UncompressedCompressor {
    fn name(&self) -> &str {
        "uncompressed"
    }

    fn supported_formats(&self) -> &[&'static str] {
        &["BGRA8", "RGBA8", "G8", "G16", "RGBA16F", "RGBA32F", "V8U8"]
    }

    #[instrument(skip(self, image, settings, _has_alpha))]
    fn compress(&self, image: &LinearImage, settings: &BuildSettings, _has_alpha: bool) -> Result<CompressedMip> {
        check_request(self, image, settings)?;
        let format = settings.texture_format_name.as_str();
        let pixel_format =
            Self::resolve(format).ok_or_else(|| TextureBuildError::UnsupportedFormat(format.to_string()))?;
        debug!(width = image.width, height = image.height, ?pixel_format, "encoding uncompressed");

        encode_uncompressed(image, pixel_format, settings.output_color_space())
    }
}
