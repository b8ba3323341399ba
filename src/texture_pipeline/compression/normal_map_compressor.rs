use image_dds::ImageFormat;
use tracing::{debug, instrument};

use crate::texture_pipeline::common::error::{Result, TextureBuildError};
use crate::texture_pipeline::compression::block_compressor::{
    BandConfig, BandEncoder, BlockSurface, compress_slices, pad_edge_replicate,
};
use crate::texture_pipeline::compression::compressor::{TextureCompressor, check_request};
use crate::texture_pipeline::compression::types::{CompressedMip, PixelFormat};
use crate::texture_pipeline::image::{LinearImage, SliceView, quantize_u8};
use crate::texture_pipeline::processing::channels::decode_normal;
use crate::texture_pipeline::settings::BuildSettings;

/// Where the tangent-space XY pair lands in the encoded texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NormalLayout {
    /// X in red, Y in green.
    TwoChannel,
    /// X in alpha, Y in green; red and blue are constant.
    SwizzledDxt5,
}

/// Renormalizes each texel and packs only the X and Y components.
///
/// Constant unused channels leave the whole block budget to X and Y.
fn normal_surface(view: SliceView<'_>, layout: NormalLayout) -> BlockSurface {
    let texels: Vec<[u8; 4]> = view
        .pixels
        .iter()
        .map(|c| {
            let n = decode_normal(c).normalize_or_zero();
            let x = quantize_u8(n.x * 0.5 + 0.5);
            let y = quantize_u8(n.y * 0.5 + 0.5);
            match layout {
                NormalLayout::TwoChannel => [x, y, 0, 255],
                NormalLayout::SwizzledDxt5 => [0, y, 0, x],
            }
        })
        .collect();
    let (padded, _, _) = pad_edge_replicate(&texels, view.width, view.height);
    BlockSurface::Unorm8(padded)
}

/// Two-channel normal map formats: BC5 and swizzled DXT5.
#[derive(Debug, Default)]
pub struct NormalMapCompressor {
    encoder: BandEncoder,
}

impl NormalMapCompressor {
    pub fn new(config: BandConfig) -> Self {
        Self {
            encoder: BandEncoder { config },
        }
    }
}

impl TextureCompressor for NormalMapCompressor {
    fn name(&self) -> &str {
        "normal_map"
    }

    fn supported_formats(&self) -> &[&'static str] {
        &["BC5", "DXT5n"]
    }

    fn format_version(&self, _format: &str) -> u16 {
        1
    }

    #[instrument(skip(self, image, settings, _has_alpha), fields(format = %settings.texture_format_name))]
    fn compress(&self, image: &LinearImage, settings: &BuildSettings, _has_alpha: bool) -> Result<CompressedMip> {
        check_request(self, image, settings)?;
        let (pixel_format, dds_format, layout) = match settings.texture_format_name.as_str() {
            "BC5" => (PixelFormat::BC5, ImageFormat::BC5RgUnorm, NormalLayout::TwoChannel),
            "DXT5n" => (PixelFormat::DXT5, ImageFormat::BC3RgbaUnorm, NormalLayout::SwizzledDxt5),
            other => return Err(TextureBuildError::UnsupportedFormat(other.to_string())),
        };
        debug!(width = image.width, height = image.height, ?layout, "compressing normal map");

        compress_slices(
            &self.encoder,
            image,
            pixel_format,
            dds_format,
            settings,
            self.allows_parallel_build(),
            |view| normal_surface(view, layout),
        )
    }
}
