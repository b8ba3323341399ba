use crate::texture_pipeline::common::error::{Result, TextureBuildError};
use crate::texture_pipeline::compression::types::{CompressedMip, CompressionCapabilities};
use crate::texture_pipeline::image::LinearImage;
use crate::texture_pipeline::settings::BuildSettings;

/// A family of target formats sharing one encoder.
///
/// Implementations are stateless per call and may be shared across the
/// worker pool.
pub trait TextureCompressor: Send + Sync {
    fn name(&self) -> &str;

    /// Format names accepted in `BuildSettings::texture_format_name`.
    fn supported_formats(&self) -> &[&'static str];

    fn capabilities(&self) -> CompressionCapabilities {
        CompressionCapabilities::default()
    }

    /// Bumped whenever the encoder output changes; part of the cache key.
    fn format_version(&self, _format: &str) -> u16 {
        0
    }

    fn allows_parallel_build(&self) -> bool {
        self.capabilities().allows_parallel_build
    }

    /// Compresses every slice of `image` into the format named by
    /// `settings.texture_format_name`.
    fn compress(&self, image: &LinearImage, settings: &BuildSettings, has_alpha: bool) -> Result<CompressedMip>;
}

/// Shared precondition checks for `compress` implementations.
pub(crate) fn check_request(
    compressor: &dyn TextureCompressor,
    image: &LinearImage,
    settings: &BuildSettings,
) -> Result<()> {
    let format = settings.texture_format_name.as_str();
    if !compressor.supported_formats().contains(&format) {
        return Err(TextureBuildError::UnsupportedFormat(format.to_string()));
    }
    let max = compressor.capabilities().max_texture_dimension;
    if image.width > max || image.height > max {
        return Err(TextureBuildError::DimensionTooLarge {
            width: image.width,
            height: image.height,
            max,
        });
    }
    Ok(())
}
