use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::texture_pipeline::{
    build::PipelineConfig,
    common::{PipelineTimings, Result, TextureBuildError},
    compression::{CompressedMip, FormatRegistry, TextureCompressor},
    cubemap::{CUBE_FACES, generate_angular_filtered_mips, generate_base_cube_mip, long_lat_cube_extent},
    image::{Image, LinearImage},
    mip::{SeparableKernel2D, generate_mip_chain, generate_top_mip, top_mip_kernel_size},
    processing::{
        adjust_image_colors, apply_composite_texture, compute_bokeh_alpha, detect_alpha_channel, flip_green_channel,
        normalize_mip, pad_to_power_of_two, replicate_alpha_channel, replicate_red_channel,
    },
    settings::{BuildSettings, CompositeTextureMode, MipGenSettings},
};

fn ceil_log2(n: usize) -> usize {
    n.max(1).next_power_of_two().trailing_zeros() as usize
}

/// Rejects sharpening kernels the mip filters cannot build.
fn check_kernels(settings: &BuildSettings) -> Result<()> {
    let chain_ok = SeparableKernel2D::supports(settings.sharpen_mip_kernel_size, settings.mip_sharpening);
    let top_ok = !settings.apply_kernel_to_top_mip
        || SeparableKernel2D::supports(top_mip_kernel_size(settings), settings.mip_sharpening);
    if chain_ok && top_ok {
        Ok(())
    } else {
        Err(TextureBuildError::InvalidSettings(format!(
            "sharpening kernel size {} with sharpening {}",
            settings.sharpen_mip_kernel_size, settings.mip_sharpening
        )))
    }
}

/// Builds full compressed mip chains from source mips.
pub struct TextureBuildPipeline {
    registry: Arc<FormatRegistry>,
    config: PipelineConfig,
}

impl TextureBuildPipeline {
    /// Pipeline over every built-in compressor.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            registry: Arc::new(FormatRegistry::with_defaults(config.band_config())),
            config,
        }
    }

    pub fn with_custom(registry: Arc<FormatRegistry>, config: PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// Resolves the compressor for `settings`, or `UnsupportedFormat`.
    pub fn compressor_for(&self, settings: &BuildSettings) -> Result<Arc<dyn TextureCompressor>> {
        self.registry
            .lookup(&settings.texture_format_name)
            .ok_or_else(|| TextureBuildError::UnsupportedFormat(settings.texture_format_name.clone()))
    }

    /// Builds and compresses every output mip of a texture.
    ///
    /// The build either returns all mips, largest first, or fails as a
    /// whole. A composite texture that cannot be applied only degrades the
    /// result and is logged.
    #[instrument(skip(self, source_mips, composite_mips, settings), fields(format = %settings.texture_format_name))]
    pub fn build_texture(
        &self,
        source_mips: &[Image],
        composite_mips: Option<&[Image]>,
        settings: &BuildSettings,
    ) -> Result<Vec<CompressedMip>> {
        let mut timings = PipelineTimings::new();
        self.run(source_mips, composite_mips, settings, &mut timings)
    }

    /// Like [`build_texture`](Self::build_texture), also returning per-step
    /// durations.
    #[instrument(skip(self, source_mips, composite_mips, settings), fields(format = %settings.texture_format_name))]
    pub fn build_texture_with_timings(
        &self,
        source_mips: &[Image],
        composite_mips: Option<&[Image]>,
        settings: &BuildSettings,
    ) -> Result<(Vec<CompressedMip>, PipelineTimings)> {
        let mut timings = PipelineTimings::new();
        let mips = self.run(source_mips, composite_mips, settings, &mut timings)?;
        timings.log_summary();
        Ok((mips, timings))
    }

    fn run(
        &self,
        source_mips: &[Image],
        composite_mips: Option<&[Image]>,
        settings: &BuildSettings,
        timings: &mut PipelineTimings,
    ) -> Result<Vec<CompressedMip>> {
        info!(source_mips = source_mips.len(), "Starting texture build");
        let compressor = self.compressor_for(settings)?;
        check_kernels(settings)?;
        let max_dimension = compressor.capabilities().max_texture_dimension;

        let mut chain = {
            let _span = tracing::info_span!("build_mips").entered();
            timings.time("build_mips", || self.build_mip_chain(source_mips, settings, max_dimension))?
        };

        if let Some(composite) = composite_mips
            && settings.composite_texture_mode != CompositeTextureMode::Disabled
        {
            let _span = tracing::info_span!("composite").entered();
            timings.time("composite", || {
                self.apply_composite(&mut chain, composite, settings, max_dimension)
            });
        }

        let mut settings = settings.clone();
        settings.top_mip_size = (chain[0].width, chain[0].height);

        let compressed = {
            let _span = tracing::info_span!("compress", mips = chain.len()).entered();
            timings.time("compress", || self.compress_mip_chain(compressor.as_ref(), &chain, &settings))?
        };

        info!(
            width = settings.top_mip_size.0,
            height = settings.top_mip_size.1,
            mips = compressed.len(),
            "Texture build complete"
        );
        Ok(compressed)
    }

    /// Produces the linear output chain: source mips are converted,
    /// processed and extended with generated or angular-filtered levels.
    fn build_mip_chain(
        &self,
        source_mips: &[Image],
        settings: &BuildSettings,
        max_dimension: usize,
    ) -> Result<Vec<LinearImage>> {
        let first = source_mips
            .first()
            .ok_or_else(|| TextureBuildError::InvalidSource("no source mips".to_string()))?;
        if settings.cubemap && first.slices != 1 && first.slices != CUBE_FACES {
            return Err(TextureBuildError::InvalidSource(format!(
                "cubemap source has {} slices",
                first.slices
            )));
        }
        let long_lat = settings.cubemap && first.slices == 1;
        let max_resolution = settings.max_texture_resolution.min(max_dimension);

        let source_extent = if long_lat {
            long_lat_cube_extent(first.width, settings.max_texture_resolution)
        } else {
            first.width.max(first.height)
        };
        let max_source_mips = 1 + ceil_log2(source_extent);
        let max_dest_mips = 1 + ceil_log2(max_resolution);
        let num_output_mips = match settings.mip_gen_settings {
            MipGenSettings::NoMipmaps => 1,
            _ => max_source_mips,
        }
        .min(max_dest_mips);
        let mut num_source_mips = match settings.mip_gen_settings {
            MipGenSettings::LeaveExistingMips if !long_lat => source_mips.len(),
            _ => 1,
        };

        let mut top = first.to_linear();
        if let Some(padded) = pad_to_power_of_two(&top, settings.power_of_two_mode, settings.padding_color) {
            // provided lower mips no longer line up with a resized top
            if (padded.width, padded.height) != (top.width, top.height) {
                num_source_mips = 1;
            }
            top = padded;
        }

        let levels_to_usable = max_source_mips.saturating_sub(max_dest_mips);
        debug!(
            max_source_mips,
            max_dest_mips, num_output_mips, num_source_mips, levels_to_usable, "mip chain layout"
        );

        let bases: Vec<LinearImage> = if !long_lat && levels_to_usable >= num_source_mips {
            // none of the provided mips fit; derive a usable one from the top
            if !top.width.is_power_of_two() || !top.height.is_power_of_two() {
                return Err(TextureBuildError::DimensionTooLarge {
                    width: top.width,
                    height: top.height,
                    max: max_resolution,
                });
            }
            let mut generated = generate_mip_chain(settings, &top, levels_to_usable);
            vec![generated.swap_remove(levels_to_usable - 1)]
        } else {
            let skip = if long_lat { 0 } else { levels_to_usable };
            std::iter::once(top)
                .chain(source_mips[1..num_source_mips].iter().map(Image::to_linear))
                .skip(skip)
                .take(num_output_mips)
                .collect()
        };

        let mut chain = Vec::with_capacity(num_output_mips);
        for mut mip in bases {
            if long_lat {
                mip = generate_base_cube_mip(&mip, max_resolution);
            } else if settings.apply_kernel_to_top_mip {
                if settings.renormalize_top_mip {
                    normalize_mip(&mut mip);
                }
                mip = generate_top_mip(&mip, settings);
            } else if settings.renormalize_top_mip {
                normalize_mip(&mut mip);
            }

            adjust_image_colors(&mut mip, settings);
            if settings.compute_bokeh_alpha {
                compute_bokeh_alpha(&mut mip);
            }
            if settings.flip_green_channel {
                flip_green_channel(&mut mip);
            }
            chain.push(mip);
        }

        if num_output_mips > chain.len() {
            if settings.cubemap {
                chain = generate_angular_filtered_mips(
                    chain,
                    num_output_mips,
                    settings.diffuse_convolve_mip_level,
                    self.config.min_parallel_face_extent,
                );
            } else if let Some(last) = chain.last() {
                let generated = generate_mip_chain(settings, last, num_output_mips - chain.len());
                chain.extend(generated);
            }
        }

        if settings.replicate_red {
            replicate_red_channel(&mut chain);
        } else if settings.replicate_alpha {
            replicate_alpha_channel(&mut chain);
        }
        Ok(chain)
    }

    fn apply_composite(
        &self,
        chain: &mut [LinearImage],
        composite_mips: &[Image],
        settings: &BuildSettings,
        max_dimension: usize,
    ) {
        let normal_settings = BuildSettings {
            max_texture_resolution: settings.max_texture_resolution,
            ..BuildSettings::for_composite_normals()
        };
        match self.build_mip_chain(composite_mips, &normal_settings, max_dimension) {
            Ok(normals) => {
                if !apply_composite_texture(
                    chain,
                    &normals,
                    settings.composite_texture_mode,
                    settings.composite_power,
                ) {
                    warn!("Composite texture could not be applied, building without it");
                }
            }
            Err(e) => warn!(error = %e, "Failed to build composite texture mips"),
        }
    }

    /// Compresses every mip. Large mips go to the worker pool, the rest run
    /// on the calling thread; any failure discards all output.
    fn compress_mip_chain(
        &self,
        compressor: &dyn TextureCompressor,
        chain: &[LinearImage],
        settings: &BuildSettings,
    ) -> Result<Vec<CompressedMip>> {
        let has_alpha = !settings.compression_no_alpha && chain.first().is_some_and(detect_alpha_channel);
        let parallel = compressor.allows_parallel_build();
        let min_dimension = self.config.min_parallel_mip_dimension;
        let runs_parallel = |mip: &LinearImage| parallel && mip.width.min(mip.height) >= min_dimension;
        debug!(has_alpha, parallel, compressor = compressor.name(), "compressing mip chain");

        let parallel_results: Vec<Option<Result<CompressedMip>>> = chain
            .par_iter()
            .map(|mip| runs_parallel(mip).then(|| compressor.compress(mip, settings, has_alpha)))
            .collect();

        let mut compressed = Vec::with_capacity(chain.len());
        for (index, (mip, result)) in chain.iter().zip(parallel_results).enumerate() {
            let result = result.unwrap_or_else(|| compressor.compress(mip, settings, has_alpha));
            match result {
                Ok(output) => compressed.push(output),
                Err(e) => {
                    error!(mip = index, width = mip.width, height = mip.height, error = %e, "Mip compression failed");
                    return Err(e);
                }
            }
        }
        Ok(compressed)
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }
}
