//! Texture build settings
//!
//! [`BuildSettings`] is an immutable value object for the duration of one
//! build. Every field except `top_mip_size` feeds the cache key.

use crate::texture_pipeline::image::{ColorSpace, LinearColor};

/// Per-pixel color adjustments, applied in HSV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAdjustment {
    pub brightness: f32,
    pub brightness_curve: f32,
    pub saturation: f32,
    pub vibrance: f32,
    pub rgb_curve: f32,
    /// Degrees.
    pub hue: f32,
    pub min_alpha: f32,
    pub max_alpha: f32,
}

impl Default for ColorAdjustment {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            brightness_curve: 1.0,
            saturation: 1.0,
            vibrance: 0.0,
            rgb_curve: 1.0,
            hue: 0.0,
            min_alpha: 0.0,
            max_alpha: 1.0,
        }
    }
}

/// How the output mip chain is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MipGenSettings {
    /// Generate every mip from the top level with the configured kernel.
    #[default]
    FromSettings,
    /// Only the top mip is produced.
    NoMipmaps,
    /// Use all provided source mips, generating only what is missing.
    LeaveExistingMips,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerOfTwoMode {
    #[default]
    None,
    PadToPowerOfTwo,
    PadToSquarePowerOfTwo,
}

/// Channel of the target that receives the normal-variance roughness term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeTextureMode {
    #[default]
    Disabled,
    NormalRoughnessToRed,
    NormalRoughnessToGreen,
    NormalRoughnessToBlue,
    NormalRoughnessToAlpha,
}

impl CompositeTextureMode {
    pub fn channel(self) -> Option<usize> {
        match self {
            CompositeTextureMode::Disabled => None,
            CompositeTextureMode::NormalRoughnessToRed => Some(0),
            CompositeTextureMode::NormalRoughnessToGreen => Some(1),
            CompositeTextureMode::NormalRoughnessToBlue => Some(2),
            CompositeTextureMode::NormalRoughnessToAlpha => Some(3),
        }
    }
}

/// Speed/quality trade-off handed to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionQuality {
    Fast,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub color_adjustment: ColorAdjustment,
    /// Per-channel alpha-test thresholds; zero disables coverage preservation.
    pub alpha_coverage_thresholds: [f32; 4],
    /// Positive sharpens, negative blurs (variance of the Gaussian).
    pub mip_sharpening: f32,
    pub sharpen_mip_kernel_size: usize,
    pub diffuse_convolve_mip_level: usize,
    pub max_texture_resolution: usize,
    pub texture_format_name: String,
    pub mip_gen_settings: MipGenSettings,
    pub cubemap: bool,
    pub long_lat_source: bool,
    pub srgb: bool,
    pub use_legacy_gamma: bool,
    pub preserve_border: bool,
    pub border_color_black: bool,
    pub dither_mip_alpha: bool,
    pub compute_bokeh_alpha: bool,
    pub replicate_red: bool,
    pub replicate_alpha: bool,
    pub downsample_with_average: bool,
    pub sharpen_without_color_shift: bool,
    pub flip_green_channel: bool,
    pub apply_kernel_to_top_mip: bool,
    pub renormalize_top_mip: bool,
    pub compression_no_alpha: bool,
    pub composite_texture_mode: CompositeTextureMode,
    pub composite_power: f32,
    pub power_of_two_mode: PowerOfTwoMode,
    pub padding_color: LinearColor,
    pub chroma_key_texture: bool,
    pub chroma_key_color: LinearColor,
    pub chroma_key_threshold: f32,
    pub compression_quality: CompressionQuality,
    pub lod_bias: u32,
    pub streamable: bool,
    /// Final top-mip size, filled in by the pipeline before compression.
    pub top_mip_size: (usize, usize),
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            color_adjustment: ColorAdjustment::default(),
            alpha_coverage_thresholds: [0.0; 4],
            mip_sharpening: 0.0,
            sharpen_mip_kernel_size: 2,
            diffuse_convolve_mip_level: 0,
            max_texture_resolution: 16384,
            texture_format_name: "BGRA8".to_string(),
            mip_gen_settings: MipGenSettings::FromSettings,
            cubemap: false,
            long_lat_source: false,
            srgb: false,
            use_legacy_gamma: false,
            preserve_border: false,
            border_color_black: false,
            dither_mip_alpha: false,
            compute_bokeh_alpha: false,
            replicate_red: false,
            replicate_alpha: false,
            downsample_with_average: false,
            sharpen_without_color_shift: false,
            flip_green_channel: false,
            apply_kernel_to_top_mip: false,
            renormalize_top_mip: false,
            compression_no_alpha: false,
            composite_texture_mode: CompositeTextureMode::Disabled,
            composite_power: 1.0,
            power_of_two_mode: PowerOfTwoMode::None,
            padding_color: LinearColor::TRANSPARENT,
            chroma_key_texture: false,
            chroma_key_color: LinearColor::new(1.0, 0.0, 1.0, 1.0),
            chroma_key_threshold: 1.0 / 255.0,
            compression_quality: CompressionQuality::Normal,
            lod_bias: 0,
            streamable: false,
            top_mip_size: (0, 0),
        }
    }
}

impl BuildSettings {
    pub fn builder() -> BuildSettingsBuilder {
        BuildSettingsBuilder::default()
    }

    /// Transfer function used when writing 8-bit output.
    pub fn output_color_space(&self) -> ColorSpace {
        match (self.srgb, self.use_legacy_gamma) {
            (false, _) => ColorSpace::Linear,
            (true, false) => ColorSpace::Srgb,
            (true, true) => ColorSpace::Pow22,
        }
    }

    pub fn has_alpha_coverage(&self) -> bool {
        self.alpha_coverage_thresholds.iter().any(|&t| t != 0.0)
    }

    /// Settings the composite (normal map) chain is always built with.
    pub fn for_composite_normals() -> Self {
        Self {
            // heavy blur reduces aliasing in the variance estimate
            mip_sharpening: -4.0,
            sharpen_mip_kernel_size: 4,
            apply_kernel_to_top_mip: true,
            renormalize_top_mip: true,
            ..Self::default()
        }
    }
}

/// Builder for BuildSettings
#[derive(Default)]
pub struct BuildSettingsBuilder {
    settings: BuildSettings,
}

impl BuildSettingsBuilder {
    pub fn texture_format(mut self, name: impl Into<String>) -> Self {
        self.settings.texture_format_name = name.into();
        self
    }

    pub fn mip_gen_settings(mut self, mip_gen: MipGenSettings) -> Self {
        self.settings.mip_gen_settings = mip_gen;
        self
    }

    pub fn mip_sharpening(mut self, sharpening: f32, kernel_size: usize) -> Self {
        self.settings.mip_sharpening = sharpening;
        self.settings.sharpen_mip_kernel_size = kernel_size;
        self
    }

    pub fn max_texture_resolution(mut self, resolution: usize) -> Self {
        self.settings.max_texture_resolution = resolution;
        self
    }

    pub fn cubemap(mut self, cubemap: bool) -> Self {
        self.settings.cubemap = cubemap;
        self
    }

    pub fn long_lat_source(mut self, long_lat: bool) -> Self {
        self.settings.long_lat_source = long_lat;
        self
    }

    pub fn diffuse_convolve_mip_level(mut self, level: usize) -> Self {
        self.settings.diffuse_convolve_mip_level = level;
        self
    }

    pub fn srgb(mut self, srgb: bool) -> Self {
        self.settings.srgb = srgb;
        self
    }

    pub fn alpha_coverage_thresholds(mut self, thresholds: [f32; 4]) -> Self {
        self.settings.alpha_coverage_thresholds = thresholds;
        self
    }

    pub fn preserve_border(mut self, preserve: bool, border_color_black: bool) -> Self {
        self.settings.preserve_border = preserve;
        self.settings.border_color_black = border_color_black;
        self
    }

    pub fn color_adjustment(mut self, adjustment: ColorAdjustment) -> Self {
        self.settings.color_adjustment = adjustment;
        self
    }

    pub fn chroma_key(mut self, color: LinearColor, threshold: f32) -> Self {
        self.settings.chroma_key_texture = true;
        self.settings.chroma_key_color = color;
        self.settings.chroma_key_threshold = threshold;
        self
    }

    pub fn composite(mut self, mode: CompositeTextureMode, power: f32) -> Self {
        self.settings.composite_texture_mode = mode;
        self.settings.composite_power = power;
        self
    }

    pub fn power_of_two_mode(mut self, mode: PowerOfTwoMode, padding_color: LinearColor) -> Self {
        self.settings.power_of_two_mode = mode;
        self.settings.padding_color = padding_color;
        self
    }

    pub fn compression_quality(mut self, quality: CompressionQuality) -> Self {
        self.settings.compression_quality = quality;
        self
    }

    pub fn downsample_with_average(mut self, enable: bool) -> Self {
        self.settings.downsample_with_average = enable;
        self
    }

    pub fn sharpen_without_color_shift(mut self, enable: bool) -> Self {
        self.settings.sharpen_without_color_shift = enable;
        self
    }

    pub fn flip_green_channel(mut self, enable: bool) -> Self {
        self.settings.flip_green_channel = enable;
        self
    }

    pub fn renormalize_top_mip(mut self, enable: bool) -> Self {
        self.settings.renormalize_top_mip = enable;
        self
    }

    pub fn compression_no_alpha(mut self, enable: bool) -> Self {
        self.settings.compression_no_alpha = enable;
        self
    }

    pub fn streaming(mut self, streamable: bool, lod_bias: u32) -> Self {
        self.settings.streamable = streamable;
        self.settings.lod_bias = lod_bias;
        self
    }

    pub fn build(self) -> BuildSettings {
        self.settings
    }
}
