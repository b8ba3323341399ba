use std::sync::{Arc, Mutex};

use crate::texture_pipeline::build::{PipelineConfig, TextureBuildPipeline};
use crate::texture_pipeline::common::error::{Result, TextureBuildError};
use crate::texture_pipeline::compression::{
    CompressedMip, CompressionCapabilities, FormatRegistry, PixelFormat, TextureCompressor,
};
use crate::texture_pipeline::image::{ColorSpace, Image, LinearColor, LinearImage, RawFormat};
use crate::texture_pipeline::settings::{BuildSettings, CompositeTextureMode, MipGenSettings, PowerOfTwoMode};

#[derive(Debug, Clone, PartialEq)]
struct CompressCall {
    width: usize,
    height: usize,
    slices: usize,
    has_alpha: bool,
    top_mip_size: (usize, usize),
}

struct MockCompressor {
    fail_on_width: Option<usize>,
    calls: Arc<Mutex<Vec<CompressCall>>>,
}

impl TextureCompressor for MockCompressor {
    fn name(&self) -> &str {
        "mock"
    }

    fn supported_formats(&self) -> &[&'static str] {
        &["MOCK"]
    }

    fn capabilities(&self) -> CompressionCapabilities {
        CompressionCapabilities {
            max_texture_dimension: 16384,
            allows_parallel_build: true,
        }
    }

    fn compress(&self, image: &LinearImage, settings: &BuildSettings, has_alpha: bool) -> Result<CompressedMip> {
        if self.fail_on_width == Some(image.width) {
            return Err(TextureBuildError::CompressionFailed {
                format: "MOCK".to_string(),
                reason: "Mock compression error".to_string(),
            });
        }
        self.calls.lock().unwrap().push(CompressCall {
            width: image.width,
            height: image.height,
            slices: image.slices,
            has_alpha,
            top_mip_size: settings.top_mip_size,
        });
        Ok(CompressedMip {
            width: image.width,
            height: image.height,
            slices: image.slices,
            pixel_format: PixelFormat::B8G8R8A8,
            data: vec![0; image.width * image.height * image.slices * 4],
        })
    }
}

fn mock_pipeline(fail_on_width: Option<usize>) -> (TextureBuildPipeline, Arc<Mutex<Vec<CompressCall>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(MockCompressor {
        fail_on_width,
        calls: calls.clone(),
    }));
    let pipeline = TextureBuildPipeline::with_custom(Arc::new(registry), PipelineConfig::default());
    (pipeline, calls)
}

fn mock_settings() -> BuildSettings {
    BuildSettings::builder().texture_format("MOCK").build()
}

fn bgra_source(width: usize, height: usize, alpha: u8) -> Image {
    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x * 255 / width) as u8, (y * 255 / height) as u8, 96, alpha]);
        }
    }
    Image::new(width, height, 1, RawFormat::Bgra8, ColorSpace::Linear, data).unwrap()
}

fn solid_source(width: usize, height: usize, color: LinearColor) -> Image {
    LinearImage::filled(width, height, 1, color).to_image(RawFormat::Rgba32F, ColorSpace::Linear)
}

fn read_rgba32f(mip: &CompressedMip, texel: usize) -> [f32; 4] {
    let bytes = &mip.data[texel * 16..][..16];
    std::array::from_fn(|c| f32::from_le_bytes(bytes[c * 4..][..4].try_into().unwrap()))
}

fn assert_texel_near(mip: &CompressedMip, texel: usize, expected: [f32; 4]) {
    let actual = read_rgba32f(mip, texel);
    for c in 0..4 {
        assert!((actual[c] - expected[c]).abs() < 1e-5, "{actual:?} != {expected:?}");
    }
}

#[test]
fn test_config_builder() {
    let config = PipelineConfig::builder()
        .min_parallel_mip_dimension(64)
        .band_rows(32)
        .build();

    assert_eq!(config.min_parallel_mip_dimension, 64);
    assert_eq!(config.band_rows, 32);
    assert_eq!(config.min_parallel_face_extent, 128);
    assert_eq!(config.min_band_parallel_height, 256);

    let sequential = PipelineConfig::builder().sequential().build();
    assert_eq!(sequential.min_parallel_mip_dimension, usize::MAX);
    assert_eq!(sequential.band_config().min_parallel_height, usize::MAX);
}

#[test]
fn test_opaque_bgra8_full_chain() {
    let pipeline = TextureBuildPipeline::new(PipelineConfig::default());
    let settings = BuildSettings::builder().texture_format("BGRA8").build();

    let mips = pipeline.build_texture(&[bgra_source(256, 256, 255)], None, &settings).unwrap();

    assert_eq!(mips.len(), 9);
    for (level, mip) in mips.iter().enumerate() {
        let size = 256 >> level;
        assert_eq!((mip.width, mip.height), (size, size));
        assert_eq!(mip.pixel_format, PixelFormat::B8G8R8A8);
        assert_eq!(mip.data.len(), size * size * 4);
    }
}

#[test]
fn test_failure_discards_all_mips() {
    let (pipeline, _calls) = mock_pipeline(Some(4));

    // 16x16 gives five mips; the third (4x4) fails
    let result = pipeline.build_texture(&[bgra_source(16, 16, 255)], None, &mock_settings());

    assert!(matches!(result, Err(TextureBuildError::CompressionFailed { .. })));
}

#[test]
fn test_unknown_format_fails_before_building() {
    let (pipeline, calls) = mock_pipeline(None);
    let settings = BuildSettings::builder().texture_format("ASTC_4x4").build();

    let result = pipeline.build_texture(&[bgra_source(8, 8, 255)], None, &settings);

    assert!(matches!(result, Err(TextureBuildError::UnsupportedFormat(name)) if name == "ASTC_4x4"));
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_alpha_detected_once_from_top_mip() {
    let (pipeline, calls) = mock_pipeline(None);
    pipeline.build_texture(&[bgra_source(8, 8, 128)], None, &mock_settings()).unwrap();
    assert!(calls.lock().unwrap().iter().all(|c| c.has_alpha));

    let (pipeline, calls) = mock_pipeline(None);
    let settings = BuildSettings::builder().texture_format("MOCK").compression_no_alpha(true).build();
    pipeline.build_texture(&[bgra_source(8, 8, 128)], None, &settings).unwrap();
    assert!(calls.lock().unwrap().iter().all(|c| !c.has_alpha));
}

#[test]
fn test_no_mipmaps_yields_single_mip() {
    let (pipeline, calls) = mock_pipeline(None);
    let settings = BuildSettings::builder()
        .texture_format("MOCK")
        .mip_gen_settings(MipGenSettings::NoMipmaps)
        .build();

    let mips = pipeline.build_texture(&[bgra_source(32, 16, 255)], None, &settings).unwrap();
    assert_eq!(mips.len(), 1);
    assert_eq!(
        calls.lock().unwrap().as_slice(),
        &[CompressCall {
            width: 32,
            height: 16,
            slices: 1,
            has_alpha: false,
            top_mip_size: (32, 16),
        }]
    );
}

#[test]
fn test_max_resolution_drops_top_levels() {
    let (pipeline, calls) = mock_pipeline(None);
    let settings = BuildSettings::builder().texture_format("MOCK").max_texture_resolution(64).build();

    let mips = pipeline.build_texture(&[bgra_source(256, 256, 255)], None, &settings).unwrap();

    assert_eq!(mips.len(), 7);
    assert_eq!((mips[0].width, mips[0].height), (64, 64));
    assert_eq!((mips[6].width, mips[6].height), (1, 1));
    assert!(calls.lock().unwrap().iter().all(|c| c.top_mip_size == (64, 64)));
}

#[test]
fn test_non_power_of_two_cannot_be_downsized() {
    let (pipeline, _calls) = mock_pipeline(None);
    let settings = BuildSettings::builder().texture_format("MOCK").max_texture_resolution(64).build();

    let result = pipeline.build_texture(&[bgra_source(300, 200, 255)], None, &settings);
    assert!(matches!(
        result,
        Err(TextureBuildError::DimensionTooLarge {
            width: 300,
            height: 200,
            max: 64
        })
    ));
}

#[test]
fn test_padding_sets_top_mip_size() {
    let (pipeline, calls) = mock_pipeline(None);
    let settings = BuildSettings::builder()
        .texture_format("MOCK")
        .power_of_two_mode(PowerOfTwoMode::PadToPowerOfTwo, LinearColor::BLACK)
        .build();

    let mips = pipeline.build_texture(&[bgra_source(5, 3, 255)], None, &settings).unwrap();

    assert_eq!((mips[0].width, mips[0].height), (8, 4));
    assert_eq!(mips.len(), 4);
    assert!(calls.lock().unwrap().iter().all(|c| c.top_mip_size == (8, 4)));
}

#[test]
fn test_leave_existing_mips() {
    let pipeline = TextureBuildPipeline::new(PipelineConfig::default());
    let red = LinearColor::new(1.0, 0.0, 0.0, 1.0);
    let green = LinearColor::new(0.0, 1.0, 0.0, 1.0);
    let blue = LinearColor::new(0.0, 0.0, 1.0, 1.0);
    let sources = [solid_source(8, 8, red), solid_source(4, 4, green), solid_source(2, 2, blue)];
    let settings = BuildSettings::builder()
        .texture_format("RGBA32F")
        .mip_gen_settings(MipGenSettings::LeaveExistingMips)
        .build();

    let mips = pipeline.build_texture(&sources, None, &settings).unwrap();

    assert_eq!(mips.len(), 4);
    assert_eq!(read_rgba32f(&mips[1], 0), [0.0, 1.0, 0.0, 1.0]);
    assert_eq!(read_rgba32f(&mips[2], 0), [0.0, 0.0, 1.0, 1.0]);
    // the last level is generated from the provided 2x2
    assert_eq!((mips[3].width, mips[3].height), (1, 1));
    assert_texel_near(&mips[3], 0, [0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn test_regenerated_mips_ignore_provided_levels() {
    let pipeline = TextureBuildPipeline::new(PipelineConfig::default());
    let red = LinearColor::new(1.0, 0.0, 0.0, 1.0);
    let sources = [solid_source(4, 4, red), solid_source(2, 2, LinearColor::WHITE)];
    let settings = BuildSettings::builder().texture_format("RGBA32F").build();

    let mips = pipeline.build_texture(&sources, None, &settings).unwrap();
    assert_eq!(mips.len(), 3);
    assert_texel_near(&mips[1], 0, [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_cubemap_with_bad_slice_count() {
    let (pipeline, _calls) = mock_pipeline(None);
    let source = Image::zeroed(8, 8, 3, RawFormat::Bgra8, ColorSpace::Linear);
    let settings = BuildSettings::builder().texture_format("MOCK").cubemap(true).build();

    let result = pipeline.build_texture(&[source], None, &settings);
    assert!(matches!(result, Err(TextureBuildError::InvalidSource(_))));
}

#[test]
fn test_long_lat_panorama_to_cube() {
    let pipeline = TextureBuildPipeline::new(PipelineConfig::default());
    let mut panorama = LinearImage::new(512, 256, 1);
    for y in 0..256 {
        for x in 0..512 {
            let sky = 4.0 * (1.0 - y as f32 / 255.0);
            panorama.set(x, y, 0, LinearColor::new(sky, sky * 0.8, 0.5, 1.0));
        }
    }
    let source = panorama.to_image(RawFormat::Rgba32F, ColorSpace::Linear);
    let settings = BuildSettings::builder()
        .texture_format("RGBA16F")
        .cubemap(true)
        .long_lat_source(true)
        .max_texture_resolution(128)
        .build();

    let mips = pipeline.build_texture(&[source], None, &settings).unwrap();

    assert_eq!(mips.len(), 8);
    for (level, mip) in mips.iter().enumerate() {
        let extent = 128 >> level;
        assert_eq!((mip.width, mip.height, mip.slices), (extent, extent, 6));
        assert_eq!(mip.pixel_format, PixelFormat::FloatRGBA);
        assert_eq!(mip.data.len(), extent * extent * 8 * 6);
    }
}

#[test]
fn test_composite_raises_roughness() {
    let pipeline = TextureBuildPipeline::new(PipelineConfig::default());
    let roughness = solid_source(4, 4, LinearColor::new(0.2, 0.0, 0.0, 1.0));

    // alternating tilted normals average to a short vector
    let mut normals = LinearImage::new(4, 4, 1);
    for y in 0..4 {
        for x in 0..4 {
            let nx = if (x + y) % 2 == 0 { 0.6 } else { -0.6 };
            normals.set(x, y, 0, LinearColor::new(nx * 0.5 + 0.5, 0.5, 0.8 * 0.5 + 0.5, 1.0));
        }
    }
    let composite = [normals.to_image(RawFormat::Rgba32F, ColorSpace::Linear)];
    let settings = BuildSettings::builder()
        .texture_format("RGBA32F")
        .composite(CompositeTextureMode::NormalRoughnessToRed, 1.0)
        .build();

    let mips = pipeline.build_texture(&[roughness], Some(&composite), &settings).unwrap();

    assert_eq!(mips.len(), 3);
    let [r, g, _, _] = read_rgba32f(&mips[1], 0);
    assert!(r > 0.4, "roughness {r}");
    assert!(g.abs() < 1e-6);
}

#[test]
fn test_composite_mismatch_keeps_building() {
    let pipeline = TextureBuildPipeline::new(PipelineConfig::default());
    let roughness = solid_source(4, 4, LinearColor::new(0.2, 0.0, 0.0, 1.0));
    let composite = [solid_source(4, 2, LinearColor::new(0.5, 0.5, 1.0, 1.0))];
    let settings = BuildSettings::builder()
        .texture_format("RGBA32F")
        .composite(CompositeTextureMode::NormalRoughnessToRed, 1.0)
        .build();

    let mips = pipeline.build_texture(&[roughness], Some(&composite), &settings).unwrap();

    assert_eq!(mips.len(), 3);
    assert!((read_rgba32f(&mips[1], 0)[0] - 0.2).abs() < 1e-6);
}

#[test]
fn test_build_with_timings_records_steps() {
    let (pipeline, _calls) = mock_pipeline(None);
    let (mips, timings) = pipeline
        .build_texture_with_timings(&[bgra_source(16, 16, 255)], None, &mock_settings())
        .unwrap();

    assert_eq!(mips.len(), 5);
    assert!(timings.get_step("build_mips").is_some());
    assert!(timings.get_step("compress").is_some());
    assert!(timings.get_step("composite").is_none());
}

#[test]
fn test_parallel_and_sequential_builds_match() {
    let settings = BuildSettings::builder().texture_format("DXT1").build();
    let source = [bgra_source(256, 256, 255)];

    let parallel = TextureBuildPipeline::new(PipelineConfig::default())
        .build_texture(&source, None, &settings)
        .unwrap();
    let sequential = TextureBuildPipeline::new(PipelineConfig::builder().sequential().build())
        .build_texture(&source, None, &settings)
        .unwrap();

    assert_eq!(parallel, sequential);
}

fn assert_halving(mips: &[CompressedMip]) {
    for pair in mips.windows(2) {
        let expected = ((pair[0].width >> 1).max(1), (pair[0].height >> 1).max(1));
        assert_eq!((pair[1].width, pair[1].height), expected);
    }
    let last = mips.last().unwrap();
    assert_eq!((last.width, last.height), (1, 1));
}

#[test]
fn test_odd_sized_sources_build_full_chain() {
    let (pipeline, _calls) = mock_pipeline(None);

    let square = pipeline.build_texture(&[bgra_source(100, 100, 255)], None, &mock_settings()).unwrap();
    assert_eq!(square.len(), 7);
    assert_eq!((square[2].width, square[2].height), (25, 25));
    assert_halving(&square);

    let wide = pipeline.build_texture(&[bgra_source(100, 60, 255)], None, &mock_settings()).unwrap();
    assert_eq!((wide[1].width, wide[1].height), (50, 30));
    assert_halving(&wide);

    let tiny = pipeline.build_texture(&[bgra_source(5, 3, 255)], None, &mock_settings()).unwrap();
    let sizes: Vec<_> = tiny.iter().map(|m| (m.width, m.height)).collect();
    assert_eq!(sizes, vec![(5, 3), (2, 1), (1, 1)]);
}

#[test]
fn test_padding_regenerates_provided_mips() {
    let (pipeline, _calls) = mock_pipeline(None);
    let red = LinearColor::new(1.0, 0.0, 0.0, 1.0);
    let green = LinearColor::new(0.0, 1.0, 0.0, 1.0);
    let sources = [solid_source(12, 12, red), solid_source(6, 6, green)];
    let settings = BuildSettings::builder()
        .texture_format("MOCK")
        .mip_gen_settings(MipGenSettings::LeaveExistingMips)
        .power_of_two_mode(PowerOfTwoMode::PadToPowerOfTwo, LinearColor::BLACK)
        .build();

    let mips = pipeline.build_texture(&sources, None, &settings).unwrap();

    let sizes: Vec<_> = mips.iter().map(|m| (m.width, m.height)).collect();
    assert_eq!(sizes, vec![(16, 16), (8, 8), (4, 4), (2, 2), (1, 1)]);
}

#[test]
fn test_padding_mode_keeps_power_of_two_provided_mips() {
    let pipeline = TextureBuildPipeline::new(PipelineConfig::default());
    let red = LinearColor::new(1.0, 0.0, 0.0, 1.0);
    let green = LinearColor::new(0.0, 1.0, 0.0, 1.0);
    let sources = [solid_source(8, 8, red), solid_source(4, 4, green)];
    let settings = BuildSettings::builder()
        .texture_format("RGBA32F")
        .mip_gen_settings(MipGenSettings::LeaveExistingMips)
        .power_of_two_mode(PowerOfTwoMode::PadToPowerOfTwo, LinearColor::BLACK)
        .build();

    let mips = pipeline.build_texture(&sources, None, &settings).unwrap();

    assert_eq!(mips.len(), 4);
    assert_eq!(read_rgba32f(&mips[1], 0), [0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_unsupported_sharpening_kernel_is_rejected() {
    let (pipeline, calls) = mock_pipeline(None);
    let settings = BuildSettings::builder()
        .texture_format("MOCK")
        .mip_sharpening(0.5, 5)
        .build();

    let result = pipeline.build_texture(&[bgra_source(16, 16, 255)], None, &settings);

    assert!(matches!(result, Err(TextureBuildError::InvalidSettings(_))));
    assert!(calls.lock().unwrap().is_empty());
}
