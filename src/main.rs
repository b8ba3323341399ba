use std::sync::Arc;

use anyhow::Context;
use texture_ddc_rs::logger;
use texture_ddc_rs::texture_pipeline::{
    BuildSettings, CacheConfig, ColorSpace, DerivedDataCache, Image, MemoryBlobStore, PipelineConfig, RawFormat,
    TextureBuildPipeline, TextureSource,
};

use tracing::info;

fn checkerboard(size: usize) -> anyhow::Result<Image> {
    let mut data = Vec::with_capacity(size * size * 4);
    for y in 0..size {
        for x in 0..size {
            let v = if (x / 8 + y / 8) % 2 == 0 { 230 } else { 25 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    Ok(Image::new(size, size, 1, RawFormat::Bgra8, ColorSpace::Srgb, data)?)
}

fn main() -> anyhow::Result<()> {
    logger::init();

    info!("Starting texture_ddc...");

    let pipeline = Arc::new(TextureBuildPipeline::new(PipelineConfig::default()));
    let formats = pipeline.registry().formats();
    info!("Registered formats: {}", formats.join(", "));

    let cache = DerivedDataCache::new(Arc::new(MemoryBlobStore::new()), pipeline, CacheConfig::default());
    let source = TextureSource::new("checkerboard-256", vec![checkerboard(256)?]);
    let settings = BuildSettings::builder()
        .texture_format("DXT1")
        .srgb(true)
        .streaming(true, 0)
        .build();

    let built = cache
        .fetch_or_build(&source, &settings)
        .context("building checkerboard texture")?;
    info!(
        "Built {} ({:?}, {}x{}, {} mips)",
        built.key,
        built.pixel_format,
        built.width,
        built.height,
        built.mips.len()
    );

    let handle = cache.fetch_or_build_async(source, settings);
    let cached = handle.wait().context("fetching checkerboard texture")?;
    info!(
        "Cache hit: first resident mip {:?}, {} blobs stored",
        cached.first_resident_mip(),
        cache.store().len()
    );

    Ok(())
}
