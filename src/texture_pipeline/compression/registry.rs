use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::texture_pipeline::compression::block_compressor::{BandConfig, BlockCompressor};
use crate::texture_pipeline::compression::compressor::TextureCompressor;
use crate::texture_pipeline::compression::etc_compressor::EtcCompressor;
use crate::texture_pipeline::compression::normal_map_compressor::NormalMapCompressor;
use crate::texture_pipeline::compression::uncompressed_compressor::UncompressedCompressor;

/// Maps format names to the compressor that produces them.
///
/// Built once and shared read-only for the lifetime of the pipeline.
#[derive(Default)]
pub struct FormatRegistry {
    by_format: HashMap<String, Arc<dyn TextureCompressor>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend.
    pub fn with_defaults(band_config: BandConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(UncompressedCompressor));
        registry.register(Arc::new(BlockCompressor::new(band_config)));
        registry.register(Arc::new(NormalMapCompressor::new(band_config)));
        registry.register(Arc::new(EtcCompressor));
        registry
    }

    /// Adds `compressor` for all of its formats. A later registration
    /// replaces an earlier one for the same name.
    pub fn register(&mut self, compressor: Arc<dyn TextureCompressor>) {
        for &format in compressor.supported_formats() {
            debug!(format, compressor = compressor.name(), "registering texture format");
            self.by_format.insert(format.to_string(), Arc::clone(&compressor));
        }
    }

    pub fn lookup(&self, format: &str) -> Option<Arc<dyn TextureCompressor>> {
        self.by_format.get(format).cloned()
    }

    /// Encoder version for `format`; unknown formats report 0.
    pub fn format_version(&self, format: &str) -> u16 {
        self.by_format.get(format).map_or(0, |c| c.format_version(format))
    }

    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.by_format.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry").field("formats", &self.formats()).finish()
    }
}
