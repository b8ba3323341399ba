//! Texture derived-data pipeline
//!
//! Source mips go through mip generation, per-pixel processing and a
//! format-specific compressor. The cache module keys finished builds by
//! source identity and build settings so each one runs once.

pub mod build;
pub mod cache;
pub mod common;
pub mod compression;
pub mod cubemap;
pub mod image;
pub mod mip;
pub mod processing;
pub mod settings;

pub use common::{PipelineTimings, Result, TextureBuildError};

pub use image::{ColorSpace, Image, LinearColor, LinearImage, RawFormat};

pub use settings::{
    BuildSettings, BuildSettingsBuilder, ColorAdjustment, CompositeTextureMode, CompressionQuality, MipGenSettings,
    PowerOfTwoMode,
};

pub use compression::{CompressedMip, FormatRegistry, PixelFormat, TextureCompressor};

pub use build::{PipelineConfig, PipelineConfigBuilder, TextureBuildPipeline};

pub use cache::{
    BlobStore, BuildHandle, CacheConfig, CachedTexture, DerivedDataCache, FileBlobStore, MemoryBlobStore,
    TextureSource,
};
