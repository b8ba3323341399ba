//! Compression module
//!
//! Backends turning one linear mip into GPU-ready bytes, plus the registry
//! that resolves a format name to its backend.

pub mod block_compressor;
pub mod compressor;
pub mod etc_compressor;
pub mod normal_map_compressor;
pub mod registry;
pub mod types;
pub mod uncompressed_compressor;


pub use block_compressor::{BandConfig, BlockCompressor};
pub use compressor::TextureCompressor;
pub use etc_compressor::{EtcCompressor, encode_etc1_block};
pub use normal_map_compressor::NormalMapCompressor;
pub use registry::FormatRegistry;
pub use types::{CompressedMip, CompressionCapabilities, PixelFormat};
pub use uncompressed_compressor::UncompressedCompressor;
