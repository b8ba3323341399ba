//! Compressed output types

use bincode::{Decode, Encode};

/// GPU pixel formats a compressor can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum PixelFormat {
    B8G8R8A8,
    R8G8B8A8,
    G8,
    G16,
    /// RGBA, 16-bit float per channel
    FloatRGBA,
    A32B32G32R32F,
    /// Signed 8-bit tangent-space XY
    V8U8,
    DXT1,
    DXT5,
    BC4,
    BC5,
    BC6H,
    BC7,
    ETC1,
}

impl PixelFormat {
    /// Block footprint in texels; (1, 1) for uncompressed formats.
    pub fn block_size(self) -> (usize, usize) {
        if self.is_block_compressed() { (4, 4) } else { (1, 1) }
    }

    pub fn bytes_per_block(self) -> usize {
        match self {
            PixelFormat::G8 => 1,
            PixelFormat::G16 | PixelFormat::V8U8 => 2,
            PixelFormat::B8G8R8A8 | PixelFormat::R8G8B8A8 => 4,
            PixelFormat::FloatRGBA => 8,
            PixelFormat::A32B32G32R32F => 16,
            PixelFormat::DXT1 | PixelFormat::BC4 | PixelFormat::ETC1 => 8,
            PixelFormat::DXT5 | PixelFormat::BC5 | PixelFormat::BC6H | PixelFormat::BC7 => 16,
        }
    }

    pub fn is_block_compressed(self) -> bool {
        matches!(
            self,
            PixelFormat::DXT1
                | PixelFormat::DXT5
                | PixelFormat::BC4
                | PixelFormat::BC5
                | PixelFormat::BC6H
                | PixelFormat::BC7
                | PixelFormat::ETC1
        )
    }

    /// Bytes needed for `slices` images of `width` x `height`.
    pub fn data_size(self, width: usize, height: usize, slices: usize) -> usize {
        let (bw, bh) = self.block_size();
        width.div_ceil(bw) * height.div_ceil(bh) * self.bytes_per_block() * slices
    }
}

/// One compressed mip level, all slices back to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedMip {
    pub width: usize,
    pub height: usize,
    pub slices: usize,
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
}

/// Limits a compressor reports once per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionCapabilities {
    pub max_texture_dimension: usize,
    pub allows_parallel_build: bool,
}

impl Default for CompressionCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            allows_parallel_build: true,
        }
    }
}
