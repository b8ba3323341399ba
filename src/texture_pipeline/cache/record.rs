//! Persisted layout of a cached texture

use bincode::{Decode, Encode};

use crate::texture_pipeline::common::{Result, TextureBuildError};
use crate::texture_pipeline::compression::PixelFormat;

const RECORD_MAGIC: u32 = u32::from_le_bytes(*b"TDDC");
const RECORD_VERSION: u32 = 1;

/// One mip of the primary record. Streamed mips carry no data here.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MipEntry {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub inline_data: Option<Vec<u8>>,
}

/// Metadata plus the inline mips of one texture.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PrimaryRecord {
    magic: u32,
    version: u32,
    pub pixel_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub slices: u32,
    pub mips: Vec<MipEntry>,
}

impl PrimaryRecord {
    pub fn new(pixel_format: PixelFormat, width: u32, height: u32, slices: u32, mips: Vec<MipEntry>) -> Self {
        Self {
            magic: RECORD_MAGIC,
            version: RECORD_VERSION,
            pixel_format,
            width,
            height,
            slices,
            mips,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TextureBuildError::Store(format!("record encode: {e}")))
    }

    /// Decodes and validates a record read back under `key`.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self> {
        let corrupt = |reason: String| TextureBuildError::CacheCorrupt {
            key: key.to_string(),
            reason,
        };
        let (record, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard()).map_err(|e| corrupt(e.to_string()))?;

        if record.magic != RECORD_MAGIC {
            return Err(corrupt(format!("bad magic {:#010x}", record.magic)));
        }
        if record.version != RECORD_VERSION {
            return Err(corrupt(format!("record version {}", record.version)));
        }
        if read != bytes.len() {
            return Err(corrupt(format!("{} trailing bytes", bytes.len() - read)));
        }
        if record.mips.is_empty() {
            return Err(corrupt("record has no mips".to_string()));
        }
        Ok(record)
    }
}
