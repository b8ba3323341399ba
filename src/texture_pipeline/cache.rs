//! Derived data cache module
//!
//! Content-addressed storage of built textures: key derivation, blob
//! stores, the persisted record layout and the cache front end.

pub mod config;
pub mod derived_data;
pub mod file_store;
pub mod key;
pub mod memory_store;
pub mod record;
pub mod store;


pub use config::{CacheConfig, CacheConfigBuilder};
pub use derived_data::{BuildHandle, CachedMip, CachedTexture, DerivedDataCache, TextureSource};
pub use file_store::FileBlobStore;
pub use key::{cache_key_suffix, streamed_mip_key};
pub use memory_store::MemoryBlobStore;
pub use record::{MipEntry, PrimaryRecord};
pub use store::{BlobStore, PendingGet, get_async};
