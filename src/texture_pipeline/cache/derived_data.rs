use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::texture_pipeline::build::TextureBuildPipeline;
use crate::texture_pipeline::cache::config::CacheConfig;
use crate::texture_pipeline::cache::key::{cache_key_suffix, streamed_mip_key};
use crate::texture_pipeline::cache::record::{MipEntry, PrimaryRecord};
use crate::texture_pipeline::cache::store::BlobStore;
use crate::texture_pipeline::common::{Completion, Result, TextureBuildError};
use crate::texture_pipeline::compression::{CompressedMip, PixelFormat};
use crate::texture_pipeline::image::Image;
use crate::texture_pipeline::settings::BuildSettings;

/// Source mips plus the stable identity of their pixels.
#[derive(Debug, Clone)]
pub struct TextureSource {
    pub content_id: String,
    pub mips: Vec<Image>,
    pub composite_mips: Option<Vec<Image>>,
}

impl TextureSource {
    pub fn new(content_id: impl Into<String>, mips: Vec<Image>) -> Self {
        Self {
            content_id: content_id.into(),
            mips,
            composite_mips: None,
        }
    }

    pub fn with_composite(mut self, composite_mips: Vec<Image>) -> Self {
        self.composite_mips = Some(composite_mips);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMip {
    pub width: usize,
    pub height: usize,
    /// `None` for a streamed mip that has not been loaded.
    pub data: Option<Vec<u8>>,
}

/// A built or cached texture. Mip 0 is the largest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTexture {
    pub key: String,
    pub pixel_format: PixelFormat,
    pub width: usize,
    pub height: usize,
    pub slices: usize,
    pub mips: Vec<CachedMip>,
}

impl CachedTexture {
    pub fn is_resident(&self, index: usize) -> bool {
        self.mips.get(index).is_some_and(|m| m.data.is_some())
    }

    /// Index of the first mip held in the primary record.
    pub fn first_resident_mip(&self) -> Option<usize> {
        self.mips.iter().position(|m| m.data.is_some())
    }
}

type BuildOutcome = std::result::Result<Arc<CachedTexture>, String>;
type InFlight = Arc<Mutex<HashMap<String, Arc<Completion<BuildOutcome>>>>>;

/// Handle to a build started with [`DerivedDataCache::fetch_or_build_async`].
pub struct BuildHandle {
    key: String,
    completion: Arc<Completion<BuildOutcome>>,
}

impl BuildHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_complete()
    }

    pub fn try_get(&self) -> Option<Result<Arc<CachedTexture>>> {
        self.completion.try_get().map(|outcome| self.to_result(outcome))
    }

    /// Blocks until the texture is available.
    pub fn wait(self) -> Result<Arc<CachedTexture>> {
        let outcome = self.completion.wait();
        self.to_result(outcome)
    }

    fn to_result(&self, outcome: BuildOutcome) -> Result<Arc<CachedTexture>> {
        outcome.map_err(|reason| TextureBuildError::BuildFailed {
            key: self.key.clone(),
            reason,
        })
    }
}

/// Content-addressed cache in front of a [`TextureBuildPipeline`].
///
/// Concurrent requests for one key share a single build: the first caller
/// registers an in-flight completion, later callers wait on it. The entry
/// is removed once the build finishes, successfully or not.
pub struct DerivedDataCache<S: BlobStore + 'static> {
    store: Arc<S>,
    pipeline: Arc<TextureBuildPipeline>,
    config: CacheConfig,
    in_flight: InFlight,
}

impl<S: BlobStore + 'static> Clone for DerivedDataCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pipeline: Arc::clone(&self.pipeline),
            config: self.config.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

/// Held by the caller that runs a build. Resolving it, or dropping it
/// during an unwind, removes the in-flight entry and wakes every waiter.
struct LeaderGuard {
    key: String,
    completion: Arc<Completion<BuildOutcome>>,
    in_flight: InFlight,
    resolved: bool,
}

impl LeaderGuard {
    fn resolve(mut self, result: &Result<Arc<CachedTexture>>) {
        self.settle(match result {
            Ok(texture) => Ok(Arc::clone(texture)),
            Err(e) => Err(e.to_string()),
        });
    }

    fn settle(&mut self, outcome: BuildOutcome) {
        self.resolved = true;
        self.in_flight.lock().remove(&self.key);
        self.completion.complete(outcome);
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if !self.resolved {
            warn!(key = %self.key, "build abandoned, failing waiters");
            self.settle(Err("build panicked".to_string()));
        }
    }
}

enum Role {
    Leader(LeaderGuard),
    Follower(Arc<Completion<BuildOutcome>>),
}

impl<S: BlobStore + 'static> DerivedDataCache<S> {
    pub fn new(store: Arc<S>, pipeline: Arc<TextureBuildPipeline>, config: CacheConfig) -> Self {
        Self {
            store,
            pipeline,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Key suffix for `settings`, using the registered format version.
    pub fn cache_key_suffix(&self, source_content_id: &str, settings: &BuildSettings) -> String {
        let format = settings.texture_format_name.as_str();
        let version = self.pipeline.registry().format_version(format);
        cache_key_suffix(source_content_id, settings, format, version)
    }

    pub fn key_for(&self, source_content_id: &str, settings: &BuildSettings) -> String {
        format!(
            "{}_{}",
            self.config.key_prefix,
            self.cache_key_suffix(source_content_id, settings)
        )
    }

    /// Number of builds currently running.
    pub fn in_flight_builds(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Returns the cached texture, building and storing it on a miss.
    #[instrument(skip(self, source, settings), fields(source = %source.content_id))]
    pub fn fetch_or_build(&self, source: &TextureSource, settings: &BuildSettings) -> Result<Arc<CachedTexture>> {
        let key = self.key_for(&source.content_id, settings);
        if let Some(hit) = self.load(&key)? {
            return Ok(Arc::new(hit));
        }

        match self.register(&key) {
            Role::Follower(completion) => {
                debug!(%key, "joining in-flight build");
                BuildHandle { key, completion }.wait()
            }
            Role::Leader(guard) => {
                let result = self.load_or_build(&key, source, settings);
                guard.resolve(&result);
                result
            }
        }
    }

    /// Starts [`fetch_or_build`](Self::fetch_or_build) on the worker pool.
    ///
    /// A build that panics is reported to every handle as `BuildFailed`.
    pub fn fetch_or_build_async(&self, source: TextureSource, settings: BuildSettings) -> BuildHandle {
        let key = self.key_for(&source.content_id, &settings);
        let guard = match self.register(&key) {
            Role::Follower(completion) => {
                debug!(%key, "joining in-flight build");
                return BuildHandle { key, completion };
            }
            Role::Leader(guard) => guard,
        };
        let completion = Arc::clone(&guard.completion);

        let cache = self.clone();
        let task_key = key.clone();
        rayon::spawn(move || {
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| cache.load_or_build(&task_key, &source, &settings)));
            match result {
                Ok(result) => guard.resolve(&result),
                Err(_) => error!(key = %task_key, "texture build panicked"),
            }
        });

        BuildHandle { key, completion }
    }

    /// Loads one streamed mip of `texture`, or clones it when resident.
    pub fn fetch_streamed_mip(&self, texture: &CachedTexture, index: usize) -> Result<Vec<u8>> {
        let mip = texture.mips.get(index).ok_or_else(|| TextureBuildError::CacheCorrupt {
            key: texture.key.clone(),
            reason: format!("no mip {index}"),
        })?;
        if let Some(data) = &mip.data {
            return Ok(data.clone());
        }

        let key = streamed_mip_key(&texture.key, index, mip.width, mip.height);
        let data = self.store.get(&key)?.ok_or_else(|| TextureBuildError::CacheCorrupt {
            key: key.clone(),
            reason: "streamed mip missing".to_string(),
        })?;
        let expected = texture.pixel_format.data_size(mip.width, mip.height, texture.slices);
        if data.len() != expected {
            return Err(TextureBuildError::CacheCorrupt {
                key,
                reason: format!("expected {expected} bytes, found {}", data.len()),
            });
        }
        Ok(data)
    }

    fn register(&self, key: &str) -> Role {
        let mut in_flight = self.in_flight.lock();
        if let Some(existing) = in_flight.get(key) {
            return Role::Follower(Arc::clone(existing));
        }
        let completion = Arc::new(Completion::new());
        in_flight.insert(key.to_string(), Arc::clone(&completion));
        Role::Leader(LeaderGuard {
            key: key.to_string(),
            completion,
            in_flight: Arc::clone(&self.in_flight),
            resolved: false,
        })
    }

    /// Reads the primary record. Corrupt records count as a miss.
    fn load(&self, key: &str) -> Result<Option<CachedTexture>> {
        let Some(bytes) = self.store.get(key)? else {
            debug!(%key, "cache miss");
            return Ok(None);
        };
        let record = match PrimaryRecord::decode(key, &bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(%key, error = %e, "discarding cached record");
                return Ok(None);
            }
        };

        debug!(%key, mips = record.mips.len(), "cache hit");
        Ok(Some(CachedTexture {
            key: key.to_string(),
            pixel_format: record.pixel_format,
            width: record.width as usize,
            height: record.height as usize,
            slices: record.slices as usize,
            mips: record
                .mips
                .into_iter()
                .map(|m| CachedMip {
                    width: m.width as usize,
                    height: m.height as usize,
                    data: m.inline_data,
                })
                .collect(),
        }))
    }

    /// Leader path: a build that finished between the first lookup and
    /// registration has already stored its result.
    fn load_or_build(&self, key: &str, source: &TextureSource, settings: &BuildSettings) -> Result<Arc<CachedTexture>> {
        match self.load(key)? {
            Some(hit) => Ok(Arc::new(hit)),
            None => self.build_and_store(key, source, settings).map(Arc::new),
        }
    }

    fn build_and_store(&self, key: &str, source: &TextureSource, settings: &BuildSettings) -> Result<CachedTexture> {
        info!(%key, "building derived texture data");
        let mips = self
            .pipeline
            .build_texture(&source.mips, source.composite_mips.as_deref(), settings)?;
        self.store_mips(key, mips, settings.streamable)
    }

    /// Writes streamed mips first so a stored primary record never refers
    /// to a missing blob.
    fn store_mips(&self, key: &str, mips: Vec<CompressedMip>, streamable: bool) -> Result<CachedTexture> {
        let top = mips.first().ok_or_else(|| TextureBuildError::BuildFailed {
            key: key.to_string(),
            reason: "build produced no mips".to_string(),
        })?;
        let (pixel_format, width, height, slices) = (top.pixel_format, top.width, top.height, top.slices);
        let first_inline = if streamable {
            mips.len().saturating_sub(self.config.inline_mip_count)
        } else {
            0
        };

        let mut entries = Vec::with_capacity(mips.len());
        for (index, mip) in mips.iter().enumerate() {
            let inline_data = if index < first_inline {
                self.store
                    .put(&streamed_mip_key(key, index, mip.width, mip.height), &mip.data)?;
                None
            } else {
                Some(mip.data.clone())
            };
            entries.push(MipEntry {
                index: index as u32,
                width: mip.width as u32,
                height: mip.height as u32,
                inline_data,
            });
        }

        let record = PrimaryRecord::new(pixel_format, width as u32, height as u32, slices as u32, entries);
        self.store.put(key, &record.encode()?)?;
        debug!(%key, mips = mips.len(), streamed = first_inline, "stored derived texture data");

        Ok(CachedTexture {
            key: key.to_string(),
            pixel_format,
            width,
            height,
            slices,
            mips: mips
                .into_iter()
                .map(|m| CachedMip {
                    width: m.width,
                    height: m.height,
                    data: Some(m.data),
                })
                .collect(),
        })
    }
}
