#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Streamable textures keep this many of their smallest mips inline.
    pub inline_mip_count: usize,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            inline_mip_count: 7,
            key_prefix: "TEXTURE".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct CacheConfigBuilder {
    inline_mip_count: Option<usize>,
    key_prefix: Option<String>,
}

impl CacheConfigBuilder {
    pub fn inline_mip_count(mut self, count: usize) -> Self {
        self.inline_mip_count = Some(count);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> CacheConfig {
        let default = CacheConfig::default();
        CacheConfig {
            inline_mip_count: self.inline_mip_count.unwrap_or(default.inline_mip_count),
            key_prefix: self.key_prefix.unwrap_or(default.key_prefix),
        }
    }
}
