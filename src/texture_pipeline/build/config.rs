use crate::texture_pipeline::compression::BandConfig;

/// Size thresholds that decide when work fans out to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Mips whose smaller side reaches this size are compressed in parallel.
    pub min_parallel_mip_dimension: usize,
    /// Cube faces at least this wide are angular-filtered in parallel.
    pub min_parallel_face_extent: usize,
    pub band_rows: usize,
    pub min_band_parallel_height: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_parallel_mip_dimension: 128,
            min_parallel_face_extent: 128,
            band_rows: 64,
            min_band_parallel_height: 256,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn band_config(&self) -> BandConfig {
        BandConfig {
            band_rows: self.band_rows,
            min_parallel_height: self.min_band_parallel_height,
        }
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    min_parallel_mip_dimension: Option<usize>,
    min_parallel_face_extent: Option<usize>,
    band_rows: Option<usize>,
    min_band_parallel_height: Option<usize>,
}

impl PipelineConfigBuilder {
    pub fn min_parallel_mip_dimension(mut self, dimension: usize) -> Self {
        self.min_parallel_mip_dimension = Some(dimension);
        self
    }

    pub fn min_parallel_face_extent(mut self, extent: usize) -> Self {
        self.min_parallel_face_extent = Some(extent);
        self
    }

    pub fn band_rows(mut self, rows: usize) -> Self {
        self.band_rows = Some(rows);
        self
    }

    pub fn min_band_parallel_height(mut self, height: usize) -> Self {
        self.min_band_parallel_height = Some(height);
        self
    }

    /// Disables every parallel path.
    pub fn sequential(self) -> Self {
        self.min_parallel_mip_dimension(usize::MAX)
            .min_parallel_face_extent(usize::MAX)
            .min_band_parallel_height(usize::MAX)
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            min_parallel_mip_dimension: self
                .min_parallel_mip_dimension
                .unwrap_or(default.min_parallel_mip_dimension),
            min_parallel_face_extent: self.min_parallel_face_extent.unwrap_or(default.min_parallel_face_extent),
            band_rows: self.band_rows.unwrap_or(default.band_rows),
            min_band_parallel_height: self.min_band_parallel_height.unwrap_or(default.min_band_parallel_height),
        }
    }
}
