pub mod logger;
pub mod texture_pipeline;
