//! Texture build module
//!
//! Turns source mips into a complete compressed mip chain.

pub mod config;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use pipeline::TextureBuildPipeline;
