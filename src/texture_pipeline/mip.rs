//! Mip generation module
//!
//! Separable filter kernels and the downsampling chain built on them.

pub mod generator;
pub mod kernel;

#[cfg(test)]
mod tests;

pub use generator::{
    AddressMode, MipFilterParams, compute_alpha_coverage, compute_alpha_scale, full_chain_length,
    generate_mip_border, generate_mip_chain, generate_sharpened_mip, generate_top_mip, lookup_source_mip,
    next_mip_size, top_mip_kernel_size,
};
pub use kernel::SeparableKernel2D;
