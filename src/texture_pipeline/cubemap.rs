//! Cubemap module
//!
//! Long/lat to cube resampling and angular filtering of cube mip chains.

pub mod angular;
pub mod faces;
pub mod longlat;

#[cfg(test)]
mod tests;

pub use angular::{generate_angular_filtered_mip, generate_angular_filtered_mips, integrate_angular_area};
pub use faces::{CUBE_FACES, side_direction_at_texel_center, side_to_world, world_to_side};
pub use longlat::{LongLatView, generate_base_cube_mip, long_lat_cube_extent};
