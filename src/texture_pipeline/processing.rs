//! Image processing module
//!
//! Per-pixel passes run on the linear working copy between mip generation
//! and compression.

pub mod channels;
pub mod color;
pub mod composite;
pub mod padding;


pub use channels::{
    detect_alpha_channel, flip_green_channel, normalize_mip, replicate_alpha_channel, replicate_red_channel,
};
pub use color::{adjust_image_colors, compute_bokeh_alpha};
pub use composite::{apply_composite_texture, toksvig_roughness};
pub use padding::{pad_to_power_of_two, padded_size};
