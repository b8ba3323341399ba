//! Image buffer module
//!
//! Tagged pixel buffers plus the linear RGBA32F working representation.

mod convert;
pub mod types;


pub use convert::{linear_to_srgb, srgb_to_linear};
pub(crate) use convert::{encode_u8, quantize_u8};
pub use types::{ColorSpace, Image, LinearColor, LinearImage, RawFormat, SliceView};
