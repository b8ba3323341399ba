use tracing::debug;

use crate::texture_pipeline::image::{LinearColor, LinearImage};
use crate::texture_pipeline::settings::PowerOfTwoMode;

/// Target size for `mode`, or `None` when the image is left as is.
pub fn padded_size(width: usize, height: usize, mode: PowerOfTwoMode) -> Option<(usize, usize)> {
    let (w, h) = (width.next_power_of_two(), height.next_power_of_two());
    match mode {
        PowerOfTwoMode::None => None,
        PowerOfTwoMode::PadToPowerOfTwo => Some((w, h)),
        PowerOfTwoMode::PadToSquarePowerOfTwo => {
            let side = w.max(h);
            Some((side, side))
        }
    }
}

/// Copies `image` into the top-left corner of a power-of-two canvas filled
/// with `fill`.
pub fn pad_to_power_of_two(image: &LinearImage, mode: PowerOfTwoMode, fill: LinearColor) -> Option<LinearImage> {
    let (width, height) = padded_size(image.width, image.height, mode)?;
    debug!(
        from_width = image.width,
        from_height = image.height,
        width,
        height,
        "padding to power of two"
    );

    let mut padded = LinearImage::filled(width, height, image.slices, fill);
    for slice in 0..image.slices {
        let src = image.slice(slice);
        let dst = padded.slice_pixels_mut(slice);
        for (y, row) in src.pixels.chunks_exact(src.width).enumerate() {
            dst[y * width..y * width + src.width].copy_from_slice(row);
        }
    }
    Some(padded)
}
