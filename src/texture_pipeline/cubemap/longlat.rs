//! Equirectangular panorama to cubemap conversion.

use std::f32::consts::PI;

use glam::Vec3;
use tracing::debug;

use super::faces::{CUBE_FACES, world_direction_at_texel_center};
use crate::texture_pipeline::image::{LinearColor, LinearImage};

const MIN_CUBE_EXTENT: usize = 32;

/// Bilinear, direction-addressed view of a long/lat image. Longitude wraps,
/// latitude clamps.
pub struct LongLatView<'a> {
    width: usize,
    height: usize,
    pixels: &'a [LinearColor],
}

impl<'a> LongLatView<'a> {
    pub fn new(image: &'a LinearImage) -> Self {
        let slice = image.slice(0);
        Self {
            width: slice.width,
            height: slice.height,
            pixels: slice.pixels,
        }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> LinearColor {
        self.pixels[x + y * self.width]
    }

    pub fn lookup_filtered(&self, x: f32, y: f32) -> LinearColor {
        let x0 = x.floor();
        let y0 = y.floor();
        let frac_x = x - x0;
        let frac_y = y - y0;

        let w = self.width as i64;
        let max_y = self.height as i64 - 1;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let wx0 = x0.rem_euclid(w) as usize;
        let wx1 = (x0 + 1).rem_euclid(w) as usize;
        let cy0 = y0.clamp(0, max_y) as usize;
        let cy1 = (y0 + 1).clamp(0, max_y) as usize;

        let top = self.at(wx0, cy0).lerp(self.at(wx1, cy0), frac_x);
        let bottom = self.at(wx0, cy1).lerp(self.at(wx1, cy1), frac_x);
        top.lerp(bottom, frac_y)
    }

    /// Samples along a normalized world-space direction.
    pub fn lookup_direction(&self, dir: Vec3) -> LinearColor {
        let x = (1.0 + dir.x.atan2(-dir.z) / PI) / 2.0 * self.width as f32;
        let y = dir.y.clamp(-1.0, 1.0).acos() / PI * self.height as f32;
        self.lookup_filtered(x, y)
    }
}

/// Face edge length for a panorama `width` texels wide.
pub fn long_lat_cube_extent(width: usize, max_resolution: usize) -> usize {
    let half = (width / 2).max(1);
    (1usize << half.ilog2()).max(MIN_CUBE_EXTENT).min(max_resolution.max(1))
}

/// Resamples a long/lat panorama into a 6-slice cube base mip.
pub fn generate_base_cube_mip(panorama: &LinearImage, max_resolution: usize) -> LinearImage {
    let extent = long_lat_cube_extent(panorama.width, max_resolution);
    let inv_extent = 1.0 / extent as f32;
    debug!(
        src_width = panorama.width,
        src_height = panorama.height,
        extent,
        "long/lat to cube"
    );

    let view = LongLatView::new(panorama);
    let mut cube = LinearImage::new(extent, extent, CUBE_FACES);
    for face in 0..CUBE_FACES {
        let pixels = cube.slice_pixels_mut(face);
        for y in 0..extent {
            for x in 0..extent {
                let dir = world_direction_at_texel_center(face, x, y, inv_extent);
                pixels[x + y * extent] = view.lookup_direction(dir);
            }
        }
    }
    cube
}
