//! Angular (cone) convolution of cubemap mips for image based lighting.
//!
//! Each output texel integrates the source cube over a cone around its
//! direction. A quadtree walk per face culls texels outside the cone so wide
//! cones stay tractable.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use rayon::prelude::*;
use tracing::{debug, trace};

use super::faces::{
    CUBE_FACES, side_direction_at_texel_center, sphere_cone_intersection, texel_area, world_direction_at_texel_center,
    world_to_side,
};
use crate::texture_pipeline::image::{LinearColor, LinearImage};

const MIN_CONE_ANGLE: f32 = 0.002;
const MAX_DIR_DOT: f32 = 0.9999;
/// sqrt(2 * 2 + 2 * 2), diagonal of the [-1, 1] face.
const FACE_DIAGONAL: f32 = 2.828_427_1;
/// Radius of the sphere with surface area 1.
const UNIT_AREA_SPHERE_RADIUS: f32 = 0.282_094_78;
/// Higher values integrate from finer source mips.
const INPUT_MIP_QUALITY_BIAS: f32 = 3.0;

/// Accumulates cone-weighted color over one face of the source cube.
struct TexelProcessor<'a> {
    cone_axis: Vec3,
    cone_sin: f32,
    cone_cos: f32,
    dir_dot: f32,
    inv_one_minus_dir_dot: f32,
    position_to_world: f32,
    radius_to_world: f32,
    inv_extent: f32,
    extent: usize,
    face: &'a [LinearColor],
    areas: &'a [f32],
    accumulated: LinearColor,
}

impl<'a> TexelProcessor<'a> {
    fn new(cone_axis: Vec3, cone_angle: f32, face: &'a [LinearColor], areas: &'a [f32], extent: usize) -> Self {
        let dir_dot = cone_angle.cos().min(MAX_DIR_DOT);
        Self {
            cone_axis,
            cone_sin: cone_angle.sin(),
            cone_cos: cone_angle.cos(),
            dir_dot,
            inv_one_minus_dir_dot: 1.0 / (1.0 - dir_dot),
            // positions span [-1, 1] across `extent` texels
            position_to_world: 2.0 / extent as f32,
            radius_to_world: FACE_DIAGONAL / extent as f32,
            inv_extent: 1.0 / extent as f32,
            extent,
            face,
            areas,
            accumulated: LinearColor::TRANSPARENT,
        }
    }

    fn is_relevant(&self, x: usize, y: usize, width: usize, height: usize) -> bool {
        let u = (x as f32 + width as f32 * 0.5) * self.position_to_world - 1.0;
        let v = (y as f32 + height as f32 * 0.5) * self.position_to_world - 1.0;
        let radius = self.radius_to_world * width.max(height) as f32;
        sphere_cone_intersection(Vec3::new(u, v, 1.0), radius, self.cone_axis, self.cone_sin, self.cone_cos)
    }

    fn process(&mut self, x: usize, y: usize) {
        let dir = side_direction_at_texel_center(x, y, self.inv_extent);
        let dot = self.cone_axis.dot(dir);
        if dot <= self.dir_dot {
            return;
        }

        // 1 at the cone center, 0 at its rim, smoothstepped
        let t = 1.0 - (1.0 - dot) * self.inv_one_minus_dir_dot;
        let kernel = t * t * (3.0 - 2.0 * t);

        let index = x + y * self.extent;
        let weight = kernel * self.areas[index];
        let texel = self.face[index];
        self.accumulated.r += weight * texel.r;
        self.accumulated.g += weight * texel.g;
        self.accumulated.b += weight * texel.b;
        self.accumulated.a += weight;
    }

    /// Quadtree walk over the face, descending only into regions whose
    /// bounding sphere touches the cone.
    fn rasterize(&mut self) {
        let mut stack = vec![(0usize, 0usize, self.extent, self.extent)];
        while let Some((x, y, width, height)) = stack.pop() {
            if width == 1 && height == 1 {
                self.process(x, y);
                continue;
            }
            if !self.is_relevant(x, y, width, height) {
                continue;
            }
            let (w0, h0) = (width - width / 2, height - height / 2);
            let (w1, h1) = (width / 2, height / 2);
            for (cx, cy, cw, ch) in [
                (x, y, w0, h0),
                (x + w0, y, w1, h0),
                (x, y + h0, w0, h1),
                (x + w0, y + h0, w1, h1),
            ] {
                if cw > 0 && ch > 0 {
                    stack.push((cx, cy, cw, ch));
                }
            }
        }
    }
}

/// Per-texel solid-angle weights for one face; identical for all six.
pub fn texel_area_table(extent: usize) -> Vec<f32> {
    let inv_extent = 1.0 / extent as f32;
    (0..extent * extent)
        .map(|i| texel_area(i % extent, i / extent, inv_extent))
        .collect()
}

/// Cone-weighted average of `cube` around world-space `direction`.
/// Alpha is cleared; it only carries the weight during accumulation.
pub fn integrate_angular_area(cube: &LinearImage, direction: Vec3, cone_angle: f32, areas: &[f32]) -> LinearColor {
    let extent = cube.width;
    let mut total = LinearColor::TRANSPARENT;
    for face in 0..CUBE_FACES {
        let axis = world_to_side(face, direction);
        let mut processor = TexelProcessor::new(axis, cone_angle, cube.slice(face).pixels, areas, extent);
        processor.rasterize();
        total += processor.accumulated;
    }

    if total.a != 0.0 {
        let inv = 1.0 / total.a;
        total.r *= inv;
        total.g *= inv;
        total.b *= inv;
    }
    total.a = 0.0;
    total
}

/// Fills a new `extent` cube by integrating `source` with `cone_angle`.
/// Faces run in parallel when the source face is at least
/// `min_parallel_extent` texels wide.
pub fn generate_angular_filtered_mip(
    source: &LinearImage,
    extent: usize,
    cone_angle: f32,
    min_parallel_extent: usize,
) -> LinearImage {
    let areas = texel_area_table(source.width);
    let inv_extent = 1.0 / extent as f32;
    let face_len = extent * extent;

    let fill_face = |face: usize, pixels: &mut [LinearColor]| {
        for y in 0..extent {
            for x in 0..extent {
                let dir = world_direction_at_texel_center(face, x, y, inv_extent);
                pixels[x + y * extent] = integrate_angular_area(source, dir, cone_angle, &areas);
            }
        }
    };

    let mut dest = LinearImage::new(extent, extent, CUBE_FACES);
    if source.width >= min_parallel_extent {
        dest.pixels
            .par_chunks_mut(face_len)
            .enumerate()
            .for_each(|(face, pixels)| fill_face(face, pixels));
    } else {
        dest.pixels
            .chunks_mut(face_len)
            .enumerate()
            .for_each(|(face, pixels)| fill_face(face, pixels));
    }
    dest
}

/// 2x2 box average of every face.
fn box_downsample_cube(base: &LinearImage) -> LinearImage {
    let extent = (base.width >> 1).max(1);
    let mut mip = LinearImage::new(extent, extent, base.slices);
    for face in 0..base.slices {
        let src = base.slice(face);
        let lo = |i: usize| (i * 2).min(src.width - 1);
        let hi = |i: usize| (i * 2 + 1).min(src.width - 1);
        let pixels = mip.slice_pixels_mut(face);
        for y in 0..extent {
            for x in 0..extent {
                let sum = src.at(lo(x), lo(y)) + src.at(hi(x), lo(y)) + src.at(lo(x), hi(y)) + src.at(hi(x), hi(y));
                pixels[x + y * extent] = sum * 0.25;
            }
        }
    }
    mip
}

/// Cone half-angle for output level `mip` of `num_mips`, going from nearly
/// sharp at the top to a hemisphere at `diffuse_level`.
pub fn cone_angle_for_mip(mip: usize, num_mips: usize, base_extent: usize, diffuse_level: usize) -> f32 {
    let denominator = num_mips.saturating_sub(diffuse_level).max(1) as f32;
    let normalized_level = mip as f32 / denominator;
    let adjusted_level = normalized_level * num_mips as f32;
    let normalized_width = base_extent as f32 * 2f32.powf(-adjusted_level);
    (FRAC_PI_2 / normalized_width).clamp(MIN_CONE_ANGLE, FRAC_PI_2)
}

/// Picks the box-filtered source level to integrate a cone from.
pub fn input_mip_for_cone(cone_angle: f32, num_mips: usize) -> usize {
    let segment_height = UNIT_AREA_SPHERE_RADIUS * (1.0 - cone_angle.cos());
    let covered_area = 2.0 * PI * UNIT_AREA_SPHERE_RADIUS * segment_height;
    let level = 0.5 * covered_area.log2() + num_mips as f32 - INPUT_MIP_QUALITY_BIAS;
    (level.trunc().max(0.0) as usize).min(num_mips.saturating_sub(1))
}

/// Replaces `chain` (top cube first) with `num_mips` angularly filtered
/// levels. Missing source levels are box filtered first and only serve as
/// integration inputs.
pub fn generate_angular_filtered_mips(
    mut chain: Vec<LinearImage>,
    num_mips: usize,
    diffuse_level: usize,
    min_parallel_extent: usize,
) -> Vec<LinearImage> {
    assert!(!chain.is_empty(), "angular filtering needs a base cube");
    let base_extent = chain[0].width;
    let num_mips = num_mips.clamp(1, base_extent.max(1).ilog2() as usize + 1);

    while chain.len() < num_mips {
        let next = box_downsample_cube(&chain[chain.len() - 1]);
        chain.push(next);
    }

    let mut output = Vec::with_capacity(num_mips);
    let mut extent = base_extent;
    for mip in 0..num_mips {
        let cone_angle = cone_angle_for_mip(mip, num_mips, base_extent, diffuse_level);
        let input_mip = input_mip_for_cone(cone_angle, num_mips);
        trace!(
            mip,
            extent,
            input_mip,
            cone_deg = cone_angle.to_degrees(),
            "angular filter level"
        );
        output.push(generate_angular_filtered_mip(&chain[input_mip], extent, cone_angle, min_parallel_extent));
        extent = (extent >> 1).max(1);
    }
    debug!(num_mips, base_extent, diffuse_level, "angular filtered mips");
    output
}
