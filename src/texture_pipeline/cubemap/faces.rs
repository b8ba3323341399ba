//! Cube face axis tables and direction helpers.
//!
//! Face order is +X, -X, +Z, -Z, +Y, -Y in world space (Z up). Side space
//! is the face-local frame where the face plane sits at `z = 1` and texel
//! coordinates run along +x/+y.

use glam::Vec3;

pub const CUBE_FACES: usize = 6;

/// Maps a side-space direction of `face` to world space.
pub fn side_to_world(face: usize, dir: Vec3) -> Vec3 {
    let Vec3 { x, y, z } = dir;
    let ret = match face {
        0 => Vec3::new(z, -y, -x),
        1 => Vec3::new(-z, -y, x),
        2 => Vec3::new(x, z, y),
        3 => Vec3::new(x, -z, -y),
        4 => Vec3::new(x, -y, z),
        5 => Vec3::new(-x, -y, -z),
        _ => panic!("cube face {face} out of range"),
    };
    // y and z swapped for the Z-up world
    Vec3::new(ret.x, ret.z, ret.y)
}

/// Inverse of [`side_to_world`].
pub fn world_to_side(face: usize, dir: Vec3) -> Vec3 {
    let (x, y, z) = (dir.x, dir.z, dir.y);
    match face {
        0 => Vec3::new(-z, -y, x),
        1 => Vec3::new(z, -y, -x),
        2 => Vec3::new(x, z, y),
        3 => Vec3::new(x, -z, -y),
        4 => Vec3::new(x, -y, z),
        5 => Vec3::new(-x, -y, -z),
        _ => panic!("cube face {face} out of range"),
    }
}

/// Normalized side-space direction through the center of texel `(x, y)`.
#[inline]
pub fn side_direction_at_texel_center(x: usize, y: usize, inv_extent: f32) -> Vec3 {
    Vec3::new(
        (x as f32 + 0.5) * inv_extent * 2.0 - 1.0,
        (y as f32 + 0.5) * inv_extent * 2.0 - 1.0,
        1.0,
    )
    .normalize()
}

#[inline]
pub fn world_direction_at_texel_center(face: usize, x: usize, y: usize, inv_extent: f32) -> Vec3 {
    side_to_world(face, side_direction_at_texel_center(x, y, inv_extent))
}

/// Area of texel `(x, y)` projected onto the unit sphere, used to weight
/// the smaller corner texels correctly during integration.
pub fn texel_area(x: usize, y: usize, inv_extent: f32) -> f32 {
    let step = inv_extent * 2.0;
    let u = x as f32 * step - 1.0;
    let v = y as f32 * step - 1.0;

    let a = Vec3::new(u, v, 1.0).normalize();
    let b = Vec3::new(u + step, v, 1.0).normalize();
    let c = Vec3::new(u, v + step, 1.0).normalize();
    let d = Vec3::new(u + step, v + step, 1.0).normalize();

    0.5 * ((a - b).cross(c - b).length() + (c - b).cross(d - b).length())
}

/// Sphere/cone overlap test with the cone apex at the origin.
///
/// `axis` must be normalized. See Eberly, "Intersection of a Sphere and a
/// Cone".
pub fn sphere_cone_intersection(center: Vec3, radius: f32, axis: Vec3, sin_angle: f32, cos_angle: f32) -> bool {
    let u = axis * (-radius / sin_angle);
    let d = center - u;
    let dsqr = d.dot(d);
    let e = axis.dot(d);

    if e > 0.0 && e * e >= dsqr * cos_angle * cos_angle {
        let dsqr = center.dot(center);
        let e = -axis.dot(center);
        if e > 0.0 && e * e >= dsqr * sin_angle * sin_angle {
            dsqr <= radius * radius
        } else {
            true
        }
    } else {
        false
    }
}
