use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use super::angular::{cone_angle_for_mip, input_mip_for_cone, texel_area_table};
use super::faces::{sphere_cone_intersection, world_direction_at_texel_center};
use super::*;
use crate::texture_pipeline::image::{LinearColor, LinearImage};

#[test]
fn test_face_direction_round_trip() {
    let inv_extent = 1.0 / 8.0;
    for face in 0..CUBE_FACES {
        for (x, y) in [(0, 0), (3, 5), (7, 7), (7, 0)] {
            let side = side_direction_at_texel_center(x, y, inv_extent);
            let back = world_to_side(face, side_to_world(face, side));
            assert!((back - side).length() < 1e-6, "face {face} texel ({x}, {y})");
        }
    }
}

#[test]
fn test_face_centers_point_along_axes() {
    let expected = [Vec3::X, -Vec3::X, Vec3::Z, -Vec3::Z, Vec3::Y, -Vec3::Y];
    for (face, axis) in expected.into_iter().enumerate() {
        let center = side_to_world(face, Vec3::Z);
        assert!((center - axis).length() < 1e-6, "face {face}: {center:?}");
    }
}

#[test]
fn test_sphere_cone_intersection() {
    let axis = Vec3::Z;
    let (sin, cos) = (0.5f32.sin(), 0.5f32.cos());

    assert!(sphere_cone_intersection(Vec3::new(0.0, 0.0, 5.0), 0.1, axis, sin, cos));
    assert!(!sphere_cone_intersection(Vec3::new(0.0, 0.0, -5.0), 0.1, axis, sin, cos));
    assert!(!sphere_cone_intersection(Vec3::new(5.0, 0.0, 0.1), 0.1, axis, sin, cos));
    // sphere around the apex
    assert!(sphere_cone_intersection(Vec3::new(0.0, 0.0, -0.05), 0.1, axis, sin, cos));
}

#[test]
fn test_texel_areas_shrink_towards_corners() {
    let areas = texel_area_table(8);
    let center = areas[3 + 3 * 8];
    let corner = areas[0];
    assert!(corner < center);
    assert!(areas.iter().all(|&a| a > 0.0));
}

#[test]
fn test_long_lat_cube_extent() {
    assert_eq!(long_lat_cube_extent(512, 128), 128);
    assert_eq!(long_lat_cube_extent(512, 4096), 256);
    assert_eq!(long_lat_cube_extent(600, 4096), 256);
    assert_eq!(long_lat_cube_extent(40, 4096), 32);
    assert_eq!(long_lat_cube_extent(64, 16), 16);
}

#[test]
fn test_long_lat_orientation() {
    let mut panorama = LinearImage::filled(64, 32, 1, LinearColor::BLACK);
    for y in 0..16 {
        for x in 0..64 {
            panorama.set(x, y, 0, LinearColor::WHITE);
        }
    }

    let cube = generate_base_cube_mip(&panorama, 1024);
    assert_eq!((cube.width, cube.height, cube.slices), (32, 32, 6));
    assert!(cube.slice(4).pixels.iter().all(|p| p.equals_within(&LinearColor::WHITE, 1e-5)));
    assert!(cube.slice(5).pixels.iter().all(|p| p.equals_within(&LinearColor::BLACK, 1e-5)));
}

#[test]
fn test_long_lat_wraps_longitude() {
    let mut panorama = LinearImage::filled(4, 2, 1, LinearColor::BLACK);
    panorama.set(0, 0, 0, LinearColor::WHITE);
    let view = LongLatView::new(&panorama);

    // halfway between the last and first column
    let sample = view.lookup_filtered(3.5, 0.0);
    assert!((sample.r - 0.5).abs() < 1e-6);
    let below = view.lookup_filtered(0.0, 10.0);
    assert_eq!(below, LinearColor::BLACK);
}

#[test]
fn test_cone_angles() {
    let top = cone_angle_for_mip(0, 8, 128, 0);
    assert!((top - FRAC_PI_2 / 128.0).abs() < 1e-6);
    assert!((cone_angle_for_mip(7, 8, 128, 0) - FRAC_PI_2).abs() < 1e-6);

    // diffuse level past the chain still gives a finite cone
    let clamped = cone_angle_for_mip(1, 8, 128, 20);
    assert!((clamped - FRAC_PI_2).abs() < 1e-6);

    assert_eq!(input_mip_for_cone(FRAC_PI_2, 8), 4);
    assert_eq!(input_mip_for_cone(0.002, 8), 0);
}

#[test]
fn test_uniform_cube_stays_uniform() {
    let color = LinearColor::new(0.25, 0.5, 2.0, 1.0);
    let chain = vec![LinearImage::filled(16, 16, 6, color)];

    let mips = generate_angular_filtered_mips(chain, 5, 0, usize::MAX);
    let extents: Vec<_> = mips.iter().map(|m| m.width).collect();
    assert_eq!(extents, vec![16, 8, 4, 2, 1]);

    for mip in &mips {
        assert_eq!(mip.slices, 6);
        for p in &mip.pixels {
            assert!((p.r - color.r).abs() < 1e-4 && (p.g - color.g).abs() < 1e-4 && (p.b - color.b).abs() < 1e-4);
            assert_eq!(p.a, 0.0);
        }
    }
}

#[test]
fn test_cone_only_sees_its_hemisphere() {
    // +X face red, everything else black
    let mut cube = LinearImage::filled(8, 8, 6, LinearColor::BLACK);
    cube.slice_pixels_mut(0).fill(LinearColor::new(1.0, 0.0, 0.0, 1.0));
    let areas = texel_area_table(8);

    let facing = integrate_angular_area(&cube, Vec3::X, 0.2, &areas);
    assert!(facing.r > 0.99);

    let opposite = integrate_angular_area(&cube, -Vec3::X, FRAC_PI_2, &areas);
    assert!(opposite.r.abs() < 1e-6);

    let side = integrate_angular_area(&cube, Vec3::Z, FRAC_PI_2, &areas);
    assert!(side.r > 0.0 && side.r < 1.0);
}

#[test]
fn test_parallel_faces_match_sequential() {
    let mut cube = LinearImage::new(8, 8, 6);
    for (i, p) in cube.pixels.iter_mut().enumerate() {
        *p = LinearColor::new((i % 7) as f32 / 7.0, (i % 5) as f32 / 5.0, 0.5, 1.0);
    }

    let parallel = generate_angular_filtered_mip(&cube, 4, 0.4, 1);
    let sequential = generate_angular_filtered_mip(&cube, 4, 0.4, usize::MAX);
    assert_eq!(parallel, sequential);
}

#[test]
fn test_world_direction_is_normalized() {
    for face in 0..CUBE_FACES {
        let dir = world_direction_at_texel_center(face, 1, 2, 1.0 / 4.0);
        assert!((dir.length() - 1.0).abs() < 1e-6);
    }
}
