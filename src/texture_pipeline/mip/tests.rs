use super::*;
use crate::texture_pipeline::image::{LinearColor, LinearImage};
use crate::texture_pipeline::settings::BuildSettings;

fn gradient_alpha(width: usize, height: usize) -> LinearImage {
    let mut image = LinearImage::new(width, height, 1);
    for y in 0..height {
        for x in 0..width {
            let a = (x as f32 + 0.5) / width as f32;
            image.set(x, y, 0, LinearColor::new(0.5, 0.5, 0.5, a));
        }
    }
    image
}

#[test]
fn test_chain_stops_at_one_by_one() {
    let base = LinearImage::filled(16, 4, 1, LinearColor::WHITE);
    let chain = generate_mip_chain(&BuildSettings::default(), &base, usize::MAX);

    let sizes: Vec<_> = chain.iter().map(|m| (m.width, m.height)).collect();
    assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    assert_eq!(chain.len() + 1, full_chain_length(16, 4));
}

#[test]
fn test_chain_respects_depth_limit() {
    let base = LinearImage::filled(64, 64, 2, LinearColor::WHITE);
    let chain = generate_mip_chain(&BuildSettings::default(), &base, 2);
    assert_eq!(chain.len(), 2);
    assert_eq!((chain[1].width, chain[1].height, chain[1].slices), (16, 16, 2));
}

#[test]
fn test_one_by_one_base_has_no_chain() {
    let base = LinearImage::filled(1, 1, 1, LinearColor::WHITE);
    assert!(generate_mip_chain(&BuildSettings::default(), &base, usize::MAX).is_empty());
}

#[test]
fn test_uniform_image_stays_uniform() {
    let color = LinearColor::new(0.2, 0.4, 0.6, 0.8);
    let base = LinearImage::filled(32, 32, 1, color);
    let settings = BuildSettings::builder().mip_sharpening(0.5, 6).build();

    for mip in generate_mip_chain(&settings, &base, usize::MAX) {
        for pixel in &mip.pixels {
            assert!(pixel.equals_within(&color, 1e-4), "{pixel:?}");
        }
    }
}

#[test]
fn test_box_filter_averages_blocks() {
    let mut base = LinearImage::new(2, 2, 1);
    base.pixels = vec![
        LinearColor::new(1.0, 0.0, 0.0, 1.0),
        LinearColor::new(0.0, 1.0, 0.0, 1.0),
        LinearColor::new(0.0, 0.0, 1.0, 1.0),
        LinearColor::new(1.0, 1.0, 1.0, 1.0),
    ];
    let chain = generate_mip_chain(&BuildSettings::default(), &base, usize::MAX);
    assert_eq!(chain.len(), 1);
    assert!(chain[0].pixels[0].equals_within(&LinearColor::new(0.5, 0.5, 0.5, 1.0), 1e-6));
}

#[test]
fn test_lookup_address_modes() {
    let image = gradient_alpha(4, 1);
    let view = image.slice(0);

    assert_eq!(lookup_source_mip(&view, AddressMode::Wrap, -1, 0), view.at(3, 0));
    assert_eq!(lookup_source_mip(&view, AddressMode::Wrap, 5, 2), view.at(1, 0));
    assert_eq!(lookup_source_mip(&view, AddressMode::Clamp, -3, 7), view.at(0, 0));
    assert_eq!(lookup_source_mip(&view, AddressMode::Clamp, 9, 0), view.at(3, 0));
    assert_eq!(
        lookup_source_mip(&view, AddressMode::BorderBlack, 4, 0),
        LinearColor::TRANSPARENT
    );
    assert_eq!(lookup_source_mip(&view, AddressMode::BorderBlack, 2, 0), view.at(2, 0));
}

#[test]
fn test_address_mode_from_settings() {
    let wrap = BuildSettings::default();
    let clamp = BuildSettings::builder().preserve_border(true, false).build();
    let black = BuildSettings::builder().preserve_border(true, true).build();

    assert_eq!(AddressMode::for_settings(&wrap), AddressMode::Wrap);
    assert_eq!(AddressMode::for_settings(&clamp), AddressMode::Clamp);
    assert_eq!(AddressMode::for_settings(&black), AddressMode::BorderBlack);
}

#[test]
fn test_alpha_scale_search_converges() {
    let pixels: Vec<_> = (0..1000)
        .map(|i| LinearColor::new(0.0, 0.0, 0.0, i as f32 / 1000.0))
        .collect();
    let thresholds = [0.0, 0.0, 0.0, 0.5];
    let target = [0.0, 0.0, 0.0, 0.3];

    let scale = compute_alpha_scale(target, thresholds, &pixels);
    assert_eq!(scale[0], 1.0);
    let coverage = compute_alpha_coverage(thresholds, scale, &pixels);
    assert!((coverage[3] - 0.3).abs() < 0.01, "coverage {}", coverage[3]);
}

#[test]
fn test_chain_preserves_alpha_coverage() {
    let base = gradient_alpha(64, 64);
    let thresholds = [0.0, 0.0, 0.0, 0.5];
    let settings = BuildSettings::builder().alpha_coverage_thresholds(thresholds).build();

    let top = compute_alpha_coverage(thresholds, [1.0; 4], &base.pixels)[3];
    let chain = generate_mip_chain(&settings, &base, usize::MAX);
    for mip in chain.iter().filter(|m| m.width >= 16) {
        let coverage = compute_alpha_coverage(thresholds, [1.0; 4], &mip.pixels)[3];
        assert!((coverage - top).abs() <= 0.01, "{}x{}: {coverage} vs {top}", mip.width, mip.height);
    }
}

#[test]
fn test_dither_is_deterministic_and_bounded() {
    let base = gradient_alpha(32, 32);
    let mut settings = BuildSettings::default();
    settings.dither_mip_alpha = true;

    let first = generate_mip_chain(&settings, &base, 1);
    let second = generate_mip_chain(&settings, &base, 1);
    assert_eq!(first, second);

    for pixel in &first[0].pixels {
        assert!(pixel.a <= 5.0 / 255.0 || (85.0 / 255.0..=1.0).contains(&pixel.a));
    }
}

#[test]
fn test_preserved_border_on_uniform_image() {
    let color = LinearColor::new(0.9, 0.1, 0.3, 1.0);
    let base = LinearImage::filled(16, 16, 1, color);
    let settings = BuildSettings::builder()
        .preserve_border(true, false)
        .mip_sharpening(1.0, 8)
        .build();

    for mip in generate_mip_chain(&settings, &base, usize::MAX) {
        for y in 0..mip.height {
            for x in 0..mip.width {
                if x == 0 || y == 0 || x + 1 == mip.width || y + 1 == mip.height {
                    assert!(mip.get(x, y, 0).equals_within(&color, 1e-5));
                }
            }
        }
    }
}

#[test]
fn test_border_redraw_leaves_interior() {
    let mut src = LinearImage::filled(8, 8, 1, LinearColor::WHITE);
    for x in 0..8 {
        src.set(x, 0, 0, LinearColor::BLACK);
    }
    let sentinel = LinearColor::new(0.25, 0.25, 0.25, 0.25);
    let mut dst = LinearImage::filled(4, 4, 1, sentinel);

    generate_mip_border(src.slice(0), dst.slice_pixels_mut(0), 4, 4);

    assert_eq!(dst.get(1, 1, 0), sentinel);
    assert_eq!(dst.get(2, 2, 0), sentinel);
    // top row only averages the black source row
    assert!(dst.get(1, 0, 0).equals_within(&LinearColor::BLACK, 1e-6));
    assert!(dst.get(3, 2, 0).equals_within(&LinearColor::WHITE, 1e-6));
}

#[test]
fn test_top_mip_keeps_size() {
    let color = LinearColor::new(0.3, 0.3, 0.3, 1.0);
    let src = LinearImage::filled(8, 4, 1, color);
    let settings = BuildSettings::builder().mip_sharpening(-2.0, 8).build();

    let top = generate_top_mip(&src, &settings);
    assert_eq!((top.width, top.height), (8, 4));
    assert!(top.pixels.iter().all(|p| p.equals_within(&color, 1e-5)));
}

fn assert_halving_chain(width: usize, height: usize) {
    let base = gradient_alpha(width, height);
    let chain = generate_mip_chain(&BuildSettings::default(), &base, usize::MAX);

    let mut prev = (width, height);
    for mip in &chain {
        assert_eq!((mip.width, mip.height), next_mip_size(prev.0, prev.1), "below {prev:?}");
        assert_eq!(mip.pixels.len(), mip.width * mip.height);
        prev = (mip.width, mip.height);
    }
    assert_eq!(prev, (1, 1));
    assert_eq!(chain.len() + 1, full_chain_length(width, height));
}

#[test]
fn test_odd_sized_chains_halve_to_one() {
    assert_halving_chain(100, 60);
    assert_halving_chain(5, 3);
    assert_halving_chain(1, 7);
}

#[test]
fn test_odd_sized_sharpened_chain() {
    let base = LinearImage::filled(25, 13, 1, LinearColor::new(0.4, 0.4, 0.4, 1.0));
    let settings = BuildSettings::builder().mip_sharpening(1.0, 8).build();
    let chain = generate_mip_chain(&settings, &base, usize::MAX);

    let sizes: Vec<_> = chain.iter().map(|m| (m.width, m.height)).collect();
    assert_eq!(sizes, vec![(12, 6), (6, 3), (3, 1), (1, 1)]);
    let expected = LinearColor::new(0.4, 0.4, 0.4, 1.0);
    assert!(chain.iter().flat_map(|m| &m.pixels).all(|p| p.equals_within(&expected, 1e-4)));
}

/// Columns repeat red, red, blue, blue.
fn striped_red_blue(width: usize, height: usize) -> LinearImage {
    let mut image = LinearImage::new(width, height, 1);
    for y in 0..height {
        for x in 0..width {
            let color = if x % 4 < 2 {
                LinearColor::new(1.0, 0.0, 0.0, 1.0)
            } else {
                LinearColor::new(0.0, 0.0, 1.0, 1.0)
            };
            image.set(x, y, 0, color);
        }
    }
    image
}

#[test]
fn test_top_mip_sharpens_without_color_shift() {
    let src = striped_red_blue(8, 8);
    let shifted = generate_top_mip(&src, &BuildSettings::builder().mip_sharpening(1.0, 8).build());
    let settings = BuildSettings::builder()
        .mip_sharpening(1.0, 8)
        .sharpen_without_color_shift(true)
        .build();
    let top = generate_top_mip(&src, &settings);

    for y in 0..8 {
        for x in 0..8 {
            // hue of the 2x2 box average under the texel
            let boxed = [x, (x + 1) % 8]
                .iter()
                .map(|&sx| src.get(sx, y, 0))
                .fold(LinearColor::TRANSPARENT, |acc, c| acc + c);
            let out = top.get(x, y, 0);
            assert!((out.r * boxed.b - out.b * boxed.r).abs() < 1e-4, "hue shifted at ({x}, {y})");
            assert!(out.g.abs() < 1e-6);
        }
    }
    let difference: f32 = shifted
        .pixels
        .iter()
        .zip(&top.pixels)
        .map(|(a, b)| (a.r - b.r).abs() + (a.b - b.b).abs())
        .sum();
    assert!(difference > 1e-3);
}

#[test]
fn test_top_mip_dithers_alpha() {
    let src = LinearImage::filled(8, 8, 1, LinearColor::new(0.5, 0.5, 0.5, 0.2));
    let settings = BuildSettings {
        dither_mip_alpha: true,
        ..BuildSettings::builder().mip_sharpening(-1.0, 4).build()
    };
    let top = generate_top_mip(&src, &settings);

    assert!(top.pixels.iter().all(|p| (85.0 / 255.0 - 1e-6..=1.0).contains(&p.a)));
}

#[test]
fn test_kernel_support() {
    assert!(SeparableKernel2D::supports(4, 1.0));
    assert!(SeparableKernel2D::supports(5, -1.0));
    assert!(!SeparableKernel2D::supports(5, 0.5));
    assert!(!SeparableKernel2D::supports(0, -1.0));
}
