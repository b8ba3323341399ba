//! Image buffer types
//!
//! [`Image`] is the tagged byte buffer exchanged with source extraction,
//! [`LinearImage`] is the RGBA32F linear working copy every filter runs on.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

use crate::texture_pipeline::common::error::{Result, TextureBuildError};

/// Raw pixel layouts a source or intermediate image can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawFormat {
    G8,
    Bgra8,
    /// BGRA with a shared exponent in the alpha byte (RGBE).
    Bgre8,
    Rgba16,
    Rgba16F,
    Rgba32F,
}

impl RawFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            RawFormat::G8 => 1,
            RawFormat::Bgra8 | RawFormat::Bgre8 => 4,
            RawFormat::Rgba16 | RawFormat::Rgba16F => 8,
            RawFormat::Rgba32F => 16,
        }
    }
}

/// Transfer function of the stored values. Only 8-bit formats honour it;
/// wider formats are always linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    #[default]
    Linear,
    Srgb,
    /// Legacy pow(2.2) gamma.
    Pow22,
}

/// A 2D, cubemap or array image with explicit format and color space.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub slices: usize,
    pub format: RawFormat,
    pub color_space: ColorSpace,
    pub data: Vec<u8>,
}

impl Image {
    /// Wraps raw bytes, checking that the length matches the layout.
    pub fn new(
        width: usize,
        height: usize,
        slices: usize,
        format: RawFormat,
        color_space: ColorSpace,
        data: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || slices == 0 {
            return Err(TextureBuildError::InvalidDimensions(width, height));
        }
        let expected = width * height * slices * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(TextureBuildError::InvalidSource(format!(
                "{}x{}x{} {:?} image needs {} bytes, got {}",
                width,
                height,
                slices,
                format,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            slices,
            format,
            color_space,
            data,
        })
    }

    /// A zero-filled image.
    pub fn zeroed(
        width: usize,
        height: usize,
        slices: usize,
        format: RawFormat,
        color_space: ColorSpace,
    ) -> Self {
        Self {
            width,
            height,
            slices,
            format,
            color_space,
            data: vec![0; width * height * slices * format.bytes_per_pixel()],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height * self.slices
    }
}

/// Linear RGBA color, the texel type of [`LinearImage`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl LinearColor {
    pub const TRANSPARENT: LinearColor = LinearColor::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: LinearColor = LinearColor::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: LinearColor = LinearColor::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn channel(&self, index: usize) -> f32 {
        match index {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            3 => self.a,
            _ => panic!("channel index {index} out of range"),
        }
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut f32 {
        match index {
            0 => &mut self.r,
            1 => &mut self.g,
            2 => &mut self.b,
            3 => &mut self.a,
            _ => panic!("channel index {index} out of range"),
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Perceptual luminance with the classic 0.3/0.59/0.11 weights.
    pub fn luminance(&self) -> f32 {
        self.r * 0.3 + self.g * 0.59 + self.b * 0.11
    }

    pub fn lerp(self, other: LinearColor, t: f32) -> LinearColor {
        self + (other - self) * t
    }

    /// True when every channel, alpha included, is within `tolerance`.
    pub fn equals_within(&self, other: &LinearColor, tolerance: f32) -> bool {
        (self.r - other.r).abs() <= tolerance
            && (self.g - other.g).abs() <= tolerance
            && (self.b - other.b).abs() <= tolerance
            && (self.a - other.a).abs() <= tolerance
    }

    /// Returns (hue in degrees, saturation, value, alpha) packed into r/g/b/a.
    pub fn to_hsv(self) -> LinearColor {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let range = max - min;

        let hue = if range == 0.0 {
            0.0
        } else if max == self.r {
            ((self.g - self.b) / range * 60.0 + 360.0) % 360.0
        } else if max == self.g {
            (self.b - self.r) / range * 60.0 + 120.0
        } else {
            (self.r - self.g) / range * 60.0 + 240.0
        };
        let saturation = if max == 0.0 { 0.0 } else { range / max };

        LinearColor::new(hue, saturation, max, self.a)
    }

    /// Inverse of [`LinearColor::to_hsv`].
    pub fn from_hsv(hsv: LinearColor) -> LinearColor {
        let (hue, saturation, value) = (hsv.r, hsv.g, hsv.b);
        let h = hue / 60.0;
        let h_floor = h.floor();
        let fraction = h - h_floor;

        let values = [
            value,
            value * (1.0 - saturation),
            value * (1.0 - fraction * saturation),
            value * (1.0 - (1.0 - fraction) * saturation),
        ];
        const SWIZZLE: [[usize; 3]; 6] = [
            [0, 3, 1],
            [2, 0, 1],
            [1, 0, 3],
            [1, 2, 0],
            [3, 1, 0],
            [0, 1, 2],
        ];
        let sw = SWIZZLE[(h_floor as i64).rem_euclid(6) as usize];

        LinearColor::new(values[sw[0]], values[sw[1]], values[sw[2]], hsv.a)
    }
}

impl Add for LinearColor {
    type Output = LinearColor;
    fn add(self, rhs: LinearColor) -> LinearColor {
        LinearColor::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl AddAssign for LinearColor {
    fn add_assign(&mut self, rhs: LinearColor) {
        *self = *self + rhs;
    }
}

impl Sub for LinearColor {
    type Output = LinearColor;
    fn sub(self, rhs: LinearColor) -> LinearColor {
        LinearColor::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b, self.a - rhs.a)
    }
}

impl Mul<f32> for LinearColor {
    type Output = LinearColor;
    fn mul(self, rhs: f32) -> LinearColor {
        LinearColor::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

impl Mul<LinearColor> for f32 {
    type Output = LinearColor;
    fn mul(self, rhs: LinearColor) -> LinearColor {
        rhs * self
    }
}

impl MulAssign<f32> for LinearColor {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl Div<f32> for LinearColor {
    type Output = LinearColor;
    fn div(self, rhs: f32) -> LinearColor {
        self * (1.0 / rhs)
    }
}

/// RGBA32F linear image; slices are stored back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearImage {
    pub width: usize,
    pub height: usize,
    pub slices: usize,
    pub pixels: Vec<LinearColor>,
}

impl LinearImage {
    pub fn new(width: usize, height: usize, slices: usize) -> Self {
        assert!(
            width > 0 && height > 0 && slices > 0,
            "image dimensions must be non-zero ({width}x{height}x{slices})"
        );
        Self {
            width,
            height,
            slices,
            pixels: vec![LinearColor::TRANSPARENT; width * height * slices],
        }
    }

    pub fn filled(width: usize, height: usize, slices: usize, color: LinearColor) -> Self {
        let mut image = Self::new(width, height, slices);
        image.pixels.fill(color);
        image
    }

    pub fn from_pixels(width: usize, height: usize, slices: usize, pixels: Vec<LinearColor>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height * slices,
            "pixel buffer does not match {width}x{height}x{slices}"
        );
        Self {
            width,
            height,
            slices,
            pixels,
        }
    }

    pub fn slice_len(&self) -> usize {
        self.width * self.height
    }

    pub fn slice(&self, index: usize) -> SliceView<'_> {
        let len = self.slice_len();
        SliceView {
            width: self.width,
            height: self.height,
            pixels: &self.pixels[index * len..(index + 1) * len],
        }
    }

    pub fn slice_pixels_mut(&mut self, index: usize) -> &mut [LinearColor] {
        let len = self.slice_len();
        &mut self.pixels[index * len..(index + 1) * len]
    }

    pub fn get(&self, x: usize, y: usize, slice: usize) -> LinearColor {
        self.pixels[slice * self.slice_len() + y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, slice: usize, color: LinearColor) {
        let index = slice * self.slice_len() + y * self.width + x;
        self.pixels[index] = color;
    }
}

/// Read-only 2D view of one slice.
#[derive(Debug, Clone, Copy)]
pub struct SliceView<'a> {
    pub width: usize,
    pub height: usize,
    pub pixels: &'a [LinearColor],
}

impl<'a> SliceView<'a> {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> LinearColor {
        self.pixels[x + y * self.width]
    }
}
