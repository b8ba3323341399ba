use rayon::prelude::*;
use tracing::debug;

use crate::texture_pipeline::image::{LinearColor, LinearImage};
use crate::texture_pipeline::settings::{BuildSettings, ColorAdjustment};

const NEARLY_EQUAL: f32 = 1e-4;
const CHROMA_KEY_EPSILON: f32 = 1e-8;
const VIBRANCE_SATURATION_POW: f32 = 5.0;
const BOKEH_LUMINANCE_GOAL: f32 = 0.25;

fn nearly(value: f32, target: f32) -> bool {
    (value - target).abs() <= NEARLY_EQUAL
}

impl ColorAdjustment {
    /// True when applying the adjustment would not change any pixel.
    pub fn is_identity(&self) -> bool {
        nearly(self.brightness, 1.0)
            && nearly(self.brightness_curve, 1.0)
            && nearly(self.saturation, 1.0)
            && nearly(self.vibrance, 0.0)
            && nearly(self.rgb_curve, 1.0)
            && nearly(self.hue, 0.0)
            && nearly(self.min_alpha, 0.0)
            && nearly(self.max_alpha, 1.0)
    }

    fn adjust(&self, color: LinearColor) -> LinearColor {
        let mut hsv = color.to_hsv();
        let (hue, saturation, value) = (&mut hsv.r, &mut hsv.g, &mut hsv.b);

        *value *= self.brightness;
        if !nearly(self.brightness_curve, 1.0) && self.brightness_curve != 0.0 {
            *value = value.powf(self.brightness_curve);
        }

        if !nearly(self.vibrance, 0.0) {
            let inv_saturation = (1.0 - *saturation).powf(VIBRANCE_SATURATION_POW);
            *saturation += self.vibrance.clamp(0.0, 1.0) * 0.5 * inv_saturation;
        }
        *saturation *= self.saturation;

        *hue = (*hue + self.hue) % 360.0;
        if *hue < 0.0 {
            *hue += 360.0;
        }
        *saturation = saturation.clamp(0.0, 1.0);
        *value = value.clamp(0.0, 1.0);

        let mut rgb = LinearColor::from_hsv(hsv);
        if !nearly(self.rgb_curve, 1.0) && self.rgb_curve != 0.0 {
            rgb.r = rgb.r.powf(self.rgb_curve);
            rgb.g = rgb.g.powf(self.rgb_curve);
            rgb.b = rgb.b.powf(self.rgb_curve);
        }

        rgb.a = self.min_alpha + (self.max_alpha - self.min_alpha) * color.a;
        rgb
    }
}

/// Chroma keying followed by the HSV color adjustment, in place.
///
/// Skipped entirely when the adjustment is an identity and chroma keying is
/// off, so HDR values survive untouched.
pub fn adjust_image_colors(image: &mut LinearImage, settings: &BuildSettings) {
    let params = settings.color_adjustment;
    if params.is_identity() && !settings.chroma_key_texture {
        return;
    }
    debug!(?params, chroma_key = settings.chroma_key_texture, "adjusting colors");

    let key = settings.chroma_key_texture.then_some((
        settings.chroma_key_color,
        settings.chroma_key_threshold + CHROMA_KEY_EPSILON,
    ));

    image.pixels.par_iter_mut().for_each(|pixel| {
        let mut color = *pixel;
        if let Some((key_color, tolerance)) = key {
            if color.equals_within(&key_color, tolerance) {
                color = LinearColor::TRANSPARENT;
            }
        }
        *pixel = params.adjust(color);
    });
}

/// Rescales the image to an average RGB luminance of 0.25 and stores the
/// per-texel luminance in alpha, the layout bokeh depth of field expects.
pub fn compute_bokeh_alpha(image: &mut LinearImage) {
    let count = image.pixels.len() as f32;
    let sum = image
        .pixels
        .iter()
        .fold(LinearColor::TRANSPARENT, |acc, &p| acc + p);
    let average = sum / count;
    let rgb_luminance = (average.r + average.g + average.b) / 3.0;
    let scale = BOKEH_LUMINANCE_GOAL / rgb_luminance.max(0.001);

    for pixel in &mut image.pixels {
        let mut color = *pixel * scale;
        color.a = ((color.r + color.g + color.b) / 3.0).clamp(0.0, 1.0);
        *pixel = color;
    }
}
