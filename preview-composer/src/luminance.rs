//! Brightness signals used to gate masking decisions.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::raster::clamp_channel;

/// ITU-R BT.601 luma coefficients.
pub const LUMA_R: f32 = 0.299;
pub const LUMA_G: f32 = 0.587;
pub const LUMA_B: f32 = 0.114;

#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32
}

/// Plain channel mean.
#[inline]
pub fn average(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 + g as f32 + b as f32) / 3.0
}

/// How a pixel's brightness is measured.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BrightnessMetric {
    #[default]
    Luma,
    Average,
}

impl BrightnessMetric {
    #[inline]
    pub fn measure(self, pixel: &Rgba<u8>) -> f32 {
        let [r, g, b, _] = pixel.0;
        match self {
            BrightnessMetric::Luma => luma(r, g, b),
            BrightnessMetric::Average => average(r, g, b),
        }
    }
}

/// Scale a threshold is expressed on.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdScale {
    /// [0, 255]
    #[default]
    Byte,
    /// [0, 1]
    Unit,
}

impl ThresholdScale {
    /// Normalize a [0, 255] brightness onto this scale.
    #[inline]
    pub fn normalize(self, brightness: f32) -> f32 {
        match self {
            ThresholdScale::Byte => brightness,
            ThresholdScale::Unit => brightness / 255.0,
        }
    }

    /// Express `threshold` on the byte scale.
    pub fn to_byte(self, threshold: f32) -> f32 {
        match self {
            ThresholdScale::Byte => threshold,
            ThresholdScale::Unit => threshold * 255.0,
        }
    }
}

/// Grayscale copy: R = G = B = round(luma), alpha untouched.
pub fn grayscale(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let y = clamp_channel(luma(r, g, b));
        *pixel = Rgba([y, y, y, a]);
    }
    out
}

/// Per-pixel brightness on [0, 255], unrounded, in row-major order.
pub fn brightness_map(image: &RgbaImage, metric: BrightnessMetric) -> Vec<f32> {
    image.pixels().map(|pixel| metric.measure(pixel)).collect()
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use crate::luminance::{BrightnessMetric, brightness_map, grayscale, luma};

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(16, 16, |x, y| {
            Rgba([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, (x * y) as u8])
        })
    }

    #[test]
    fn grayscale_uses_bt601_and_keeps_alpha() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 42]));
        let gray = grayscale(&image);
        assert_eq!(gray.get_pixel(0, 0), &Rgba([76, 76, 76, 42]));

        let image = RgbaImage::from_pixel(1, 1, Rgba([10, 200, 30, 7]));
        let y = luma(10, 200, 30).round() as u8;
        assert_eq!(grayscale(&image).get_pixel(0, 0), &Rgba([y, y, y, 7]));
    }

    #[test]
    fn grayscale_does_not_touch_input() {
        let image = sample();
        let before = image.clone();
        let _ = grayscale(&image);
        assert_eq!(image, before);
    }

    #[test]
    fn grayscale_is_idempotent() {
        let once = grayscale(&sample());
        let twice = grayscale(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn brightness_map_metrics() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([90, 120, 150, 255]));
        let avg = brightness_map(&image, BrightnessMetric::Average);
        assert_eq!(avg, vec![120.0, 120.0]);
        let y = brightness_map(&image, BrightnessMetric::Luma);
        assert!((y[0] - luma(90, 120, 150)).abs() < f32::EPSILON);
    }
}
