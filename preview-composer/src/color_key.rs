use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::raster::Color;

/// Reference color and per-channel tolerance for background removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorKey {
    pub color: Color,
    pub tolerance: u8,
}

impl ColorKey {
    pub fn new(color: Color, tolerance: u8) -> Self {
        Self { color, tolerance }
    }

    /// Every channel within tolerance, checked independently.
    #[inline]
    pub fn matches(&self, r: u8, g: u8, b: u8) -> bool {
        r.abs_diff(self.color.r) <= self.tolerance
            && g.abs_diff(self.color.g) <= self.tolerance
            && b.abs_diff(self.color.b) <= self.tolerance
    }
}

/// Make every pixel matching `key` fully transparent. RGB is left as is.
/// Returns the number of pixels cleared.
pub fn remove_background(image: &mut RgbaImage, key: ColorKey) -> usize {
    let mut cleared = 0;
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        if key.matches(r, g, b) {
            pixel.0[3] = 0;
            cleared += 1;
        }
    }
    cleared
}
