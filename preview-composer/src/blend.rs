//! Masked blending of a material (or overlay color) into a design.
//!
//! A pixel is selected when its gate brightness falls below the threshold.
//! Only selected pixels change, and only their color channels unless the law
//! says otherwise. Reads come from a snapshot of the design taken before the
//! loop, so writes never feed back into later reads.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::{error::ComposeError, luminance::ThresholdScale, raster::clamp_channel};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendLaw {
    /// dst = src
    Replace,
    /// dst = dst * 0.5 + src * 0.5
    #[default]
    Average,
    /// dst = dst * a + src * (1 - a), a = dst.alpha / 255; alpha becomes opaque
    AlphaWeighted,
    /// dst = lum * src * 1.5 + dst * 0.5, lum = gate / 255
    LuminanceWeighted,
}

impl BlendLaw {
    /// Blend one source pixel into one destination pixel.
    ///
    /// `luminance` is the gate brightness normalized to [0, 1].
    #[inline]
    pub fn blend(self, dst: [u8; 4], src: [u8; 4], luminance: f32) -> [u8; 4] {
        let mut out = dst;
        match self {
            BlendLaw::Replace => {
                out[..3].copy_from_slice(&src[..3]);
            }
            BlendLaw::Average => {
                for c in 0..3 {
                    out[c] = clamp_channel(dst[c] as f32 * 0.5 + src[c] as f32 * 0.5);
                }
            }
            BlendLaw::AlphaWeighted => {
                let alpha = dst[3] as f32 / 255.0;
                for c in 0..3 {
                    out[c] = clamp_channel(dst[c] as f32 * alpha + src[c] as f32 * (1.0 - alpha));
                }
                out[3] = 255;
            }
            BlendLaw::LuminanceWeighted => {
                for c in 0..3 {
                    out[c] = clamp_channel(luminance * src[c] as f32 * 1.5 + dst[c] as f32 * 0.5);
                }
            }
        }
        out
    }
}

/// Predicate plus blend law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskBlend {
    pub threshold: f32,
    pub scale: ThresholdScale,
    pub law: BlendLaw,
}

impl MaskBlend {
    pub fn new(threshold: f32, scale: ThresholdScale, law: BlendLaw) -> Self {
        Self {
            threshold,
            scale,
            law,
        }
    }

    /// Whether a pixel with the given [0, 255] brightness is selected.
    #[inline]
    pub fn selects(&self, brightness: f32) -> bool {
        self.scale.normalize(brightness) < self.threshold
    }

    /// Blend `source` into `design` wherever `gate` selects a pixel.
    ///
    /// `gate` holds one [0, 255] brightness per pixel (see `brightness_map`).
    /// Returns the number of pixels changed.
    pub fn apply(
        &self,
        design: &mut RgbaImage,
        source: &RgbaImage,
        gate: &[f32],
    ) -> Result<usize, ComposeError> {
        if design.dimensions() != source.dimensions() {
            return Err(ComposeError::DimensionMismatch {
                expected: design.dimensions(),
                found: source.dimensions(),
            });
        }
        let pixel_count = (design.width() * design.height()) as usize;
        if gate.len() != pixel_count {
            return Err(ComposeError::DimensionMismatch {
                expected: design.dimensions(),
                found: (gate.len() as u32, 1),
            });
        }

        let snapshot = design.clone();
        let mut selected = 0;

        for (i, ((dst, before), src)) in design
            .pixels_mut()
            .zip(snapshot.pixels())
            .zip(source.pixels())
            .enumerate()
        {
            if !self.selects(gate[i]) {
                continue;
            }
            let luminance = gate[i] / 255.0;
            dst.0 = self.law.blend(before.0, src.0, luminance);
            selected += 1;
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use crate::{
        blend::{BlendLaw, MaskBlend},
        error::ComposeError,
        luminance::{BrightnessMetric, ThresholdScale, brightness_map},
    };

    const LAWS: [BlendLaw; 4] = [
        BlendLaw::Replace,
        BlendLaw::Average,
        BlendLaw::AlphaWeighted,
        BlendLaw::LuminanceWeighted,
    ];

    #[test]
    fn replace_only_touches_selected_rgb() {
        let mut design = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([10, 10, 10, 200])
            } else {
                Rgba([250, 250, 250, 200])
            }
        });
        let material = RgbaImage::from_pixel(2, 1, Rgba([1, 2, 3, 4]));
        let gate = brightness_map(&design, BrightnessMetric::Luma);

        let changed = MaskBlend::new(128.0, ThresholdScale::Byte, BlendLaw::Replace)
            .apply(&mut design, &material, &gate)
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(design.get_pixel(0, 0), &Rgba([1, 2, 3, 200]));
        assert_eq!(design.get_pixel(1, 0), &Rgba([250, 250, 250, 200]));
    }

    #[test]
    fn average_law_on_black_and_white() {
        let mut design = RgbaImage::from_pixel(544, 544, Rgba([0, 0, 0, 255]));
        let material = RgbaImage::from_pixel(544, 544, Rgba([255, 255, 255, 255]));
        let gate = brightness_map(&design, BrightnessMetric::Luma);

        MaskBlend::new(128.0, ThresholdScale::Byte, BlendLaw::Average)
            .apply(&mut design, &material, &gate)
            .unwrap();

        assert!(design.pixels().all(|p| {
            p.0[..3].iter().all(|&c| c == 127 || c == 128) && p.0[3] == 255
        }));
    }

    #[test]
    fn alpha_weighted_forces_opaque() {
        let mut design = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 51]));
        let material = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255]));
        let gate = brightness_map(&design, BrightnessMetric::Luma);

        MaskBlend::new(0.5, ThresholdScale::Unit, BlendLaw::AlphaWeighted)
            .apply(&mut design, &material, &gate)
            .unwrap();

        // a = 0.2, dst = src * 0.8
        assert_eq!(design.get_pixel(0, 0), &Rgba([160, 80, 40, 255]));
    }

    #[test]
    fn luminance_weighted_is_clamped() {
        let dst = [120, 120, 120, 255];
        let src = [255, 255, 255, 255];
        let out = BlendLaw::LuminanceWeighted.blend(dst, src, 0.9);
        assert_eq!(out, [255, 255, 255, 255]);

        let out = BlendLaw::LuminanceWeighted.blend([100, 0, 0, 9], [100, 0, 0, 0], 0.2);
        assert_eq!(out, [80, 0, 0, 9]);
    }

    #[test]
    fn alpha_policy_per_law() {
        let values = [0u8, 1, 64, 127, 128, 200, 254, 255];
        for law in LAWS {
            for &d in &values {
                for &s in &values {
                    for lum in [0.0, 0.5, 1.0] {
                        let out = law.blend([d, s, d, d], [s, d, s, s], lum);
                        let expected_alpha = if law == BlendLaw::AlphaWeighted { 255 } else { d };
                        assert_eq!(out[3], expected_alpha);
                    }
                }
            }
        }
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mut design = RgbaImage::new(4, 4);
        let material = RgbaImage::new(4, 5);
        let gate = vec![0.0; 16];
        let err = MaskBlend::new(128.0, ThresholdScale::Byte, BlendLaw::Average)
            .apply(&mut design, &material, &gate)
            .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::DimensionMismatch {
                expected: (4, 4),
                found: (4, 5)
            }
        ));
    }
}
