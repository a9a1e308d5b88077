use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{
    blend::{BlendLaw, MaskBlend},
    color_key::ColorKey,
    luminance::{BrightnessMetric, ThresholdScale},
    overlay::{Placement, ZoomPolicy},
    raster::{Color, clamp_channel},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse json {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("IO error")]
    IOError(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Every knob the compositor understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Brightness cutoff for masking and blob darkness.
    pub threshold: f32,
    pub threshold_scale: ThresholdScale,
    pub brightness: BrightnessMetric,
    pub blend_law: BlendLaw,
    pub erase_blobs: bool,
    pub min_blob_size: usize,
    pub remove_background: bool,
    pub key_color: Color,
    pub tolerance_for_color_key: u8,
    pub auto_fit_overlay: bool,
    pub constrain_overlay_to_region: bool,
    pub placement: Placement,
    pub zoom: ZoomPolicy,
    pub active_overlay_opacity: f32,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            canvas_width: 544,
            canvas_height: 544,
            threshold: 128.0,
            threshold_scale: ThresholdScale::Byte,
            brightness: BrightnessMetric::Luma,
            blend_law: BlendLaw::Average,
            erase_blobs: false,
            min_blob_size: 50,
            remove_background: false,
            key_color: Color::WHITE,
            tolerance_for_color_key: 30,
            auto_fit_overlay: false,
            constrain_overlay_to_region: false,
            placement: Placement::Center,
            zoom: ZoomPolicy::default(),
            active_overlay_opacity: 0.5,
        }
    }
}

impl ComposeConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let config: ComposeConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ComposeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ConfigError::Invalid("canvas must not be empty".to_string()));
        }
        if self.min_blob_size == 0 {
            return Err(ConfigError::Invalid("minBlobSize must be positive".to_string()));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::Invalid(format!("bad threshold {}", self.threshold)));
        }
        if !(0.0..=1.0).contains(&self.active_overlay_opacity) {
            return Err(ConfigError::Invalid(format!(
                "activeOverlayOpacity {} is outside [0, 1]",
                self.active_overlay_opacity
            )));
        }
        match self.zoom {
            ZoomPolicy::Additive { step } if !(step.is_finite() && step > 0.0) => {
                return Err(ConfigError::Invalid(format!("zoom step {step} must be positive")));
            }
            ZoomPolicy::Multiplicative { zoom_in, zoom_out }
                if !(zoom_in.is_finite() && zoom_in > 1.0 && zoom_out > 0.0 && zoom_out < 1.0) =>
            {
                return Err(ConfigError::Invalid(format!(
                    "zoom factors {zoom_in}/{zoom_out} must grow and shrink the overlay"
                )));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn mask_blend(&self) -> MaskBlend {
        MaskBlend::new(self.threshold, self.threshold_scale, self.blend_law)
    }

    /// Per-channel darkness cutoff for the blob detector.
    pub fn blob_threshold(&self) -> u8 {
        clamp_channel(self.threshold_scale.to_byte(self.threshold))
    }

    /// Key applied to newly loaded overlays.
    pub fn color_key(&self) -> Option<ColorKey> {
        self.remove_background
            .then(|| ColorKey::new(self.key_color, self.tolerance_for_color_key))
    }
}
