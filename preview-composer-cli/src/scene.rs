use std::path::{Path, PathBuf};

use preview_composer::{ColorKey, ComposeConfig, Overlay, OverlayState, Rect};

mod json_model {
    use std::path::PathBuf;

    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Root {
        #[serde(default)]
        pub overlays: Vec<Overlay>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Overlay {
        pub image: PathBuf,
        #[serde(default)]
        pub x: f32,
        #[serde(default)]
        pub y: f32,
        #[serde(default = "default_scale")]
        pub scale: f32,
        #[serde(default)]
        pub remove_background: bool,
        #[serde(default = "default_stamped")]
        pub stamped: bool,
    }

    fn default_scale() -> f32 {
        1.0
    }

    fn default_stamped() -> bool {
        true
    }
}

/// One overlay placement read from a scene file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePlacement {
    pub image: PathBuf,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub remove_background: bool,
    pub stamped: bool,
}

/// Parse a scene. Relative image paths resolve against `base_dir`.
pub fn parse_scene(json: &str, base_dir: &Path) -> Result<Vec<ScenePlacement>, serde_json::Error> {
    let root: json_model::Root = serde_json::from_str(json)?;
    Ok(root
        .overlays
        .into_iter()
        .map(|overlay| ScenePlacement {
            image: base_dir.join(overlay.image),
            x: overlay.x,
            y: overlay.y,
            scale: overlay.scale,
            remove_background: overlay.remove_background,
            stamped: overlay.stamped,
        })
        .collect())
}

/// Build the overlay state for a scene, loading every image. With a
/// `constraint`, every overlay is clamped inside it before it is stamped.
pub fn build_overlays(
    placements: &[ScenePlacement],
    config: &ComposeConfig,
    constraint: Option<Rect>,
) -> anyhow::Result<OverlayState> {
    let mut overlays = OverlayState::from_config(config);
    overlays.set_constraint(constraint);
    let key = ColorKey::new(config.key_color, config.tolerance_for_color_key);

    for placement in placements {
        let image = image::open(&placement.image)?.to_rgba8();
        if overlays.active().is_some() {
            log::warn!("dropping unstamped overlay, {} replaces it", placement.image.display());
        }
        overlays.activate(
            Overlay::new(image)
                .at(placement.x, placement.y)
                .scaled(placement.scale)
                .keyed(placement.remove_background.then_some(key)),
        );
        if placement.stamped {
            overlays.stamp();
        }
    }

    Ok(overlays)
}
