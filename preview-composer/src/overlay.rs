//! User overlays ("stamps"): one mutable active overlay plus an ordered list
//! of committed ones. List order is stacking order, later entries on top.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::{color_key::ColorKey, config::ComposeConfig, raster::Rect};

/// Smallest scale an overlay may shrink to.
pub const MIN_SCALE: f32 = 0.1;

/// Where a freshly loaded overlay is placed.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    /// Centered on the canvas.
    #[default]
    Center,
    /// Top-left corner of the constraining region (canvas origin without one).
    RegionTopLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ZoomPolicy {
    Additive { step: f32 },
    #[serde(rename_all = "camelCase")]
    Multiplicative { zoom_in: f32, zoom_out: f32 },
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        ZoomPolicy::Multiplicative {
            zoom_in: 1.1,
            zoom_out: 0.9,
        }
    }
}

impl ZoomPolicy {
    fn next_scale(self, scale: f32, direction: ZoomDirection) -> f32 {
        match (self, direction) {
            (ZoomPolicy::Additive { step }, ZoomDirection::In) => scale + step,
            (ZoomPolicy::Additive { step }, ZoomDirection::Out) => scale - step,
            (ZoomPolicy::Multiplicative { zoom_in, .. }, ZoomDirection::In) => scale * zoom_in,
            (ZoomPolicy::Multiplicative { zoom_out, .. }, ZoomDirection::Out) => scale * zoom_out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Placement data for one overlay image.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub image: Arc<RgbaImage>,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// `Some` when the background should be keyed out before drawing.
    pub key: Option<ColorKey>,
}

impl Overlay {
    pub fn new(image: impl Into<Arc<RgbaImage>>) -> Self {
        Self {
            image: image.into(),
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            key: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = scale.max(MIN_SCALE);
        self
    }

    pub fn keyed(mut self, key: Option<ColorKey>) -> Self {
        self.key = key;
        self
    }

    pub fn width(&self) -> f32 {
        self.image.width() as f32 * self.scale
    }

    pub fn height(&self) -> f32 {
        self.image.height() as f32 * self.scale
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width() && y >= self.y && y < self.y + self.height()
    }

    fn fits_in(&self, scale: f32, region: &Rect) -> bool {
        self.image.width() as f32 * scale <= region.width as f32
            && self.image.height() as f32 * scale <= region.height as f32
    }

    /// Smallest scale at which the overlay covers a `width` x `height` area.
    fn cover_scale(&self, width: u32, height: u32) -> f32 {
        (width as f32 / self.image.width() as f32).max(height as f32 / self.image.height() as f32)
    }

    /// Pull the bounding box back inside `region` where possible.
    fn clamp_into(&mut self, region: &Rect) {
        let max_x = region.right() as f32 - self.width();
        let max_y = region.bottom() as f32 - self.height();
        self.x = self.x.min(max_x).max(region.x as f32);
        self.y = self.y.min(max_y).max(region.y as f32);
    }
}

#[derive(Debug, Clone)]
pub struct OverlayState {
    canvas_width: u32,
    canvas_height: u32,
    placement: Placement,
    auto_fit: bool,
    zoom_policy: ZoomPolicy,
    default_key: Option<ColorKey>,
    constraint: Option<Rect>,
    active: Option<Overlay>,
    stamped: Vec<Overlay>,
    /// Last pointer position while a drag is in progress.
    pointer: Option<(f32, f32)>,
}

impl OverlayState {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            placement: Placement::default(),
            auto_fit: false,
            zoom_policy: ZoomPolicy::default(),
            default_key: None,
            constraint: None,
            active: None,
            stamped: Vec::new(),
            pointer: None,
        }
    }

    pub fn from_config(config: &ComposeConfig) -> Self {
        Self {
            placement: config.placement,
            auto_fit: config.auto_fit_overlay,
            zoom_policy: config.zoom,
            default_key: config.color_key(),
            ..Self::new(config.canvas_width, config.canvas_height)
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_auto_fit(mut self, auto_fit: bool) -> Self {
        self.auto_fit = auto_fit;
        self
    }

    pub fn with_zoom_policy(mut self, zoom_policy: ZoomPolicy) -> Self {
        self.zoom_policy = zoom_policy;
        self
    }

    pub fn active(&self) -> Option<&Overlay> {
        self.active.as_ref()
    }

    pub fn stamped(&self) -> &[Overlay] {
        &self.stamped
    }

    pub fn constraint(&self) -> Option<Rect> {
        self.constraint
    }

    pub fn is_dragging(&self) -> bool {
        self.pointer.is_some()
    }

    /// Overlays bottom to top: stamped in list order, then the active one.
    pub fn draw_order(&self) -> impl Iterator<Item = &Overlay> {
        self.stamped.iter().chain(self.active.iter())
    }

    /// Constrain placement to `region`. The active overlay is pulled inside it.
    pub fn set_constraint(&mut self, region: Option<Rect>) {
        self.constraint = region.filter(|r| !r.is_empty());
        if let (Some(region), Some(active)) = (self.constraint, self.active.as_mut()) {
            active.clamp_into(&region);
        }
    }

    fn region(&self) -> Rect {
        self.constraint
            .unwrap_or_else(|| Rect::new(0, 0, self.canvas_width, self.canvas_height))
    }

    /// Start editing a new overlay image, replacing any active one.
    pub fn load(&mut self, image: impl Into<Arc<RgbaImage>>) {
        let region = self.region();
        let mut overlay = Overlay::new(image).keyed(self.default_key);

        if self.auto_fit && overlay.image.width() > 0 && overlay.image.height() > 0 {
            let fit = (region.width as f32 / overlay.image.width() as f32)
                .min(region.height as f32 / overlay.image.height() as f32);
            overlay.scale = fit.max(MIN_SCALE);
        }

        match self.placement {
            Placement::Center => {
                overlay.x = (self.canvas_width as f32 - overlay.width()) / 2.0;
                overlay.y = (self.canvas_height as f32 - overlay.height()) / 2.0;
            }
            Placement::RegionTopLeft => {
                overlay.x = region.x as f32;
                overlay.y = region.y as f32;
            }
        }

        self.activate(overlay);
    }

    /// Make `overlay` the active one as is, replacing any active overlay.
    pub fn activate(&mut self, mut overlay: Overlay) {
        if let Some(region) = self.constraint {
            overlay.clamp_into(&region);
        }
        self.pointer = None;
        self.active = Some(overlay);
    }

    pub fn set_key(&mut self, key: Option<ColorKey>) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.key = key;
                true
            }
            None => false,
        }
    }

    /// Begin a drag if the pointer lands on the active overlay.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        let hit = self.active.as_ref().is_some_and(|a| a.contains(x, y));
        self.pointer = hit.then_some((x, y));
        hit
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let Some((last_x, last_y)) = self.pointer else {
            return false;
        };
        let moved = self.drag(x - last_x, y - last_y);
        self.pointer = Some((x, y));
        moved
    }

    pub fn pointer_up(&mut self) {
        self.pointer = None;
    }

    /// Move the active overlay. Only valid during a drag started by `pointer_down`.
    pub fn drag(&mut self, dx: f32, dy: f32) -> bool {
        if self.pointer.is_none() {
            return false;
        }
        let constraint = self.constraint;
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.x += dx;
        active.y += dy;
        if let Some(region) = constraint {
            active.clamp_into(&region);
        }
        true
    }

    /// Step the active overlay's scale according to the zoom policy.
    pub fn zoom(&mut self, direction: ZoomDirection) -> bool {
        let Some(scale) = self.active.as_ref().map(|a| a.scale) else {
            return false;
        };
        self.rescale(self.zoom_policy.next_scale(scale, direction))
    }

    /// Multiply the active overlay's scale by `factor`.
    pub fn zoom_by(&mut self, factor: f32) -> bool {
        let Some(scale) = self.active.as_ref().map(|a| a.scale) else {
            return false;
        };
        self.rescale(scale * factor)
    }

    /// Zoom-in stops once the overlay covers the canvas.
    fn rescale(&mut self, scale: f32) -> bool {
        let constraint = self.constraint;
        let (canvas_width, canvas_height) = (self.canvas_width, self.canvas_height);
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !scale.is_finite() {
            return false;
        }
        let mut scale = scale.max(MIN_SCALE);
        if scale > active.scale {
            if let Some(region) = constraint {
                if !active.fits_in(scale, &region) {
                    log::debug!("zoom to {scale} rejected: overlay would leave the constraint region");
                    return false;
                }
            }
            let ceiling = active.cover_scale(canvas_width, canvas_height).max(MIN_SCALE);
            if active.scale >= ceiling {
                log::debug!("zoom to {scale} rejected: overlay already covers the canvas");
                return false;
            }
            scale = scale.min(ceiling);
        }
        if scale == active.scale {
            return false;
        }
        active.scale = scale;
        if let Some(region) = constraint {
            active.clamp_into(&region);
        }
        true
    }

    /// Commit the active overlay to the top of the stamped list.
    pub fn stamp(&mut self) -> bool {
        self.pointer = None;
        match self.active.take() {
            Some(overlay) => {
                self.stamped.push(overlay);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<Overlay> {
        (index < self.stamped.len()).then(|| self.stamped.remove(index))
    }

    /// Take a stamped overlay out of the list and make it active again.
    /// Stamping it afterwards appends it at the end, on top of the others.
    pub fn select_for_edit(&mut self, index: usize) -> bool {
        match self.remove(index) {
            Some(overlay) => {
                self.pointer = None;
                self.active = Some(overlay);
                true
            }
            None => false,
        }
    }

    pub fn clear_active(&mut self) {
        self.pointer = None;
        self.active = None;
    }
}
