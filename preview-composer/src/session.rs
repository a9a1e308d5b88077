use image::RgbaImage;

use crate::{
    assets::AssetSource,
    compose::{Compositor, PreparedDesign},
    config::ComposeConfig,
    error::ComposeError,
    overlay::OverlayState,
};

/// All state behind one live preview: current selection, overlays and the
/// last rendered frame.
///
/// Render requests are coalesced: `invalidate` only marks the frame stale and
/// `refresh` runs at most one pass however many requests piled up. A failed
/// load or pass leaves the previous frame in place.
pub struct PreviewSession<S>
where
    S: AssetSource,
{
    compositor: Compositor,
    source: S,
    design: Option<PreparedDesign>,
    material: Option<RgbaImage>,
    overlays: OverlayState,
    frame: Option<RgbaImage>,
    dirty: bool,
    passes: u64,
}

impl<S> PreviewSession<S>
where
    S: AssetSource,
{
    pub fn new(config: ComposeConfig, source: S) -> Self {
        let overlays = OverlayState::from_config(&config);
        Self {
            compositor: Compositor::new(config),
            source,
            design: None,
            material: None,
            overlays,
            frame: None,
            dirty: false,
            passes: 0,
        }
    }

    pub fn config(&self) -> &ComposeConfig {
        self.compositor.config()
    }

    pub fn design(&self) -> Option<&PreparedDesign> {
        self.design.as_ref()
    }

    pub fn overlays(&self) -> &OverlayState {
        &self.overlays
    }

    /// Mutable overlay access. Any edit marks the frame stale.
    pub fn overlays_mut(&mut self) -> &mut OverlayState {
        self.dirty = true;
        &mut self.overlays
    }

    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    /// Number of render passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn load(&mut self, key: &str) -> Result<RgbaImage, ComposeError> {
        self.source.load(key).map_err(|err| {
            log::warn!("failed to load {key}: {err}");
            ComposeError::asset(key, err)
        })
    }

    fn commit_design(&mut self, prepared: PreparedDesign) {
        if self.config().constrain_overlay_to_region {
            self.overlays.set_constraint(prepared.dark_bounds);
        }
        self.design = Some(prepared);
        self.dirty = true;
    }

    pub fn select_design(&mut self, key: &str) -> Result<(), ComposeError> {
        let image = self.load(key)?;
        let prepared = self.compositor.prepare_design(&image)?;
        log::info!("design {key} selected");
        self.commit_design(prepared);
        Ok(())
    }

    /// Select a material, or go back to the untextured design with `None`.
    pub fn select_material(&mut self, key: Option<&str>) -> Result<(), ComposeError> {
        self.material = match key {
            Some(key) => Some(self.load(key)?),
            None => None,
        };
        self.dirty = true;
        Ok(())
    }

    /// Load design then material, one after the other, and render. Nothing
    /// changes unless both loads succeed.
    pub fn update(
        &mut self,
        design: &str,
        material: Option<&str>,
    ) -> Result<Option<&RgbaImage>, ComposeError> {
        let design_image = self.load(design)?;
        let material_image = material.map(|key| self.load(key)).transpose()?;
        let prepared = self.compositor.prepare_design(&design_image)?;

        self.commit_design(prepared);
        self.material = material_image;
        self.render()
    }

    /// Load an overlay image and make it the active overlay.
    pub fn load_overlay(&mut self, key: &str) -> Result<(), ComposeError> {
        let image = self.load(key)?;
        self.overlays.load(image);
        self.dirty = true;
        Ok(())
    }

    /// Render if anything changed since the last pass.
    pub fn refresh(&mut self) -> Result<Option<&RgbaImage>, ComposeError> {
        if !self.dirty {
            return Ok(self.frame.as_ref());
        }
        self.render()
    }

    fn render(&mut self) -> Result<Option<&RgbaImage>, ComposeError> {
        let Some(design) = self.design.as_ref() else {
            return Ok(None);
        };
        self.dirty = false;
        let frame = self
            .compositor
            .render(design, self.material.as_ref(), &self.overlays)
            .inspect_err(|err| log::warn!("render pass aborted: {err}"))?;
        self.passes += 1;
        log::debug!("render pass {} finished", self.passes);
        Ok(Some(self.frame.insert(frame)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use image::{Rgba, RgbaImage};

    use crate::{
        config::ComposeConfig,
        error::ComposeError,
        raster::Rect,
        session::PreviewSession,
    };

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn source() -> HashMap<String, RgbaImage> {
        let mut lens = RgbaImage::from_pixel(544, 544, Rgba([220, 220, 220, 255]));
        for y in 40..100 {
            for x in 60..140 {
                lens.put_pixel(x, y, BLACK);
            }
        }
        HashMap::from([
            ("black".to_string(), RgbaImage::from_pixel(544, 544, BLACK)),
            ("white".to_string(), RgbaImage::from_pixel(544, 544, WHITE)),
            ("lens".to_string(), lens),
            ("stamp".to_string(), RgbaImage::from_pixel(20, 20, Rgba([0, 0, 255, 255]))),
        ])
    }

    #[test]
    fn update_renders_design_with_material() {
        let mut session = PreviewSession::new(ComposeConfig::default(), source());
        let frame = session.update("black", Some("white")).unwrap().unwrap();
        let p = frame.get_pixel(100, 100);
        assert!(p.0[0] == 127 || p.0[0] == 128);
        assert_eq!(session.passes(), 1);
    }

    #[test]
    fn failed_load_keeps_previous_frame() {
        let mut session = PreviewSession::new(ComposeConfig::default(), source());
        session.update("white", None).unwrap();
        let before = session.frame().cloned();

        let err = session.update("black", Some("missing")).unwrap_err();
        assert!(matches!(err, ComposeError::AssetLoad { ref key, .. } if key == "missing"));
        assert_eq!(session.frame().cloned(), before);
        assert!(session.select_design("nope").is_err());
        assert_eq!(session.refresh().unwrap().cloned(), before);
        assert_eq!(session.passes(), 1);
    }

    #[test]
    fn render_requests_are_coalesced() {
        let mut session = PreviewSession::new(ComposeConfig::default(), source());
        assert!(session.refresh().unwrap().is_none());

        session.select_design("white").unwrap();
        session.select_material(Some("black")).unwrap();
        session.invalidate();
        session.invalidate();
        assert!(session.refresh().unwrap().is_some());
        assert!(session.refresh().unwrap().is_some());
        assert_eq!(session.passes(), 1);

        session.overlays_mut().load(RgbaImage::new(4, 4));
        session.refresh().unwrap();
        assert_eq!(session.passes(), 2);
    }

    #[test]
    fn dark_blobs_constrain_overlays() {
        let config = ComposeConfig {
            erase_blobs: true,
            constrain_overlay_to_region: true,
            ..ComposeConfig::default()
        };
        let mut session = PreviewSession::new(config, source());
        session.select_design("lens").unwrap();
        assert_eq!(session.overlays().constraint(), Some(Rect::new(60, 40, 80, 60)));

        session.load_overlay("stamp").unwrap();
        let active = session.overlays().active().unwrap();
        assert!(active.x >= 60.0 && active.x + active.width() <= 140.0);
        assert!(active.y >= 40.0 && active.y + active.height() <= 100.0);

        let frame = session.refresh().unwrap().unwrap();
        // the lens area was erased to white before the overlay was drawn
        assert_eq!(frame.get_pixel(61, 41), &WHITE);
    }
}
