use image::{RgbaImage, imageops};

use crate::{
    blob::{Blob, blob_bounds, detect_blobs, erase_blobs},
    color_key::remove_background,
    config::ComposeConfig,
    error::ComposeError,
    fit::{DrawRect, fit_contain},
    luminance::brightness_map,
    overlay::{Overlay, OverlayState},
    raster::{Rect, clamp_channel, put_region},
};

/// A design fitted into the canvas, with lens blobs already erased.
/// Built once per design change.
#[derive(Debug, Clone)]
pub struct PreparedDesign {
    pub region: RgbaImage,
    pub fit: DrawRect,
    /// Where `region` lands on the canvas.
    pub placement: Rect,
    pub blobs: Vec<Blob>,
    /// Union of blob bounds, in canvas coordinates.
    pub dark_bounds: Option<Rect>,
}

fn resize_to(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, imageops::FilterType::Lanczos3)
}

#[derive(Debug, Clone, Default)]
pub struct Compositor {
    config: ComposeConfig,
}

impl Compositor {
    pub fn new(config: ComposeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Fit the design into the canvas and, if enabled, erase its dark blobs.
    pub fn prepare_design(&self, design: &RgbaImage) -> Result<PreparedDesign, ComposeError> {
        let (width, height) = design.dimensions();
        let fit = fit_contain(self.config.canvas_width, self.config.canvas_height, width, height)?;
        let placement = fit.pixel_rect();
        let mut region = resize_to(design, placement.width, placement.height);

        let blobs = if self.config.erase_blobs {
            let blobs = detect_blobs(&region, self.config.blob_threshold(), self.config.min_blob_size);
            erase_blobs(&mut region, &blobs);
            blobs
        } else {
            Vec::new()
        };
        let dark_bounds = blob_bounds(&blobs).map(|b| b.translate(placement.x, placement.y));

        Ok(PreparedDesign {
            region,
            fit,
            placement,
            blobs,
            dark_bounds,
        })
    }

    /// One render pass: texture the design, then draw stamped overlays and the
    /// active overlay on top.
    pub fn render(
        &self,
        design: &PreparedDesign,
        material: Option<&RgbaImage>,
        overlays: &OverlayState,
    ) -> Result<RgbaImage, ComposeError> {
        let mut canvas = RgbaImage::new(self.config.canvas_width, self.config.canvas_height);
        let mut region = design.region.clone();

        if let Some(material) = material {
            let (width, height) = material.dimensions();
            if width == 0 || height == 0 {
                return Err(ComposeError::DegenerateImage { width, height });
            }
            let texture = resize_to(material, region.width(), region.height());
            // Unrounded luma (or channel mean) of the design is the gate; it is
            // what `grayscale` would store before rounding to a byte.
            let gate = brightness_map(&region, self.config.brightness);
            let selected = self.config.mask_blend().apply(&mut region, &texture, &gate)?;
            log::debug!("material blended into {selected} pixels");
        }

        put_region(&mut canvas, &region, design.placement.x, design.placement.y);

        for overlay in overlays.stamped() {
            draw_overlay(&mut canvas, overlay, 1.0);
        }
        if let Some(active) = overlays.active() {
            draw_overlay(&mut canvas, active, self.config.active_overlay_opacity);
        }

        Ok(canvas)
    }

    pub fn render_frame(
        &self,
        design: &RgbaImage,
        material: Option<&RgbaImage>,
        overlays: &OverlayState,
    ) -> Result<RgbaImage, ComposeError> {
        let prepared = self.prepare_design(design)?;
        self.render(&prepared, material, overlays)
    }
}

/// Per-axis bound, in canvas sizes, on a Lanczos-resampled overlay piece.
/// Larger magnifications are sampled straight into the visible box.
const MAX_RESAMPLE_FACTOR: f32 = 4.0;

/// Source pixels kept around the visible part so the filter sees real
/// neighbours at the crop edge.
const FILTER_MARGIN: f32 = 3.0;

fn draw_overlay(canvas: &mut RgbaImage, overlay: &Overlay, opacity: f32) {
    let (src_width, src_height) = overlay.image.dimensions();
    let scale = overlay.scale;
    if src_width == 0 || src_height == 0 || scale <= 0.0 || !scale.is_finite() {
        return;
    }
    if !overlay.x.is_finite() || !overlay.y.is_finite() {
        return;
    }
    let (canvas_width, canvas_height) = canvas.dimensions();

    // visible part of the overlay box, in canvas pixels
    let left = overlay.x.max(0.0);
    let top = overlay.y.max(0.0);
    let right = (overlay.x + overlay.width()).min(canvas_width as f32);
    let bottom = (overlay.y + overlay.height()).min(canvas_height as f32);
    if left >= right || top >= bottom {
        return;
    }

    // source pixels behind it
    let sx0 = (((left - overlay.x) / scale - FILTER_MARGIN).floor().max(0.0) as u32).min(src_width - 1);
    let sy0 = (((top - overlay.y) / scale - FILTER_MARGIN).floor().max(0.0) as u32).min(src_height - 1);
    let sx1 = (((right - overlay.x) / scale + FILTER_MARGIN).ceil() as u32).clamp(sx0 + 1, src_width);
    let sy1 = (((bottom - overlay.y) / scale + FILTER_MARGIN).ceil() as u32).clamp(sy0 + 1, src_height);
    let mut source = imageops::crop_imm(&*overlay.image, sx0, sy0, sx1 - sx0, sy1 - sy0).to_image();

    // key source pixels, not resampled ones
    if let Some(key) = overlay.key {
        remove_background(&mut source, key);
    }

    let piece_width = ((sx1 - sx0) as f32 * scale).round().max(1.0);
    let piece_height = ((sy1 - sy0) as f32 * scale).round().max(1.0);
    let (mut piece, x, y) = if piece_width <= canvas_width as f32 * MAX_RESAMPLE_FACTOR
        && piece_height <= canvas_height as f32 * MAX_RESAMPLE_FACTOR
    {
        let piece = resize_to(&source, piece_width as u32, piece_height as u32);
        (
            piece,
            overlay.x + sx0 as f32 * scale,
            overlay.y + sy0 as f32 * scale,
        )
    } else {
        let (left, top) = (left.floor(), top.floor());
        let width = (right.ceil() - left) as u32;
        let height = (bottom.ceil() - top) as u32;
        let max_x = source.width() - 1;
        let max_y = source.height() - 1;
        let piece = RgbaImage::from_fn(width, height, |i, j| {
            let sx = ((left + i as f32 + 0.5 - overlay.x) / scale).floor() - sx0 as f32;
            let sy = ((top + j as f32 + 0.5 - overlay.y) / scale).floor() - sy0 as f32;
            *source.get_pixel((sx.max(0.0) as u32).min(max_x), (sy.max(0.0) as u32).min(max_y))
        });
        (piece, left, top)
    };

    if opacity < 1.0 {
        for pixel in piece.pixels_mut() {
            let a = pixel[3] as f32 * opacity;
            pixel[3] = clamp_channel(a);
        }
    }

    imageops::overlay(canvas, &piece, x.round() as i64, y.round() as i64);
}
