use crate::{error::ComposeError, raster::Rect};

/// Where a source image lands inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub draw_width: f32,
    pub draw_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl DrawRect {
    /// Integer pixel rectangle backing this draw rect. Sizes truncate like a canvas
    /// backing store and never collapse below one pixel.
    pub fn pixel_rect(&self) -> Rect {
        Rect::new(
            self.offset_x.round() as i32,
            self.offset_y.round() as i32,
            (self.draw_width as u32).max(1),
            (self.draw_height as u32).max(1),
        )
    }
}

/// Scale `image_width` x `image_height` uniformly into the canvas and center it
/// along the slack axis (letterbox or pillarbox).
pub fn fit_contain(
    canvas_width: u32,
    canvas_height: u32,
    image_width: u32,
    image_height: u32,
) -> Result<DrawRect, ComposeError> {
    if image_width == 0 || image_height == 0 {
        return Err(ComposeError::DegenerateImage {
            width: image_width,
            height: image_height,
        });
    }
    if canvas_width == 0 || canvas_height == 0 {
        return Err(ComposeError::DegenerateImage {
            width: canvas_width,
            height: canvas_height,
        });
    }

    let (w, h) = (canvas_width as f32, canvas_height as f32);
    let canvas_ratio = w / h;
    let image_ratio = image_width as f32 / image_height as f32;

    let rect = if canvas_ratio > image_ratio {
        let draw_height = h;
        let draw_width = draw_height * image_ratio;
        DrawRect {
            draw_width,
            draw_height,
            offset_x: (w - draw_width) / 2.0,
            offset_y: 0.0,
        }
    } else {
        let draw_width = w;
        let draw_height = draw_width / image_ratio;
        DrawRect {
            draw_width,
            draw_height,
            offset_x: 0.0,
            offset_y: (h - draw_height) / 2.0,
        }
    };

    Ok(rect)
}

#[cfg(test)]
mod tests {
    use crate::{error::ComposeError, fit::fit_contain, raster::Rect};

    #[test]
    fn wide_image_is_letterboxed() {
        let rect = fit_contain(544, 544, 1000, 500).unwrap();
        assert_eq!(rect.draw_width, 544.0);
        assert_eq!(rect.draw_height, 272.0);
        assert_eq!(rect.offset_x, 0.0);
        assert_eq!(rect.offset_y, 136.0);
    }

    #[test]
    fn tall_image_is_pillarboxed() {
        let rect = fit_contain(544, 544, 300, 600).unwrap();
        assert_eq!(rect.draw_height, 544.0);
        assert_eq!(rect.draw_width, 272.0);
        assert_eq!(rect.offset_x, 136.0);
        assert_eq!(rect.offset_y, 0.0);
        assert_eq!(rect.pixel_rect(), Rect::new(136, 0, 272, 544));
    }

    #[test]
    fn fit_preserves_ratio_and_bounds() {
        let sizes = [(1, 1), (7, 3), (3, 7), (544, 544), (1920, 1080), (13, 997)];
        let canvases = [(544, 544), (800, 600), (100, 333)];
        for (cw, ch) in canvases {
            for (iw, ih) in sizes {
                let rect = fit_contain(cw, ch, iw, ih).unwrap();
                let expected = iw as f32 / ih as f32;
                assert!((rect.draw_width / rect.draw_height - expected).abs() < 1e-3);
                assert!(rect.draw_width <= cw as f32 + 1e-3);
                assert!(rect.draw_height <= ch as f32 + 1e-3);
                assert!(rect.offset_x == 0.0 || rect.offset_y == 0.0);
            }
        }
    }

    #[test]
    fn degenerate_image_is_rejected() {
        assert!(matches!(
            fit_contain(544, 544, 0, 10),
            Err(ComposeError::DegenerateImage { width: 0, height: 10 })
        ));
    }
}
