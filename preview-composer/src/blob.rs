//! Connected dark regions, used to find lens cut-outs in a design.
//!
//! Dark pixels are partitioned into 4-connected components with an explicit
//! work stack, so region size never touches the call stack.

use image::{Rgba, RgbaImage};

use crate::raster::Rect;

/// One 4-connected region of dark pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Row-major pixel indices into the scanned image.
    pub pixels: Vec<usize>,
    /// Bounding box in the scanned image's coordinates.
    pub bounds: Rect,
}

impl Blob {
    pub fn size(&self) -> usize {
        self.pixels.len()
    }
}

#[inline]
fn is_dark(pixel: &Rgba<u8>, threshold: u8) -> bool {
    let [r, g, b, _] = pixel.0;
    r < threshold && g < threshold && b < threshold
}

/// Find every dark region of at least `min_blob_size` pixels.
///
/// A pixel is dark when R, G and B are all below `threshold`.
pub fn detect_blobs(image: &RgbaImage, threshold: u8, min_blob_size: usize) -> Vec<Blob> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mask: Vec<bool> = image.pixels().map(|p| is_dark(p, threshold)).collect();
    let mut visited = vec![false; width * height];
    let mut stack = Vec::new();
    let mut blobs = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);

        let mut pixels = Vec::new();
        let (mut min_x, mut min_y) = (width, height);
        let (mut max_x, mut max_y) = (0, 0);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            pixels.push(idx);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            let mut visit = |n: usize| {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < width {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - width);
            }
            if y + 1 < height {
                visit(idx + width);
            }
        }

        if pixels.len() < min_blob_size {
            continue;
        }
        pixels.sort_unstable();
        blobs.push(Blob {
            pixels,
            bounds: Rect::new(
                min_x as i32,
                min_y as i32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            ),
        });
    }

    log::debug!("detected {} dark blobs (threshold {threshold}, min size {min_blob_size})", blobs.len());
    blobs
}

/// Rewrite every pixel of `blobs` to opaque white.
pub fn erase_blobs(image: &mut RgbaImage, blobs: &[Blob]) {
    let width = image.width() as usize;
    for blob in blobs {
        for &idx in &blob.pixels {
            image.put_pixel((idx % width) as u32, (idx / width) as u32, Rgba([255, 255, 255, 255]));
        }
    }
}

/// Union bounding box of all blobs.
pub fn blob_bounds(blobs: &[Blob]) -> Option<Rect> {
    blobs
        .iter()
        .map(|blob| blob.bounds)
        .reduce(|acc, bounds| acc.union(&bounds))
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use crate::{
        blob::{blob_bounds, detect_blobs, erase_blobs},
        raster::Rect,
    };

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn with_squares(size: u32, squares: &[(u32, u32, u32)]) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(size, size, WHITE);
        for &(x0, y0, side) in squares {
            for y in y0..y0 + side {
                for x in x0..x0 + side {
                    image.put_pixel(x, y, BLACK);
                }
            }
        }
        image
    }

    #[test]
    fn bright_image_has_no_blobs() {
        let image = RgbaImage::from_pixel(64, 64, WHITE);
        assert!(detect_blobs(&image, 128, 50).is_empty());
    }

    #[test]
    fn single_square() {
        let image = with_squares(64, &[(10, 12, 20)]);
        let blobs = detect_blobs(&image, 128, 50);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 400);
        assert_eq!(blobs[0].bounds, Rect::new(10, 12, 20, 20));
    }

    #[test]
    fn two_disjoint_squares() {
        let image = with_squares(100, &[(0, 0, 20), (50, 50, 10)]);
        let mut sizes: Vec<usize> = detect_blobs(&image, 128, 50).iter().map(|b| b.size()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![100, 400]);
    }

    #[test]
    fn small_blobs_are_dropped() {
        let image = with_squares(64, &[(0, 0, 20), (40, 40, 3)]);
        let blobs = detect_blobs(&image, 128, 50);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 400);
    }

    #[test]
    fn diagonal_pixels_are_not_connected() {
        let mut image = RgbaImage::from_pixel(4, 4, WHITE);
        image.put_pixel(0, 0, BLACK);
        image.put_pixel(1, 1, BLACK);
        assert_eq!(detect_blobs(&image, 128, 1).len(), 2);
    }

    #[test]
    fn darkness_needs_every_channel() {
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 200, 255]));
        assert!(detect_blobs(&image, 128, 1).is_empty());
        image.put_pixel(3, 3, Rgba([127, 127, 127, 255]));
        assert_eq!(detect_blobs(&image, 128, 1).len(), 1);
    }

    #[test]
    fn large_region_does_not_overflow() {
        let image = RgbaImage::from_pixel(1024, 1024, BLACK);
        let blobs = detect_blobs(&image, 128, 50);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size(), 1024 * 1024);
        assert_eq!(blobs[0].bounds, Rect::new(0, 0, 1024, 1024));
    }

    #[test]
    fn erase_and_bounds() {
        let mut image = with_squares(64, &[(0, 0, 10), (30, 40, 10)]);
        let blobs = detect_blobs(&image, 128, 50);
        assert_eq!(blob_bounds(&blobs), Some(Rect::new(0, 0, 40, 50)));

        erase_blobs(&mut image, &blobs);
        assert!(image.pixels().all(|p| *p == WHITE));
        assert_eq!(blob_bounds(&[]), None);
    }
}
