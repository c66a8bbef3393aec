//! Fit-to-canvas scaling.
//!
//! A source frame is scaled into the largest centered rectangle of the canvas
//! that keeps the source aspect ratio. Pixels outside that rectangle keep the
//! background color, pixels inside are nearest-neighbor samples of the source.

use image::{Rgb, RgbImage};

/// Region of the canvas the scaled source occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FitRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

pub fn fit_rect(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> FitRect {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return FitRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    let src_ratio = src_width as f64 / src_height as f64;
    let dst_ratio = dst_width as f64 / dst_height as f64;

    let (width, height) = if src_ratio > dst_ratio {
        (dst_width, (dst_width as f64 / src_ratio) as u32)
    } else {
        ((dst_height as f64 * src_ratio) as u32, dst_height)
    };
    // Truncation can land one pixel past the canvas on extreme ratios.
    let width = width.min(dst_width);
    let height = height.min(dst_height);

    FitRect {
        x: (dst_width - width) / 2,
        y: (dst_height - height) / 2,
        width,
        height,
    }
}

/// Scales `source` into a `width` x `height` canvas filled with `background`.
pub fn letterbox(source: &RgbImage, width: u32, height: u32, background: Rgb<u8>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, background);
    letterbox_into(source, &mut canvas, background);
    canvas
}

/// Same as [`letterbox`] but reuses an existing canvas.
pub fn letterbox_into(source: &RgbImage, canvas: &mut RgbImage, background: Rgb<u8>) {
    for pixel in canvas.pixels_mut() {
        *pixel = background;
    }

    let (src_width, src_height) = source.dimensions();
    let rect = fit_rect(src_width, src_height, canvas.width(), canvas.height());
    if rect.is_empty() {
        return;
    }

    let width_ratio = src_width as f64 / rect.width as f64;
    let height_ratio = src_height as f64 / rect.height as f64;

    for y in 0..rect.height {
        let src_y = ((y as f64 * height_ratio).floor() as u32).min(src_height - 1);
        for x in 0..rect.width {
            let src_x = ((x as f64 * width_ratio).floor() as u32).min(src_width - 1);
            canvas.put_pixel(rect.x + x, rect.y + y, *source.get_pixel(src_x, src_y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZES: [u32; 9] = [1, 2, 3, 7, 16, 97, 320, 480, 1920];

    #[test]
    fn test_fit_rect_fits_and_is_centered() {
        for &sw in &SIZES {
            for &sh in &SIZES {
                for &dw in &SIZES {
                    for &dh in &SIZES {
                        let rect = fit_rect(sw, sh, dw, dh);
                        assert!(rect.x + rect.width <= dw, "{sw}x{sh} -> {dw}x{dh}: {rect:?}");
                        assert!(rect.y + rect.height <= dh, "{sw}x{sh} -> {dw}x{dh}: {rect:?}");

                        assert!(rect.width == dw || rect.height == dh);

                        let right = dw - rect.x - rect.width;
                        let bottom = dh - rect.y - rect.height;
                        assert!(right - rect.x <= 1, "{sw}x{sh} -> {dw}x{dh}: {rect:?}");
                        assert!(bottom - rect.y <= 1, "{sw}x{sh} -> {dw}x{dh}: {rect:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_fit_rect_preserves_aspect_ratio() {
        for &sw in &SIZES {
            for &sh in &SIZES {
                for &dw in &SIZES {
                    for &dh in &SIZES {
                        let rect = fit_rect(sw, sh, dw, dh);
                        if rect.is_empty() {
                            continue;
                        }
                        // Cross-multiplied, one pixel of truncation on the clamped side.
                        let ratio = sw as f64 / sh as f64;
                        if rect.width == dw {
                            let exact = rect.width as f64 / ratio;
                            assert!((exact - rect.height as f64).abs() < 1.0 + 1e-9);
                        } else {
                            let exact = rect.height as f64 * ratio;
                            assert!((exact - rect.width as f64).abs() < 1.0 + 1e-9);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_fit_rect_examples() {
        // Wide source into a 4:3 canvas: bars top and bottom.
        assert_eq!(
            fit_rect(1920, 1080, 640, 480),
            FitRect {
                x: 0,
                y: 60,
                width: 640,
                height: 360
            }
        );
        // Tall source: bars left and right.
        assert_eq!(
            fit_rect(480, 640, 640, 480),
            FitRect {
                x: 140,
                y: 0,
                width: 360,
                height: 480
            }
        );
        // Same ratio fills the canvas.
        assert_eq!(
            fit_rect(1280, 960, 640, 480),
            FitRect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_fit_rect_degenerate() {
        assert!(fit_rect(0, 480, 640, 480).is_empty());
        assert!(fit_rect(640, 480, 0, 0).is_empty());
    }

    #[test]
    fn test_letterbox_fills_margins_and_samples_source() {
        let red = Rgb([255, 0, 0]);
        let blue = Rgb([0, 0, 255]);
        // Left half red, right half blue.
        let source = RgbImage::from_fn(4, 2, |x, _| if x < 2 { red } else { blue });
        let background = Rgb([0, 0, 0]);

        let canvas = letterbox(&source, 8, 8, background);
        assert_eq!(canvas.dimensions(), (8, 8));

        // 2:1 source into 8x8 -> 8x4 at y = 2.
        for x in 0..8 {
            assert_eq!(*canvas.get_pixel(x, 0), background);
            assert_eq!(*canvas.get_pixel(x, 1), background);
            assert_eq!(*canvas.get_pixel(x, 6), background);
            assert_eq!(*canvas.get_pixel(x, 7), background);
        }
        for y in 2..6 {
            for x in 0..4 {
                assert_eq!(*canvas.get_pixel(x, y), red);
            }
            for x in 4..8 {
                assert_eq!(*canvas.get_pixel(x, y), blue);
            }
        }
    }

    #[test]
    fn test_letterbox_into_clears_previous_frame() {
        let white = Rgb([255, 255, 255]);
        let gray = Rgb([10, 10, 10]);
        let mut canvas = RgbImage::from_pixel(6, 6, white);

        let tall = RgbImage::from_pixel(1, 2, white);
        letterbox_into(&tall, &mut canvas, gray);

        // 1:2 into 6x6 -> 3x6 at x = 1.
        assert_eq!(*canvas.get_pixel(0, 0), gray);
        assert_eq!(*canvas.get_pixel(1, 0), white);
        assert_eq!(*canvas.get_pixel(3, 5), white);
        assert_eq!(*canvas.get_pixel(4, 5), gray);
        assert_eq!(*canvas.get_pixel(5, 5), gray);
    }

    #[test]
    fn test_letterbox_empty_source_gives_background() {
        let background = Rgb([1, 2, 3]);
        let canvas = letterbox(&RgbImage::new(0, 0), 3, 2, background);
        assert!(canvas.pixels().all(|p| *p == background));
    }
}
