//! Highlight overlay painter
//!
//! Draws composed boxes onto a rendered page: a translucent yellow fill with
//! a darker outline, the active box more opaque than the rest.

use image::{Rgb, RgbImage};

use crate::compositor::OverlayBox;
use crate::preview::PageImage;

pub const FILL_COLOR: Rgb<u8> = Rgb([253, 224, 71]);
pub const OUTLINE_COLOR: Rgb<u8> = Rgb([234, 179, 8]);

const FILL_ALPHA: f32 = 0.4;
const OUTLINE_ALPHA: f32 = 0.6;
pub const ACTIVE_OPACITY: f32 = 0.9;
pub const INACTIVE_OPACITY: f32 = 0.6;

/// Copy a page surface into an `RgbImage`.
///
/// Returns `None` if the pixel buffer does not match the dimensions.
#[must_use]
pub fn page_image_to_rgb(image: &PageImage) -> Option<RgbImage> {
    RgbImage::from_raw(image.width_px, image.height_px, image.pixels.clone())
}

/// Paint every box onto `canvas`, clipped to its bounds
pub fn paint_overlay(canvas: &mut RgbImage, boxes: &[OverlayBox]) {
    for overlay in boxes {
        let opacity = if overlay.active {
            ACTIVE_OPACITY
        } else {
            INACTIVE_OPACITY
        };
        if let Some(rect) = PixelRect::clip(overlay, canvas.width(), canvas.height()) {
            paint_rect(canvas, rect, opacity);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl PixelRect {
    fn clip(overlay: &OverlayBox, width: u32, height: u32) -> Option<Self> {
        let b = &overlay.rendered;
        let coords = [b.left, b.top, b.width, b.height];
        if coords.iter().any(|c| !c.is_finite()) || b.width <= 0.0 || b.height <= 0.0 {
            return None;
        }

        let x0 = b.left.floor().clamp(0.0, f64::from(width)) as u32;
        let y0 = b.top.floor().clamp(0.0, f64::from(height)) as u32;
        let x1 = (b.left + b.width).ceil().clamp(0.0, f64::from(width)) as u32;
        let y1 = (b.top + b.height).ceil().clamp(0.0, f64::from(height)) as u32;

        (x0 < x1 && y0 < y1).then_some(Self { x0, y0, x1, y1 })
    }

    fn on_edge(&self, x: u32, y: u32) -> bool {
        x == self.x0 || y == self.y0 || x + 1 == self.x1 || y + 1 == self.y1
    }
}

fn paint_rect(canvas: &mut RgbImage, rect: PixelRect, opacity: f32) {
    let fill_alpha = FILL_ALPHA * opacity;
    let outline_alpha = OUTLINE_ALPHA * opacity;

    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            let (color, alpha) = if rect.on_edge(x, y) {
                (OUTLINE_COLOR, outline_alpha)
            } else {
                (FILL_COLOR, fill_alpha)
            };
            let pixel = canvas.get_pixel_mut(x, y);
            *pixel = blend(*pixel, color, alpha);
        }
    }
}

fn blend(base: Rgb<u8>, over: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |b: u8, o: u8| {
        (f32::from(b) * (1.0 - alpha) + f32::from(o) * alpha)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgb([
        mix(base[0], over[0]),
        mix(base[1], over[1]),
        mix(base[2], over[2]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::RenderedBox;

    fn overlay(left: f64, top: f64, width: f64, height: f64, active: bool) -> OverlayBox {
        OverlayBox {
            rendered: RenderedBox {
                id: "0-0".to_string(),
                left,
                top,
                width,
                height,
            },
            active,
        }
    }

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn paints_inside_box_only() {
        let mut canvas = white(20, 20);
        paint_overlay(&mut canvas, &[overlay(5.0, 5.0, 10.0, 10.0, false)]);

        assert_eq!(*canvas.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(19, 19), Rgb([255, 255, 255]));
        assert_ne!(*canvas.get_pixel(10, 10), Rgb([255, 255, 255]));
    }

    #[test]
    fn active_box_is_more_opaque() {
        let mut inactive = white(10, 10);
        let mut active = white(10, 10);
        paint_overlay(&mut inactive, &[overlay(0.0, 0.0, 10.0, 10.0, false)]);
        paint_overlay(&mut active, &[overlay(0.0, 0.0, 10.0, 10.0, true)]);

        // Blue channel drops the most when blending yellow over white
        assert!(active.get_pixel(5, 5)[2] < inactive.get_pixel(5, 5)[2]);
    }

    #[test]
    fn boxes_outside_canvas_or_empty_are_skipped() {
        let mut canvas = white(10, 10);
        paint_overlay(
            &mut canvas,
            &[
                overlay(50.0, 50.0, 5.0, 5.0, false),
                overlay(2.0, 2.0, 0.0, 4.0, false),
                overlay(f64::NAN, 2.0, 3.0, 3.0, false),
            ],
        );
        assert!(canvas.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn partially_visible_box_is_clipped() {
        let mut canvas = white(10, 10);
        paint_overlay(&mut canvas, &[overlay(-5.0, -5.0, 8.0, 8.0, false)]);

        assert_ne!(*canvas.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([255, 255, 255]));
    }

    #[test]
    fn rejects_mismatched_surface() {
        let image = PageImage {
            pixels: vec![0; 5],
            width_px: 2,
            height_px: 2,
        };
        assert!(page_image_to_rgb(&image).is_none());
    }
}
