use rayon::prelude::*;
use std::f32::consts::PI;

use crate::loader::FloatImage;
use crate::view::transform::screen_to_image;

// ---------------------------------------------------------------------------
// CPU pixel pipeline: affine contrast transform + color remappings,
// applied while blitting into the softbuffer framebuffer
// ---------------------------------------------------------------------------

pub const BG_COLOR: [u8; 3] = [0, 0, 0];

/// Translucent fill for the advisory region marker.
const REGION_COLOR: (u8, u8, u8, u8) = (220, 60, 60, 110);

/// Everything the draw step needs from the viewport for one frame.
pub struct DrawParams {
    pub zoom: f64,
    pub pivot: (f64, f64),
    pub pan: (f64, f64),
    pub drag: (f64, f64),
    pub scale: f32,
    pub bias: f32,
    pub flow: bool,
}

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Unpack softbuffer u32 into (r, g, b).
fn unpack_rgb(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

/// HSV to RGB with the hue in degrees, wrapped modulo 360.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h / 60.0).floor().rem_euclid(6.0);
    let f = h / 60.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    match sector as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Polar-to-hue coloring for two-channel (flow) data: the vector angle
/// becomes the hue, the magnitude both saturation and value.
fn flow_color(u: f32, w: f32) -> (f32, f32, f32) {
    let angle = (180.0 / PI) * (w.atan2(-u) + PI);
    let mag = (u * u + w * w).sqrt();
    hsv_to_rgb(angle, mag, mag)
}

/// Shade one pixel: the optional color remapping followed by the affine
/// contrast transform, clamped to the display range.
fn shade(px: &[f32], scale: f32, bias: f32, flow: bool) -> u32 {
    let (r, g, b) = match (px.len(), flow) {
        (2, true) => flow_color(px[0], px[1]),
        (2, false) => {
            // two-channel data lands on red/blue when flow coloring is off
            return pack_clamped(px[0] * scale + bias, 0.0, px[1] * scale + bias);
        }
        (1, true) => hsv_to_rgb(px[0], px[0], px[0]),
        (1, false) => (px[0], px[0], px[0]),
        (_, true) => hsv_to_rgb(px[0], px[1], px[2]),
        _ => (px[0], px[1], px[2]),
    };
    pack_clamped(r * scale + bias, g * scale + bias, b * scale + bias)
}

fn pack_clamped(r: f32, g: f32, b: f32) -> u32 {
    rgb(
        (r.clamp(0.0, 1.0) * 255.0) as u8,
        (g.clamp(0.0, 1.0) * 255.0) as u8,
        (b.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Draw the image through the view transform, nearest-neighbor sampled.
/// Each framebuffer pixel center is mapped back into image space (the
/// inverse of the draw transform also subtracts the live drag offset);
/// pixels that land outside the image keep the background. Rows are shaded
/// in parallel.
pub fn blit_shaded(frame: &mut [u32], fb_w: u32, fb_h: u32, image: &FloatImage, p: &DrawParams) {
    let rows = frame.par_chunks_mut(fb_w as usize).take(fb_h as usize);
    rows.enumerate().for_each(|(dy, row)| {
        let sy = dy as f64 + 0.5;
        for (dx, out) in row.iter_mut().enumerate() {
            let sx = dx as f64 + 0.5;
            let (ix, iy) = screen_to_image(sx, sy, p.pivot, p.zoom, p.pan);
            let (ix, iy) = (ix - p.drag.0, iy - p.drag.1);
            if let Some(px) = image.sample(ix.floor() as i64, iy.floor() as i64) {
                *out = shade(px, p.scale, p.bias, p.flow);
            }
        }
    });
}

/// Fill a rectangle with a color, alpha-blended over the framebuffer.
pub fn fill_rect(frame: &mut [u32], fb_w: u32, fb_h: u32, rx: i32, ry: i32, rw: u32, rh: u32, color: (u8, u8, u8, u8)) {
    let a = color.3 as u32;
    for row in 0..rh {
        let y = ry + row as i32;
        if y < 0 || y as u32 >= fb_h {
            continue;
        }
        for col in 0..rw {
            let x = rx + col as i32;
            if x < 0 || x as u32 >= fb_w {
                continue;
            }
            let off = (y as u32 * fb_w + x as u32) as usize;
            let (dr, dg, db) = unpack_rgb(frame[off]);
            let r = ((color.0 as u32 * a + dr as u32 * (255 - a)) / 255) as u8;
            let g = ((color.1 as u32 * a + dg as u32 * (255 - a)) / 255) as u8;
            let b = ((color.2 as u32 * a + db as u32 * (255 - a)) / 255) as u8;
            frame[off] = rgb(r, g, b);
        }
    }
}

/// Translucent overlay for the advisory region marker, given its screen
/// corners in either order.
pub fn draw_region(frame: &mut [u32], fb_w: u32, fb_h: u32, corner_a: (f64, f64), corner_b: (f64, f64)) {
    let x0 = corner_a.0.min(corner_b.0);
    let y0 = corner_a.1.min(corner_b.1);
    let w = (corner_a.0 - corner_b.0).abs();
    let h = (corner_a.1 - corner_b.1).abs();
    fill_rect(frame, fb_w, fb_h, x0 as i32, y0 as i32, w as u32, h as u32, REGION_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_gray_when_unsaturated() {
        assert_eq!(hsv_to_rgb(123.0, 0.0, 0.25), (0.25, 0.25, 0.25));
    }

    #[test]
    fn hsv_primary_sectors() {
        let (r, g, b) = hsv_to_rgb(0.0, 1.0, 1.0);
        assert_eq!((r, g, b), (1.0, 0.0, 0.0));
        let (r, g, b) = hsv_to_rgb(120.0, 1.0, 1.0);
        assert_eq!((r, g, b), (0.0, 1.0, 0.0));
        let (r, g, b) = hsv_to_rgb(240.0, 1.0, 1.0);
        assert_eq!((r, g, b), (0.0, 0.0, 1.0));
    }

    #[test]
    fn flow_color_up_vector() {
        // (u, w) = (0, 1): angle atan2(1, 0) = pi/2 -> 270 degrees, unit magnitude
        let (r, g, b) = flow_color(0.0, 1.0);
        assert!((r - 0.5).abs() < 1e-5, "r = {r}");
        assert!(g.abs() < 1e-5);
        assert!((b - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shade_clamps_to_display_range() {
        let bright = shade(&[10.0, 10.0, 10.0], 1.0, 0.0, false);
        assert_eq!(bright, rgb(255, 255, 255));
        let dark = shade(&[-10.0, -10.0, -10.0], 1.0, 0.0, false);
        assert_eq!(dark, rgb(0, 0, 0));
    }

    #[test]
    fn shade_two_channel_uses_red_blue() {
        let c = shade(&[1.0, 0.5], 1.0, 0.0, false);
        assert_eq!(c, rgb(255, 0, 127));
    }

    #[test]
    fn blit_identity_maps_pixels_and_leaves_background() {
        let image = FloatImage::from_samples(vec![0.0, 1.0, 1.0, 0.0], 2, 2, 1);
        let params = DrawParams {
            zoom: 1.0,
            pivot: (0.0, 0.0),
            pan: (0.0, 0.0),
            drag: (0.0, 0.0),
            scale: 1.0,
            bias: 0.0,
            flow: false,
        };
        let mut frame = vec![rgb(9, 9, 9); 9];
        blit_shaded(&mut frame, 3, 3, &image, &params);
        assert_eq!(frame[0], rgb(0, 0, 0));
        assert_eq!(frame[1], rgb(255, 255, 255));
        assert_eq!(frame[3], rgb(255, 255, 255));
        assert_eq!(frame[4], rgb(0, 0, 0));
        // third row and column fall outside the image
        assert_eq!(frame[2], rgb(9, 9, 9));
        assert_eq!(frame[8], rgb(9, 9, 9));
    }

    #[test]
    fn blit_respects_live_drag_offset() {
        let image = FloatImage::from_samples(vec![1.0, 0.0, 0.0, 0.0], 2, 2, 1);
        let params = DrawParams {
            zoom: 1.0,
            pivot: (0.0, 0.0),
            pan: (0.0, 0.0),
            drag: (1.0, 0.0),
            scale: 1.0,
            bias: 0.0,
            flow: false,
        };
        let mut frame = vec![0u32; 4];
        blit_shaded(&mut frame, 2, 2, &image, &params);
        // dragging one pixel right shows sample (0,0) at screen x=1
        assert_eq!(frame[1], rgb(255, 255, 255));
    }
}
