// Software drawing onto the overlay frame buffer.
// Visual effects provided here:
// 1) Soft-edged tap dots, alpha-composited so overlapping dots stack.
// 2) An optional tinted debug background with a border.
// 3) A tiny 5x7 bitmap font for the debug HUD line.
// 4) PNG export of whatever is currently in the buffer.

use std::path::Path;
use std::time::Instant;

use crate::dots::DotField;
use crate::error::{Error, Result};
use crate::types::{FrameBuffer, Rgba, TRANSPARENT};

/// Debug tint: rgba(30,30,30,120).
pub const DEBUG_BACKGROUND: u32 = 0x78_1E_1E_1E;
/// Debug border: faint yellow.
pub const DEBUG_BORDER: u32 = 0x78_FF_FF_00;
pub const HUD_COLOR: u32 = 0xFF_FF_FF_FF;

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Composite `color` at `alpha` (0..1) over the pixel already at (x,y).
/// Straight alpha in, straight alpha out.
#[inline]
fn blend_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: Rgba, alpha: f32) {
    if x < 0 || y < 0 || alpha <= 0.0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = blend_over(fb.pixels[idx], color, alpha);
}

/// "Over" operator on 0xAARRGGBB pixels.
pub fn blend_over(dst: u32, src: Rgba, alpha: f32) -> u32 {
    let sa = alpha.clamp(0.0, 1.0);
    let d = Rgba::from_argb(dst);
    let da = d.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let mix = |s: u8, d: u8| {
        let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba {
        r: mix(src.r, d.r),
        g: mix(src.g, d.g),
        b: mix(src.b, d.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
    .to_argb()
}

/// Draw a filled disc centered at (cx,cy) with a one-pixel anti-aliased rim.
/// `strength` in [0,1] scales the color's own alpha.
pub fn fill_disc(fb: &mut FrameBuffer, cx: f32, cy: f32, radius: f32, color: Rgba, strength: f32) {
    if radius <= 0.0 || strength <= 0.0 {
        return;
    }
    let base = strength * color.a as f32 / 255.0;
    let reach = radius + 1.0;

    // Scan just the bounding box (fast enough for dot-sized radii)
    let (x0, x1) = ((cx - reach).floor() as i32, (cx + reach).ceil() as i32);
    let (y0, y1) = ((cy - reach).floor() as i32, (cy + reach).ceil() as i32);
    for y in y0..=y1 {
        for x in x0..=x1 {
            // Sample at the pixel center
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend_pixel(fb, x, y, color, base * coverage);
            }
        }
    }
}

/// Paint every visible dot at its current opacity, oldest first.
pub fn draw_dots(fb: &mut FrameBuffer, field: &DotField, now: Instant) -> usize {
    let mut painted = 0;
    for (dot, opacity) in field.visible(now) {
        fill_disc(fb, dot.x, dot.y, dot.radius, dot.color, opacity as f32);
        painted += 1;
    }
    painted
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0, x1, y1) = (x0, y0, x1, y1);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Tinted background plus a one-pixel border around the whole surface.
/// Visual: the overlay's extent becomes visible for troubleshooting.
pub fn draw_debug_background(fb: &mut FrameBuffer) {
    fb.fill(DEBUG_BACKGROUND);
    if fb.width == 0 || fb.height == 0 {
        return;
    }
    let (r, b) = (fb.width as i32 - 1, fb.height as i32 - 1);
    draw_line(fb, 0, 0, r, 0, DEBUG_BORDER);
    draw_line(fb, r, 0, r, b, DEBUG_BORDER);
    draw_line(fb, r, b, 0, b, DEBUG_BORDER);
    draw_line(fb, 0, b, 0, 0, DEBUG_BORDER);
}

/* ---------- 5x7 bitmap font (ASCII subset for "SLIDE 3 | DOTS 12 | FPS: 20.0") ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // Uppercase letters we need: S L I D E O T F P
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),

        // Punctuation: space, vertical bar, colon, dot, dash
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y) with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        for (offset, c) in [(1, 0xFF_00_00_00), (0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx + offset, y + ry as i32 + offset, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs; each glyph is 5x7 with 1-pixel spacing.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6; // 5 pixels glyph width + 1 pixel spacing
    }
}

/// Write the buffer as an RGBA PNG (transparent where nothing was drawn).
pub fn save_png(fb: &FrameBuffer, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| Error::store(dir, e))?;
    }
    let img = image::RgbaImage::from_fn(fb.width as u32, fb.height as u32, |x, y| {
        let c = Rgba::from_argb(fb.pixels[y as usize * fb.width + x as usize]);
        image::Rgba([c.r, c.g, c.b, c.a])
    });
    img.save(path).map_err(|e| Error::ImageExport(format!("{}: {e}", path.display())))
}
