// Core types shared by the renderer, the overlay and the window.

use crate::error::{Error, Result};

/// Fully transparent pixel (alpha 0). What the overlay window shows
/// everywhere a dot is not drawn.
pub const TRANSPARENT: u32 = 0x00_00_00_00;

#[derive(Clone, Debug)]
pub struct FrameBuffer {
    pub width: usize,     // how wide the overlay is on screen (pixels)
    pub height: usize,    // how tall the overlay is on screen (pixels)
    pub pixels: Vec<u32>, // each entry is 0xAARRGGBB for minifb
}

impl FrameBuffer {
    /// A transparent buffer of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![TRANSPARENT; width * height] }
    }

    /// Overwrite every pixel with `argb`.
    pub fn fill(&mut self, argb: u32) {
        self.pixels.iter_mut().for_each(|p| *p = argb);
    }

    /// Pixel at (x,y), or None outside the buffer.
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// True when no pixel carries any alpha.
    pub fn is_transparent(&self) -> bool {
        self.pixels.iter().all(|p| p >> 24 == 0)
    }
}

/// Straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Parse `#RRGGBB`, `RRGGBB`, `#RRGGBBAA` or `RRGGBBAA`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Color(s.to_string()));
        }

        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| Error::Color(s.to_string()))
        };
        let a = if hex.len() == 8 { byte(6)? } else { 0xFF };
        Ok(Self { r: byte(0)?, g: byte(2)?, b: byte(4)?, a })
    }

    /// Pack as 0xAARRGGBB.
    pub fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub fn from_argb(px: u32) -> Self {
        Self {
            a: (px >> 24) as u8,
            r: ((px >> 16) & 0xFF) as u8,
            g: ((px >> 8) & 0xFF) as u8,
            b: (px & 0xFF) as u8,
        }
    }
}
