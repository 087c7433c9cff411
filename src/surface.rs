// Where frames end up. The overlay only ever talks to `RenderSurface`, so the
// window flags of a particular platform stay in this file.

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::error::{Error, Result};
use crate::mapping::Region;
use crate::types::FrameBuffer;

/// Keys the presenter pressed since the last poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceInput {
    pub quit: bool,
    pub clear: bool,
    pub snapshot: bool,
}

pub trait RenderSurface {
    /// Drawable size in pixels.
    fn size(&self) -> (usize, usize);
    fn is_open(&self) -> bool;
    fn present(&mut self, frame: &FrameBuffer) -> Result<()>;
    fn poll_input(&mut self) -> SurfaceInput;
}

/// Borderless, always-on-top, transparent minifb window covering `region`.
pub struct WindowSurface {
    window: Window,
    width: usize,
    height: usize,
}

impl WindowSurface {
    /// Visual: nothing visible yet; a transparent window now sits over the region.
    pub fn new(title: &str, region: Region) -> Result<Self> {
        let (width, height) = (region.width as usize, region.height as usize);
        let options = WindowOptions {
            borderless: true,
            title: false,
            resize: false,
            topmost: true,
            transparency: true,
            none: true,
            ..WindowOptions::default()
        };
        let mut window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_position(region.x as isize, region.y as isize);
        log::info!("Overlay window shown: {width}x{height} at ({}, {})", region.x, region.y);
        Ok(Self { window, width, height })
    }
}

impl RenderSurface for WindowSurface {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn is_open(&self) -> bool {
        self.window.is_open()
    }

    fn present(&mut self, frame: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(&frame.pixels, frame.width, frame.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    fn poll_input(&mut self) -> SurfaceInput {
        SurfaceInput {
            quit: !self.window.is_open() || self.window.is_key_down(Key::Escape),
            clear: self.window.is_key_pressed(Key::C, KeyRepeat::No),
            snapshot: self.window.is_key_pressed(Key::S, KeyRepeat::No),
        }
    }
}
