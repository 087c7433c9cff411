// The render loop. Everything that touches the dots runs here, on one thread:
// events come in through the channel, frames go out to the surface.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::Config;
use crate::draw;
use crate::error::Result;
use crate::overlay::{EventOutcome, Overlay};
use crate::session::OverlayEvent;
use crate::store::SlidePublisher;
use crate::surface::RenderSurface;
use crate::types::FrameBuffer;

/// Loop timing.
#[derive(Clone, Copy, Debug)]
pub struct Ticks {
    pub frame: Duration,
    pub sweep: Duration,
}

impl Ticks {
    pub fn from_config(config: &Config) -> Self {
        Self {
            frame: Duration::from_millis(config.frame_interval_ms),
            sweep: Duration::from_millis(config.sweep_interval_ms),
        }
    }
}

/// Frames per second, refreshed once per second.
struct FpsCounter {
    since: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self { since: now, frames: 0, fps: 0.0 }
    }

    fn frame(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.duration_since(self.since);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            log::trace!("FPS: {:.1}", self.fps);
            self.frames = 0;
            self.since = now;
        }
    }
}

/// Name for a slide published without an explicit URL.
pub fn generated_slide_url() -> String {
    format!("slides/{}.jpg", Utc::now().format("%Y%m%d_%H%M%S_%3f"))
}

pub struct App<S: RenderSurface, P: SlidePublisher> {
    overlay: Overlay,
    surface: S,
    publisher: P,
    events: Receiver<OverlayEvent>,
    screen: FrameBuffer,
    ticks: Ticks,
    last_sweep: Instant,
    fps: FpsCounter,
    snapshot_dir: PathBuf,
    connected: bool,
}

impl<S: RenderSurface, P: SlidePublisher> App<S, P> {
    pub fn new(
        overlay: Overlay,
        surface: S,
        publisher: P,
        events: Receiver<OverlayEvent>,
        ticks: Ticks,
    ) -> Self {
        let (w, h) = surface.size();
        let now = Instant::now();
        Self {
            overlay,
            surface,
            publisher,
            events,
            screen: FrameBuffer::new(w, h),
            ticks,
            last_sweep: now,
            fps: FpsCounter::new(now),
            snapshot_dir: PathBuf::from("snapshots"),
            connected: true,
        }
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn screen(&self) -> &FrameBuffer {
        &self.screen
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Apply every queued event without blocking. Returns how many were handled.
    pub fn drain_events(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while self.connected {
            let event = match self.events.try_recv() {
                Ok(e) => e,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("All event sources closed");
                    self.connected = false;
                    break;
                }
            };
            handled += 1;
            if let EventOutcome::Trigger { slide_url } = self.overlay.handle_event(event, now) {
                self.publish(slide_url);
            }
        }
        handled
    }

    fn publish(&mut self, slide_url: Option<String>) {
        let url = slide_url.unwrap_or_else(generated_slide_url);
        let meta = self.overlay.monitor_meta();
        match self.publisher.publish(&url, Some(meta)) {
            Ok(index) => log::info!("Successfully created slide {}", u64::from(index) + 1),
            Err(e) => log::warn!("Failed to publish slide {url}: {e}"),
        }
    }

    /// One loop iteration: input, events, paint, present, then the eviction
    /// sweep if it is due. Returns false when the presenter quit.
    pub fn step(&mut self, now: Instant) -> Result<bool> {
        let input = self.surface.poll_input();
        if input.quit || !self.surface.is_open() {
            return Ok(false);
        }
        if input.clear {
            log::info!("Overlay cleared from keyboard");
            self.overlay.clear_all();
        }

        self.drain_events(now);

        // Paint before sweeping so a new dot gets at least one frame.
        self.overlay.render(&mut self.screen, now);
        self.overlay.draw_hud(&mut self.screen, self.fps.fps);
        self.surface.present(&self.screen)?;
        self.fps.frame(now);

        if input.snapshot {
            self.save_snapshot();
        }

        if now.duration_since(self.last_sweep) >= self.ticks.sweep {
            self.overlay.sweep(now);
            self.last_sweep = now;
        }
        Ok(true)
    }

    fn save_snapshot(&self) {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let path = self.snapshot_dir.join(format!("overlay_{stamp}.png"));
        match draw::save_png(&self.screen, &path) {
            Ok(()) => log::info!("Saved overlay snapshot {}", path.display()),
            Err(e) => log::warn!("{e}"),
        }
    }

    /// Run until the surface closes or the presenter quits.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Overlay running - ESC quits, C clears, S saves a snapshot");
        loop {
            let frame_start = Instant::now();
            if !self.step(frame_start)? {
                break;
            }
            thread::sleep(self.ticks.frame.saturating_sub(frame_start.elapsed()));
        }
        self.overlay.clear_all();
        log::info!("Overlay window closed");
        Ok(())
    }
}
