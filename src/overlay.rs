// The overlay: turns session/tap events into dots and paints them.
// Visual outcomes:
// - A tap for the slide on screen appears as a dot where the student pressed.
// - Changing slides (or asking for a new one) wipes every dot at once.

use std::time::Instant;

use crate::dots::{DotField, DotStyle};
use crate::draw::{self, HUD_COLOR};
use crate::mapping::{self, Region};
use crate::session::{MonitorMeta, OverlayEvent, SessionDoc, TapResponse};
use crate::stale::StaleFilter;
use crate::types::{FrameBuffer, TRANSPARENT};

/// What happened to one tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    Drawn,
    /// Response belongs to a slide that is not on screen.
    WrongSlide,
    /// Older than the stale-response cutoff.
    Stale,
    /// Coordinates outside [0,1] or not finite.
    Malformed,
    /// Mapped outside the overlay surface.
    OutOfBounds,
}

/// What the overlay did with an event; the caller acts on `Trigger`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Session { cleared: bool },
    Tap(TapOutcome),
    Trigger { slide_url: Option<String> },
}

pub struct Overlay {
    field: DotField,
    surface: Region,          // where the overlay window sits on screen
    display: Option<Region>,  // fixed tap region from config
    meta: Option<MonitorMeta>,
    slide_index: Option<u32>,
    stale: StaleFilter,
    debug_background: bool,
}

impl Overlay {
    pub fn new(
        style: DotStyle,
        surface: Region,
        display: Option<Region>,
        stale: StaleFilter,
    ) -> Self {
        log::info!(
            "Overlay created: {}x{} at ({}, {}) stale_filter={}",
            surface.width,
            surface.height,
            surface.x,
            surface.y,
            stale.enabled()
        );
        Self {
            field: DotField::new(style),
            surface,
            display,
            meta: None,
            slide_index: None,
            stale,
            debug_background: false,
        }
    }

    pub fn with_debug_background(mut self, on: bool) -> Self {
        self.debug_background = on;
        self
    }

    pub fn dots(&self) -> &DotField {
        &self.field
    }

    pub fn slide_index(&self) -> Option<u32> {
        self.slide_index
    }

    pub fn surface(&self) -> Region {
        self.surface
    }

    /// Region taps are mapped into: the configured display, else the size of the
    /// monitor the slide came from (placed at the overlay origin), else the overlay itself.
    pub fn tap_region(&self) -> Region {
        if let Some(d) = self.display {
            return d;
        }
        match self.meta {
            Some(m) if m.width > 0 && m.height > 0 => {
                Region::new(self.surface.x, self.surface.y, m.width, m.height)
            }
            _ => self.surface,
        }
    }

    pub fn handle_event(&mut self, event: OverlayEvent, now: Instant) -> EventOutcome {
        match event {
            OverlayEvent::SessionChanged(doc) => {
                EventOutcome::Session { cleared: self.apply_session(&doc) }
            }
            OverlayEvent::Tap { slide_index, response } => {
                EventOutcome::Tap(self.apply_tap(slide_index, &response, now))
            }
            OverlayEvent::Trigger { slide_url } => {
                log::info!("Capture triggered, clearing overlay");
                self.clear_all();
                EventOutcome::Trigger { slide_url }
            }
        }
    }

    /// Returns true if the slide changed and the dots were cleared.
    fn apply_session(&mut self, doc: &SessionDoc) -> bool {
        self.meta = doc.screenshot_meta;
        log::info!(
            "Session updated: slide {}/{}",
            u64::from(doc.slide_index) + 1,
            doc.slides.len()
        );

        if self.slide_index == Some(doc.slide_index) {
            return false;
        }
        self.slide_index = Some(doc.slide_index);
        self.clear_all();
        log::info!("Cleared overlay dots due to slide change");
        true
    }

    fn apply_tap(&mut self, slide_index: u32, response: &TapResponse, now: Instant) -> TapOutcome {
        if self.slide_index != Some(slide_index) {
            log::debug!(
                "Ignoring response for slide {slide_index}, showing {:?}",
                self.slide_index
            );
            return TapOutcome::WrongSlide;
        }
        if self.stale.is_stale(response.timestamp) {
            log::debug!("Skipping stale response from {}", response.timestamp);
            return TapOutcome::Stale;
        }
        if let Err(e) = mapping::validate_normalized(response.x, response.y) {
            log::warn!("{e}");
            return TapOutcome::Malformed;
        }

        let (px, py) = self.tap_region().to_screen(response.x, response.y);
        let (lx, ly) = self.surface.to_local(px, py);
        if !self.surface.contains_local(lx, ly) {
            log::warn!("Dot ({px:.1}, {py:.1}) outside overlay {:?}, skipped", self.surface);
            return TapOutcome::OutOfBounds;
        }

        self.field.add_dot_at(lx as f32, ly as f32, now);
        log::debug!(
            "Added dot at ({px:.1}, {py:.1}) from normalized ({:.3}, {:.3})",
            response.x,
            response.y
        );
        TapOutcome::Drawn
    }

    pub fn clear_all(&mut self) {
        self.field.clear_all();
    }

    /// Eviction sweep. Returns how many dots expired.
    pub fn sweep(&mut self, now: Instant) -> usize {
        self.field.evict_expired(now)
    }

    /// Paint the whole overlay into `fb` (background first, then dots).
    pub fn render(&self, fb: &mut FrameBuffer, now: Instant) -> usize {
        if self.debug_background {
            draw::draw_debug_background(fb);
        } else {
            fb.fill(TRANSPARENT);
        }
        draw::draw_dots(fb, &self.field, now)
    }

    /// Diagnostics line for the debug HUD.
    pub fn hud_line(&self, fps: f32) -> String {
        let slide = match self.slide_index {
            Some(i) => (u64::from(i) + 1).to_string(),
            None => "-".to_string(),
        };
        format!("SLIDE {slide} | DOTS {} | FPS: {fps:.1}", self.field.len())
    }

    pub fn draw_hud(&self, fb: &mut FrameBuffer, fps: f32) {
        if self.debug_background {
            draw::draw_text_5x7(fb, 8, 8, &self.hud_line(fps), HUD_COLOR);
        }
    }

    /// Monitor meta describing this overlay, for publishing new slides.
    pub fn monitor_meta(&self) -> MonitorMeta {
        let r = self.tap_region();
        MonitorMeta {
            width: r.width,
            height: r.height,
            monitor_index: self.meta.map_or(0, |m| m.monitor_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dots::FadeCurve;
    use crate::types::Rgba;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn style() -> DotStyle {
        DotStyle {
            color: Rgba::opaque(0xFF, 0, 0xFF),
            radius: 4.0,
            fade_ms: 1000,
            curve: FadeCurve::Linear,
        }
    }

    fn overlay(stale: StaleFilter) -> Overlay {
        Overlay::new(style(), Region::new(100, 50, 200, 100), None, stale)
    }

    fn session(index: u32) -> OverlayEvent {
        OverlayEvent::SessionChanged(SessionDoc {
            slide_index: index,
            slides: (0..=index).map(|i| format!("slide-{i}.jpg")).collect(),
            ..SessionDoc::default()
        })
    }

    fn tap(slide_index: u32, x: f64, y: f64) -> OverlayEvent {
        OverlayEvent::Tap { slide_index, response: TapResponse::new(x, y, Utc::now()) }
    }

    fn no_filter() -> StaleFilter {
        StaleFilter::new(Utc::now(), None)
    }

    #[test]
    fn tap_maps_into_surface_local_coordinates() {
        let now = Instant::now();
        let mut o = overlay(no_filter());
        o.handle_event(session(0), now);
        assert_eq!(o.handle_event(tap(0, 0.5, 0.5), now), EventOutcome::Tap(TapOutcome::Drawn));
        let dot = o.dots().iter().next().unwrap();
        assert_eq!((dot.x, dot.y), (100.0, 50.0));
    }

    #[test]
    fn taps_for_other_slides_are_ignored() {
        let now = Instant::now();
        let mut o = overlay(no_filter());
        let out = o.handle_event(tap(0, 0.5, 0.5), now);
        assert_eq!(out, EventOutcome::Tap(TapOutcome::WrongSlide));
        o.handle_event(session(1), now);
        let out = o.handle_event(tap(0, 0.5, 0.5), now);
        assert_eq!(out, EventOutcome::Tap(TapOutcome::WrongSlide));
        assert!(o.dots().is_empty());
    }

    #[test]
    fn slide_change_clears_but_same_slide_does_not() {
        let now = Instant::now();
        let mut o = overlay(no_filter());
        assert_eq!(o.handle_event(session(0), now), EventOutcome::Session { cleared: true });
        o.handle_event(tap(0, 0.1, 0.1), now);
        o.handle_event(tap(0, 0.9, 0.9), now);

        assert_eq!(o.handle_event(session(0), now), EventOutcome::Session { cleared: false });
        assert_eq!(o.dots().len(), 2);

        assert_eq!(o.handle_event(session(1), now), EventOutcome::Session { cleared: true });
        assert!(o.dots().is_empty());
        assert_eq!(o.slide_index(), Some(1));
    }

    #[test]
    fn trigger_clears_and_hands_back_url() {
        let now = Instant::now();
        let mut o = overlay(no_filter());
        o.handle_event(session(0), now);
        o.handle_event(tap(0, 0.2, 0.2), now);
        let out = o.handle_event(OverlayEvent::Trigger { slide_url: Some("next.jpg".into()) }, now);
        assert_eq!(out, EventOutcome::Trigger { slide_url: Some("next.jpg".into()) });
        assert!(o.dots().is_empty());
    }

    #[test]
    fn malformed_and_stale_taps_are_skipped() {
        let now = Instant::now();
        let mut o = overlay(StaleFilter::from_grace_secs(Utc::now(), Some(10)));
        o.handle_event(session(0), now);
        assert_eq!(o.handle_event(tap(0, 1.5, 0.5), now), EventOutcome::Tap(TapOutcome::Malformed));

        let old = TapResponse::new(0.5, 0.5, Utc::now() - ChronoDuration::seconds(100));
        let out = o.handle_event(OverlayEvent::Tap { slide_index: 0, response: old }, now);
        assert_eq!(out, EventOutcome::Tap(TapOutcome::Stale));

        // Processing continues after bad input.
        assert_eq!(o.handle_event(tap(0, 0.5, 0.5), now), EventOutcome::Tap(TapOutcome::Drawn));
        assert_eq!(o.dots().len(), 1);
    }

    #[test]
    fn region_from_session_meta_and_bounds_policy() {
        let now = Instant::now();
        let mut o = overlay(no_filter());
        // Slide was taken on a larger monitor than the overlay covers.
        o.handle_event(
            OverlayEvent::SessionChanged(SessionDoc {
                slide_index: 0,
                screenshot_meta: Some(MonitorMeta { width: 400, height: 100, monitor_index: 1 }),
                ..SessionDoc::default()
            }),
            now,
        );
        assert_eq!(o.tap_region(), Region::new(100, 50, 400, 100));
        assert_eq!(o.handle_event(tap(0, 0.25, 1.0), now), EventOutcome::Tap(TapOutcome::Drawn));
        let out = o.handle_event(tap(0, 0.75, 0.5), now);
        assert_eq!(out, EventOutcome::Tap(TapOutcome::OutOfBounds));
        assert_eq!(o.monitor_meta(), MonitorMeta { width: 400, height: 100, monitor_index: 1 });
    }

    #[test]
    fn configured_display_wins_over_meta() {
        let display = Region::new(100, 50, 100, 50);
        let mut o =
            Overlay::new(style(), Region::new(100, 50, 200, 100), Some(display), no_filter());
        o.handle_event(
            OverlayEvent::SessionChanged(SessionDoc {
                screenshot_meta: Some(MonitorMeta { width: 4000, height: 4000, monitor_index: 0 }),
                ..SessionDoc::default()
            }),
            Instant::now(),
        );
        assert_eq!(o.tap_region(), display);
    }

    #[test]
    fn render_and_sweep() {
        let t0 = Instant::now();
        let mut o = overlay(no_filter());
        o.handle_event(session(0), t0);
        o.handle_event(tap(0, 0.1, 0.2), t0);

        let mut fb = FrameBuffer::new(200, 100);
        assert_eq!(o.render(&mut fb, t0), 1);
        assert_eq!(fb.get(20, 20), Some(Rgba::opaque(0xFF, 0, 0xFF).to_argb()));

        let later = t0 + Duration::from_millis(1000);
        assert_eq!(o.sweep(later), 1);
        assert_eq!(o.render(&mut fb, later), 0);
        assert!(fb.is_transparent());
    }

    #[test]
    fn highest_slide_index_is_displayed() {
        // Make log arguments evaluate even without an installed logger.
        log::set_max_level(log::LevelFilter::Trace);
        let mut o = overlay(no_filter());
        let doc = SessionDoc { slide_index: u32::MAX, ..SessionDoc::default() };
        let out = o.handle_event(OverlayEvent::SessionChanged(doc), Instant::now());
        assert_eq!(out, EventOutcome::Session { cleared: true });
        assert_eq!(o.hud_line(0.0), "SLIDE 4294967296 | DOTS 0 | FPS: 0.0");
    }

    #[test]
    fn hud_line_reports_slide_and_dots() {
        let now = Instant::now();
        let mut o = overlay(no_filter()).with_debug_background(true);
        assert_eq!(o.hud_line(0.0), "SLIDE - | DOTS 0 | FPS: 0.0");
        o.handle_event(session(2), now);
        o.handle_event(tap(2, 0.5, 0.5), now);
        assert_eq!(o.hud_line(19.96), "SLIDE 3 | DOTS 1 | FPS: 20.0");

        let mut fb = FrameBuffer::new(200, 100);
        o.render(&mut fb, now);
        o.draw_hud(&mut fb, 20.0);
        assert!(!fb.is_transparent());
    }
}
