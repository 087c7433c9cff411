// Tap dots: one marker per student tap, fading out over a fixed window.
// Visual outcomes:
// - A dot appears at full strength where the student tapped.
// - It fades along the configured curve and disappears when its window ends.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::types::Rgba;

/// How opacity falls from 1 to 0 across the fade window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeCurve {
    /// `1 - t`
    #[default]
    Linear,
    /// `(cos(pi * t) + 1) / 2`: slow start, slow finish.
    Cosine,
}

impl FadeCurve {
    /// Opacity for `progress` in [0,1] (fraction of the fade window elapsed).
    pub fn opacity(self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Cosine => ((PI * t).cos() + 1.0) / 2.0,
        }
    }
}

/// Look shared by every dot on the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotStyle {
    pub color: Rgba,
    pub radius: f32,
    /// Fade window in milliseconds; zero or negative means the dot never fades.
    pub fade_ms: i64,
    pub curve: FadeCurve,
}

/// One rendered marker. Nothing changes after creation; the dot is only ever removed.
#[derive(Clone, Debug, PartialEq)]
pub struct TapDot {
    pub x: f32, // surface-local pixels
    pub y: f32,
    pub color: Rgba,
    pub radius: f32,
    pub created_at: Instant,
    pub fade_ms: i64,
}

impl TapDot {
    pub fn fades(&self) -> bool {
        self.fade_ms > 0
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// True once the whole fade window has elapsed.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.fades() && self.elapsed(now) >= Duration::from_millis(self.fade_ms as u64)
    }
}

/// The set of live dots owned by the overlay.
pub struct DotField {
    style: DotStyle,
    dots: Vec<TapDot>,
}

impl DotField {
    pub fn new(style: DotStyle) -> Self {
        Self { style, dots: Vec::new() }
    }

    /// Add a dot created right now.
    pub fn add_dot(&mut self, x: f32, y: f32) -> &TapDot {
        self.add_dot_at(x, y, Instant::now())
    }

    /// Add a dot created at `now`.
    pub fn add_dot_at(&mut self, x: f32, y: f32, now: Instant) -> &TapDot {
        self.dots.push(TapDot {
            x,
            y,
            color: self.style.color,
            radius: self.style.radius,
            created_at: now,
            fade_ms: self.style.fade_ms,
        });
        log::debug!("Added dot at ({x:.1}, {y:.1}) total_dots={}", self.dots.len());
        &self.dots[self.dots.len() - 1]
    }

    /// Opacity of `dot` at `now`, in [0,1].
    pub fn opacity_of(&self, dot: &TapDot, now: Instant) -> f64 {
        if !dot.fades() {
            return 1.0;
        }
        let elapsed_ms = dot.elapsed(now).as_secs_f64() * 1000.0;
        let window_ms = dot.fade_ms as f64;
        if elapsed_ms >= window_ms {
            return 0.0;
        }
        self.style.curve.opacity(elapsed_ms / window_ms)
    }

    /// Drop every dot whose fade window has fully elapsed. Returns how many went.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.dots.len();
        self.dots.retain(|d| !d.is_expired(now));
        let removed = before - self.dots.len();
        if removed > 0 {
            log::debug!("Removed {removed} expired dots");
        }
        removed
    }

    pub fn clear_all(&mut self) {
        if !self.dots.is_empty() {
            log::debug!("Cleared {} overlay dots", self.dots.len());
            self.dots.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TapDot> {
        self.dots.iter()
    }

    /// Live dots paired with their opacity at `now`; fully faded ones are skipped.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = (&TapDot, f64)> + '_ {
        self.dots
            .iter()
            .map(move |d| (d, self.opacity_of(d, now)))
            .filter(|(_, a)| *a > 0.0)
    }
}
