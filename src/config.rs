use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::dots::{DotStyle, FadeCurve};
use crate::error::{Error, Result};
use crate::mapping::Region;
use crate::stale;
use crate::types::Rgba;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub session_dir: PathBuf,
    pub dot_color: String,
    pub dot_radius_px: u32,
    pub fade_ms: i64,
    pub fade_curve: FadeCurve,
    pub stale_grace_secs: Option<u64>,
    pub display: Option<Region>, // None = take it from the slide's screenshot meta
    pub sweep_interval_ms: u64,
    pub frame_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub trigger_file: PathBuf,
    pub trigger_cooldown_ms: u64,
    pub debug_background: bool,
    pub snapshot_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_dir: PathBuf::from("session"),
            dot_color: "#8E4EC6".to_string(),
            dot_radius_px: 8,
            fade_ms: 10_000,
            fade_curve: FadeCurve::Linear,
            stale_grace_secs: None,
            display: None,
            sweep_interval_ms: 1000,
            frame_interval_ms: 50,
            poll_interval_ms: 250,
            trigger_file: PathBuf::from("capture_now.txt"),
            trigger_cooldown_ms: 2000,
            debug_background: false,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

impl Config {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| Error::store(path, e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| Error::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Rgba::from_hex(&self.dot_color)?;
        if self.dot_radius_px == 0 {
            return Err(Error::Config("dot_radius_px must be at least 1".into()));
        }
        for (name, v) in [
            ("sweep_interval_ms", self.sweep_interval_ms),
            ("frame_interval_ms", self.frame_interval_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if v == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        if let Some(secs) = self.stale_grace_secs {
            if secs > stale::MAX_GRACE_SECS {
                return Err(Error::Config(format!(
                    "stale_grace_secs must be at most {}",
                    stale::MAX_GRACE_SECS
                )));
            }
        }
        if let Some(d) = self.display {
            if d.width == 0 || d.height == 0 {
                return Err(Error::Config("display must have a non-zero size".into()));
            }
        }
        Ok(())
    }

    pub fn dot_style(&self) -> Result<DotStyle> {
        Ok(DotStyle {
            color: Rgba::from_hex(&self.dot_color)?,
            radius: self.dot_radius_px as f32,
            fade_ms: self.fade_ms,
            curve: self.fade_curve,
        })
    }
}
