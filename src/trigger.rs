// Marker-file trigger: `echo > capture_now.txt` asks for a new slide.
//
// The marker is consumed (deleted) every time it is seen. Anything written in
// it becomes the slide URL. Repeats inside the cooldown window are dropped so a
// double-tapped shortcut does not publish two slides.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant, SystemTime};

use crate::error::{Error, Result};
use crate::session::OverlayEvent;
use crate::task::{self, TaskHandle};

/// How often the marker file is checked.
pub const TRIGGER_POLL: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerCheck {
    Idle,
    Fired,
    CoolingDown,
    Disconnected,
}

pub struct FileTrigger {
    path: PathBuf,
    cooldown: Duration,
    tx: Sender<OverlayEvent>,
    last_fired: Option<Instant>,
    last_modified: Option<SystemTime>, // mtime of a marker we failed to delete
}

impl FileTrigger {
    pub fn new(path: impl Into<PathBuf>, cooldown: Duration, tx: Sender<OverlayEvent>) -> Self {
        Self { path: path.into(), cooldown, tx, last_fired: None, last_modified: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn check(&mut self, now: Instant) -> Result<TriggerCheck> {
        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TriggerCheck::Idle),
            Err(e) => return Err(Error::store(&self.path, e)),
        };
        let modified = meta.modified().ok();
        if modified.is_some() && modified == self.last_modified {
            return Ok(TriggerCheck::Idle);
        }

        let content = fs::read_to_string(&self.path).unwrap_or_default();
        self.consume_marker(modified);

        if let Some(last) = self.last_fired {
            let since = now.saturating_duration_since(last);
            if since < self.cooldown {
                let remaining = self.cooldown - since;
                log::info!("Trigger cooldown active - {}ms remaining", remaining.as_millis());
                return Ok(TriggerCheck::CoolingDown);
            }
        }
        self.last_fired = Some(now);

        let slide_url = Some(content.trim().to_string()).filter(|s| !s.is_empty());
        log::info!("Trigger file detected - requesting new slide");
        if self.tx.send(OverlayEvent::Trigger { slide_url }).is_err() {
            return Ok(TriggerCheck::Disconnected);
        }
        Ok(TriggerCheck::Fired)
    }

    fn consume_marker(&mut self, modified: Option<SystemTime>) {
        match fs::remove_file(&self.path) {
            Ok(()) => self.last_modified = None,
            Err(e) => {
                // Remember it so the same marker does not fire again.
                log::warn!("Could not remove trigger file {}: {e}", self.path.display());
                self.last_modified = modified;
            }
        }
    }

    pub fn spawn(mut self, interval: Duration) -> std::io::Result<TaskHandle> {
        log::info!("File trigger started - create '{}' to publish a slide", self.path.display());
        task::spawn_polling("file-trigger", interval, move || match self.check(Instant::now()) {
            Ok(TriggerCheck::Disconnected) => ControlFlow::Break(()),
            Ok(_) => ControlFlow::Continue(()),
            Err(e) => {
                log::warn!("File trigger error: {e}");
                ControlFlow::Continue(())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn setup(cooldown_ms: u64) -> (TempDir, FileTrigger, mpsc::Receiver<OverlayEvent>) {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let cooldown = Duration::from_millis(cooldown_ms);
        let trigger = FileTrigger::new(dir.path().join("capture_now.txt"), cooldown, tx);
        (dir, trigger, rx)
    }

    #[test]
    fn idle_without_marker() {
        let (_dir, mut trigger, rx) = setup(2000);
        assert_eq!(trigger.check(Instant::now()).unwrap(), TriggerCheck::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn fires_once_per_marker_and_removes_it() {
        let (_dir, mut trigger, rx) = setup(0);
        let t0 = Instant::now();
        fs::write(trigger.path(), ".\n").unwrap();
        assert_eq!(trigger.check(t0).unwrap(), TriggerCheck::Fired);
        assert!(!trigger.path().exists());
        assert_eq!(rx.try_recv().unwrap(), OverlayEvent::Trigger { slide_url: Some(".".into()) });
        assert_eq!(trigger.check(t0).unwrap(), TriggerCheck::Idle);
    }

    #[test]
    fn marker_content_is_the_slide_url() {
        let (_dir, mut trigger, rx) = setup(0);
        fs::write(trigger.path(), "  https://example.org/s/4.jpg \n").unwrap();
        trigger.check(Instant::now()).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            OverlayEvent::Trigger { slide_url: Some("https://example.org/s/4.jpg".into()) }
        );

        fs::write(trigger.path(), "").unwrap();
        trigger.check(Instant::now()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), OverlayEvent::Trigger { slide_url: None });
    }

    #[test]
    fn cooldown_drops_repeats() {
        let (_dir, mut trigger, rx) = setup(2000);
        let t0 = Instant::now();
        fs::write(trigger.path(), "").unwrap();
        assert_eq!(trigger.check(t0).unwrap(), TriggerCheck::Fired);

        fs::write(trigger.path(), "").unwrap();
        let repeat = trigger.check(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(repeat, TriggerCheck::CoolingDown);
        assert!(!trigger.path().exists());

        fs::write(trigger.path(), "").unwrap();
        assert_eq!(trigger.check(t0 + Duration::from_millis(2500)).unwrap(), TriggerCheck::Fired);
        assert_eq!(rx.try_iter().count(), 2);
    }
}
