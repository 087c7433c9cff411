// Watches the session store and turns changes into overlay events.
//
// Mirrors snapshot-listener behaviour: the first look at a slide's responses
// delivers everything already stored, later polls deliver only new lines. When
// the session moves to another slide the response subscription moves with it.

use std::ops::ControlFlow;
use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::error::Result;
use crate::session::{OverlayEvent, SessionDoc};
use crate::store::{self, LocalStore};
use crate::task::{self, TaskHandle};

/// Result of one poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollStatus {
    /// Number of events sent.
    Sent(usize),
    /// The render loop hung up; stop watching.
    Disconnected,
}

pub struct StoreWatcher {
    store: LocalStore,
    tx: Sender<OverlayEvent>,
    last_session: Option<SessionDoc>,
    watched_slide: Option<u32>,
    lines_seen: usize,
}

impl StoreWatcher {
    pub fn new(store: LocalStore, tx: Sender<OverlayEvent>) -> Self {
        Self { store, tx, last_session: None, watched_slide: None, lines_seen: 0 }
    }

    pub fn watched_slide(&self) -> Option<u32> {
        self.watched_slide
    }

    /// Look at the store once and forward whatever changed.
    pub fn poll_once(&mut self) -> Result<PollStatus> {
        let mut sent = 0;

        if let Some(doc) = self.store.read_session()? {
            if self.last_session.as_ref() != Some(&doc) {
                let slide = doc.slide_index;
                self.last_session = Some(doc.clone());
                if self.tx.send(OverlayEvent::SessionChanged(doc)).is_err() {
                    return Ok(PollStatus::Disconnected);
                }
                sent += 1;

                if self.watched_slide != Some(slide) {
                    self.watched_slide = Some(slide);
                    self.lines_seen = 0;
                    log::info!("Started watching responses for slide {slide}");
                }
            }
        }

        let Some(slide) = self.watched_slide else {
            return Ok(PollStatus::Sent(sent));
        };
        let lines = self.store.read_response_lines(slide, self.lines_seen)?;
        self.lines_seen += lines.len();
        for line in &lines {
            let Some(response) = store::parse_response_line(line) else { continue };
            if self.tx.send(OverlayEvent::Tap { slide_index: slide, response }).is_err() {
                return Ok(PollStatus::Disconnected);
            }
            sent += 1;
        }

        Ok(PollStatus::Sent(sent))
    }

    /// Poll on a background thread every `interval` until stopped or disconnected.
    pub fn spawn(mut self, interval: Duration) -> std::io::Result<TaskHandle> {
        task::spawn_polling("store-watcher", interval, move || match self.poll_once() {
            Ok(PollStatus::Disconnected) => ControlFlow::Break(()),
            Ok(PollStatus::Sent(_)) => ControlFlow::Continue(()),
            Err(e) => {
                log::warn!("Session watcher error: {e}");
                ControlFlow::Continue(())
            }
        })
    }
}
