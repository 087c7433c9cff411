// Background polling threads with a stop handle.

use std::ops::ControlFlow;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Owns a polling thread. Stopping (or dropping) the handle wakes the thread
/// and waits for it to finish its current poll.
pub struct TaskHandle {
    name: String,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                log::error!("{} thread panicked", self.name);
            } else {
                log::debug!("{} stopped", self.name);
            }
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `poll` every `interval` on a named thread until it returns
/// `ControlFlow::Break` or the handle is stopped.
pub fn spawn_polling<F>(name: &str, interval: Duration, mut poll: F) -> std::io::Result<TaskHandle>
where
    F: FnMut() -> ControlFlow<()> + Send + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let thread_name = name.to_string();
    let thread = thread::Builder::new().name(thread_name.clone()).spawn(move || {
        loop {
            if poll().is_break() {
                log::debug!("{thread_name} finished");
                return;
            }
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    })?;

    Ok(TaskHandle { name: name.to_string(), stop: Some(stop_tx), thread: Some(thread) })
}
