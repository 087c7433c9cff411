// Directory-backed session store.
//
// Layout under the root:
//   session.json                       the session document
//   slides/<index>/responses.jsonl     one tap response per line
//
// Writers append whole lines; readers only consume lines that end in '\n', so a
// response being written while the watcher polls is picked up on the next poll.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::session::{MonitorMeta, SessionDoc, TapResponse};

/// Appends a slide to the session and makes it current.
pub trait SlidePublisher {
    /// Returns the index of the published slide.
    fn publish(&mut self, slide_url: &str, meta: Option<MonitorMeta>) -> Result<u32>;
}

#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::store(&root, e))?;
        Ok(Self { root })
    }

    pub fn session_path(&self) -> PathBuf {
        self.root.join("session.json")
    }

    pub fn responses_path(&self, slide_index: u32) -> PathBuf {
        self.root.join("slides").join(slide_index.to_string()).join("responses.jsonl")
    }

    /// The session document, or None if nobody has published a slide yet.
    pub fn read_session(&self) -> Result<Option<SessionDoc>> {
        let path = self.session_path();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::store(path, e)),
        };
        serde_json::from_str(&content).map(Some).map_err(|e| Error::json(path, e))
    }

    /// Replace the session document (write to a sibling file, then rename).
    pub fn write_session(&self, doc: &SessionDoc) -> Result<()> {
        let path = self.session_path();
        let tmp = self.root.join("session.json.tmp");
        let json = serde_json::to_string_pretty(doc).map_err(|e| Error::json(&path, e))?;
        fs::write(&tmp, json).map_err(|e| Error::store(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::store(&path, e))
    }

    pub fn append_response(&self, slide_index: u32, response: &TapResponse) -> Result<()> {
        let path = self.responses_path(slide_index);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::store(dir, e))?;
        }
        let mut line = serde_json::to_string(response).map_err(|e| Error::json(&path, e))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::store(&path, e))?;
        file.write_all(line.as_bytes()).map_err(|e| Error::store(&path, e))
    }

    /// Complete response lines for a slide, skipping the first `skip`.
    pub fn read_response_lines(&self, slide_index: u32, skip: usize) -> Result<Vec<String>> {
        let path = self.responses_path(slide_index);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::store(path, e)),
        };
        // The piece after the last '\n' is either empty or still being written.
        let mut lines: Vec<&str> = content.split('\n').collect();
        lines.pop();
        Ok(lines.into_iter().skip(skip).map(str::to_string).collect())
    }

    /// Every readable response for a slide; malformed lines are logged and dropped.
    pub fn read_responses(&self, slide_index: u32) -> Result<Vec<TapResponse>> {
        let lines = self.read_response_lines(slide_index, 0)?;
        Ok(lines.iter().filter_map(|l| parse_response_line(l)).collect())
    }
}

/// Parse one response line. Blank lines are ignored quietly; anything else
/// unreadable is logged and skipped.
pub fn parse_response_line(line: &str) -> Option<TapResponse> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Skipping unreadable response {line:?}: {e}");
            return None;
        }
    };
    match TapResponse::from_value(&value) {
        Ok(r) => Some(r),
        Err(e) => {
            log::warn!("Skipping response {line:?}: {e}");
            None
        }
    }
}

impl SlidePublisher for LocalStore {
    fn publish(&mut self, slide_url: &str, meta: Option<MonitorMeta>) -> Result<u32> {
        let mut doc = self.read_session()?.unwrap_or_default();

        // Publishing the same URL twice re-selects it instead of duplicating it.
        let position = match doc.slides.iter().position(|s| s == slide_url) {
            Some(i) => i,
            None => {
                doc.slides.push(slide_url.to_string());
                doc.slides.len() - 1
            }
        };
        let index = position as u32;

        doc.slide_index = index;
        if meta.is_some() {
            doc.screenshot_meta = meta;
        }
        doc.last_updated = Some(Utc::now());
        self.write_session(&doc)?;

        log::info!("Session updated: slide {} ({slide_url})", u64::from(index) + 1);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("session")).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_store_has_no_session_or_responses() {
        let (_dir, store) = store();
        assert_eq!(store.read_session().unwrap(), None);
        assert!(store.read_response_lines(0, 0).unwrap().is_empty());
    }

    #[test]
    fn publish_appends_and_advances() {
        let (_dir, mut store) = store();
        let meta = MonitorMeta { width: 1920, height: 1080, monitor_index: 0 };
        assert_eq!(store.publish("a.jpg", Some(meta)).unwrap(), 0);
        assert_eq!(store.publish("b.jpg", None).unwrap(), 1);

        let doc = store.read_session().unwrap().unwrap();
        assert_eq!(doc.slides, vec!["a.jpg", "b.jpg"]);
        assert_eq!(doc.slide_index, 1);
        assert_eq!(doc.screenshot_meta, Some(meta));
        assert!(doc.last_updated.is_some());

        // Re-publishing an existing slide selects it again.
        assert_eq!(store.publish("a.jpg", None).unwrap(), 0);
        assert_eq!(store.read_session().unwrap().unwrap().slides.len(), 2);
    }

    #[test]
    fn responses_append_and_skip() {
        let (_dir, store) = store();
        let ts = Utc.timestamp_opt(1_758_275_477, 0).unwrap();
        for i in 0..3 {
            store.append_response(2, &TapResponse::new(0.1 * i as f64, 0.5, ts)).unwrap();
        }
        assert_eq!(store.read_response_lines(2, 0).unwrap().len(), 3);
        assert_eq!(store.read_response_lines(2, 2).unwrap().len(), 1);
        assert_eq!(store.read_responses(2).unwrap()[1].x, 0.1);
        assert!(store.read_response_lines(3, 0).unwrap().is_empty());
    }

    #[test]
    fn partial_and_malformed_lines() {
        let (_dir, store) = store();
        let path = store.responses_path(0);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            concat!(
                "{\"x\":0.5,\"y\":0.5,\"timestamp\":1}\n",
                "not json\n",
                "{\"x\":0.5}\n",
                "\n",
                "{\"x\":0.2,\"y\":0.2,\"timestamp\":2}\n",
                "{\"x\":0.9,",
            ),
        )
        .unwrap();

        // Unterminated tail is not returned yet.
        assert_eq!(store.read_response_lines(0, 0).unwrap().len(), 5);
        let good = store.read_responses(0).unwrap();
        assert_eq!(good.len(), 2);
        assert_eq!(good[1].x, 0.2);
    }
}
