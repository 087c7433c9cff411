// Documents exchanged with the session store, and the events the render loop consumes.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Size and index of the monitor the current slide was taken from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorMeta {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub monitor_index: u32,
}

/// The shared session document: which slide is showing and where it came from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDoc {
    #[serde(default)]
    pub slide_index: u32,
    #[serde(default)]
    pub slides: Vec<String>,
    #[serde(default)]
    pub screenshot_meta: Option<MonitorMeta>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// One student tap on a slide.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TapResponse {
    pub x: f64, // fraction of slide width
    pub y: f64, // fraction of slide height
    pub timestamp: DateTime<Utc>,
}

impl TapResponse {
    pub fn new(x: f64, y: f64, timestamp: DateTime<Utc>) -> Self {
        Self { x, y, timestamp }
    }

    /// Read a response document. `timestamp` may be epoch seconds (a number)
    /// or an RFC 3339 string; a missing or unreadable field is an error.
    pub fn from_value(v: &Value) -> Result<Self> {
        let coord = |name: &str| {
            v.get(name)
                .and_then(Value::as_f64)
                .ok_or_else(|| Error::MalformedTap(format!("missing or non-numeric {name:?}")))
        };
        let x = coord("x")?;
        let y = coord("y")?;
        let timestamp = match v.get("timestamp") {
            Some(Value::Number(n)) => n.as_f64().and_then(epoch_secs_to_utc),
            Some(Value::String(s)) => {
                DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
            }
            _ => None,
        }
        .ok_or_else(|| Error::MalformedTap("missing or malformed \"timestamp\"".into()))?;

        Ok(Self { x, y, timestamp })
    }
}

fn epoch_secs_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// Everything the render loop reacts to. Produced on background threads and
/// handed over through a channel.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayEvent {
    /// The session document changed (any field).
    SessionChanged(SessionDoc),
    /// A new response arrived for `slide_index`.
    Tap { slide_index: u32, response: TapResponse },
    /// The presenter asked for a new slide; `slide_url` is what to publish.
    Trigger { slide_url: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numeric_and_string_timestamps() {
        let a = TapResponse::from_value(&json!({"x": 0.25, "y": 0.5, "timestamp": 1758275477.5}))
            .unwrap();
        assert_eq!(a.x, 0.25);
        assert_eq!(a.timestamp.timestamp(), 1758275477);
        assert_eq!(a.timestamp.timestamp_subsec_millis(), 500);

        let rfc3339 = json!({"x": 1, "y": 0, "timestamp": "2025-09-19T09:51:17Z"});
        let b = TapResponse::from_value(&rfc3339).unwrap();
        assert_eq!(b.timestamp.timestamp(), 1758275477);
        assert_eq!((b.x, b.y), (1.0, 0.0));
    }

    #[test]
    fn rejects_missing_or_bad_fields() {
        for bad in [
            json!({"x": 0.5, "y": 0.5}),
            json!({"x": 0.5, "y": 0.5, "timestamp": "yesterday"}),
            json!({"x": 0.5, "y": 0.5, "timestamp": null}),
            json!({"x": "0.5", "y": 0.5, "timestamp": 1}),
            json!({"y": 0.5, "timestamp": 1}),
        ] {
            assert!(
                matches!(TapResponse::from_value(&bad), Err(Error::MalformedTap(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn response_serializes_back_to_readable_document() {
        let r = TapResponse::new(0.1, 0.9, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(TapResponse::from_value(&v).unwrap(), r);
    }

    #[test]
    fn session_doc_uses_camel_case_and_defaults() {
        let doc: SessionDoc = serde_json::from_value(json!({
            "slideIndex": 2,
            "slides": ["a.jpg", "b.jpg", "c.jpg"],
            "screenshotMeta": {"width": 1920, "height": 1080, "monitorIndex": 1}
        }))
        .unwrap();
        assert_eq!(doc.slide_index, 2);
        assert_eq!(
            doc.screenshot_meta,
            Some(MonitorMeta { width: 1920, height: 1080, monitor_index: 1 })
        );
        assert_eq!(doc.last_updated, None);

        let empty: SessionDoc = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, SessionDoc::default());
    }
}
