//! Classroom tap overlay: students tap a slide on their phones, the presenter's
//! screen shows each tap as a dot that fades out.

pub mod app;
pub mod config;
pub mod dots;
pub mod draw;
pub mod error;
pub mod mapping;
pub mod overlay;
pub mod session;
pub mod stale;
pub mod store;
pub mod surface;
pub mod task;
pub mod trigger;
pub mod types;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
