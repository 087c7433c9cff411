// One error type for the whole library.
// Every variant states *where* things went wrong.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String), // A config value failed validation

    #[error("Invalid color {0:?}: expected #RRGGBB or #RRGGBBAA")]
    Color(String), // Hex color string could not be parsed

    #[error("Malformed tap: {0}")]
    MalformedTap(String), // Tap response had bad coordinates or timestamp

    #[error("Store I/O error at {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    }, // Reading/writing the local session store failed

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    }, // A document did not deserialize

    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the overlay window failed

    #[error("Window update error: {0}")]
    WindowUpdate(String), // Pushing the frame buffer to the window failed

    #[error("Image export error: {0}")]
    ImageExport(String), // Writing a PNG snapshot failed
}

impl Error {
    pub(crate) fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Store { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
