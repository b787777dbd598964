use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use compio::fs;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::PathExt;
use crate::storage::{AtomicWriteError, write_atomically};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    #[display("light")]
    Light,
    #[display("dark")]
    Dark,
}

/// The preference file; older files name the key `theme` instead of `mode`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ThemeFile {
    #[serde(alias = "theme", default)]
    mode: Option<Theme>,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Reads the preference at `path`; a missing file or missing key means light.
    pub async fn load(path: &Path) -> Result<Self, ThemeError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("No theme preference found, using the default");
                return Ok(Theme::default());
            }
            Err(source) => {
                return Err(ThemeError::ReadError {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let file: ThemeFile = serde_json::from_slice(&bytes).context(ParseSnafu {
            path: path.to_path_buf(),
        })?;
        Ok(file.mode.unwrap_or_default())
    }

    pub async fn save(self, path: &Path) -> Result<(), ThemeError> {
        let file = ThemeFile { mode: Some(self) };
        let bytes = serde_json::to_vec_pretty(&file).context(EncodeSnafu)?;
        write_atomically(path, bytes).await.context(WriteSnafu {
            path: path.to_path_buf(),
        })?;
        debug!("Saved theme preference '{}'", self);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ThemeError {
    #[snafu(display("Failed to read the theme file: {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("The theme file {} is not valid", path.best_effort_path_display()))]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("Failed to encode the theme preference"))]
    EncodeError { source: serde_json::Error },
    #[snafu(display("Failed to write the theme file: {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: AtomicWriteError,
    },
}
