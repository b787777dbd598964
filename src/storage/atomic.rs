use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use compio::BufResult;
use compio::fs::{self, OpenOptions};
use compio::io::AsyncWriteAtExt;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::ext::PathExt;

/// Counts writes in this process so each one stages through its own file.
static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

fn staging_tag() -> String {
    let write = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", std::process::id(), write)
}

/// Replaces `path` with `bytes` so readers only ever see the old or the new file.
///
/// The bytes go to a hidden sibling first, are synced, and the sibling is then
/// renamed over the target. Every call uses a sibling of its own, so
/// overlapping writes to one target each land whole and the last rename wins.
pub async fn write_atomically(path: &Path, bytes: Vec<u8>) -> Result<(), AtomicWriteError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.context(CreateDirSnafu {
            path: parent.to_path_buf(),
        })?;
    }

    let temp_path = path.temp_sibling(&staging_tag());
    if let Err(error) = write_synced(&temp_path, bytes).await {
        discard(&temp_path).await;
        return Err(error);
    }

    if let Err(source) = fs::rename(&temp_path, path).await {
        discard(&temp_path).await;
        return Err(AtomicWriteError::ReplaceError {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!("Replaced {}", path.best_effort_path_display());
    Ok(())
}

async fn write_synced(temp_path: &Path, bytes: Vec<u8>) -> Result<(), AtomicWriteError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .await
        .context(StageSnafu {
            path: temp_path.to_path_buf(),
        })?;

    let BufResult(result, _) = file.write_all_at(bytes, 0).await;
    result.context(StageSnafu {
        path: temp_path.to_path_buf(),
    })?;

    file.sync_all().await.context(StageSnafu {
        path: temp_path.to_path_buf(),
    })
}

async fn discard(temp_path: &Path) {
    if let Err(error) = fs::remove_file(temp_path).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "Failed to remove staging file {}: {}",
                temp_path.best_effort_path_display(),
                error
            );
        }
    }
}

#[derive(Debug, Snafu)]
pub enum AtomicWriteError {
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write staging file {}", path.best_effort_path_display()))]
    StageError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to move new contents into {}", path.best_effort_path_display()))]
    ReplaceError {
        path: PathBuf,
        source: std::io::Error,
    },
}
