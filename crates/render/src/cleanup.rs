use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::RenderError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub kept: usize,
}

/// Deletes `path` after `delay` if it is still there. The handle resolves to
/// whether a file was removed; dropping it does not cancel the removal.
pub fn schedule_removal(path: PathBuf, delay: Duration) -> JoinHandle<bool> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(event_name = "render.cleanup.removed", path = %path.display(), "generated file removed");
                true
            }
            Err(error) if error.kind() == ErrorKind::NotFound => false,
            Err(error) => {
                warn!(
                    event_name = "render.cleanup.failed",
                    path = %path.display(),
                    error = %error,
                    "scheduled removal failed"
                );
                false
            }
        }
    })
}

/// Removes regular files in `dir` last modified at least `retention` ago.
/// A missing directory is treated as empty.
pub async fn sweep_expired(dir: &Path, retention: Duration) -> Result<SweepReport, RenderError> {
    let mut report = SweepReport::default();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(report),
        Err(error) => return Err(error.into()),
    };

    let now = SystemTime::now();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < retention {
            report.kept += 1;
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => report.removed.push(path),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }
    }

    info!(
        event_name = "render.cleanup.swept",
        dir = %dir.display(),
        removed = report.removed.len(),
        kept = report.kept,
        "output directory swept"
    );
    Ok(report)
}
