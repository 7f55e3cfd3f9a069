use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::ShotInfo;

/// File marking a directory as a mapshot
pub const MARKER_FILE: &str = "mapshot.json";

/// Walk `base_dir` and return every directory containing a marker file.
///
/// The root is resolved through symlinks first. Any traversal error aborts the
/// whole scan: a partial list would make shots vanish from the listing.
pub fn find_shots(base_dir: &Path) -> Result<Vec<ShotInfo>, DiscoveryError> {
    let root = std::fs::canonicalize(base_dir).map_err(|source| DiscoveryError::Resolve {
        path: base_dir.to_path_buf(),
        source,
    })?;
    debug!("Looking for shots in {}", root.display());

    let mut shots = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != MARKER_FILE {
            continue;
        }
        debug!("Found {}", entry.path().display());

        let Some(shot_dir) = entry.path().parent() else {
            continue;
        };
        match shot_name(&root, shot_dir) {
            Some(name) => shots.push(ShotInfo::new(name, shot_dir.to_path_buf())),
            None => warn!(
                "Unable to get relative path of {}, skipping",
                shot_dir.display()
            ),
        }
    }

    Ok(shots)
}

/// Relative `/`-separated name of `dir` under `root`, `.` for the root itself.
fn shot_name(root: &Path, dir: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Unable to resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Scan task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}
