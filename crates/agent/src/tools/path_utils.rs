//! Keeping log file names inside the log directory

use std::path::{Component, Path, PathBuf};

/// A file name that would resolve outside the log directory
#[derive(Debug, Clone)]
pub struct PathValidationError {
    pub filename: String,
    pub log_dir: String,
}

impl std::fmt::Display for PathValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' is outside the log directory {}",
            self.filename, self.log_dir
        )
    }
}

impl std::error::Error for PathValidationError {}

/// Resolve `filename` against `log_dir`, refusing anything that escapes it.
///
/// Absolute paths and `..` components are rejected outright. When the target
/// exists it is canonicalized as well, so a symlink pointing out of the
/// directory is caught too. A missing file inside the directory resolves
/// normally; reporting it is left to the caller.
pub async fn resolve_log_path(
    filename: &str,
    log_dir: &Path,
) -> Result<PathBuf, PathValidationError> {
    let reject = || PathValidationError {
        filename: filename.to_string(),
        log_dir: log_dir.display().to_string(),
    };

    let relative = Path::new(filename);
    let plain = !filename.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(reject());
    }

    let joined = log_dir.join(relative);
    if !joined.exists() {
        return Ok(joined);
    }

    let canonical_file = tokio::fs::canonicalize(&joined)
        .await
        .map_err(|_| reject())?;
    let canonical_dir = tokio::fs::canonicalize(log_dir)
        .await
        .unwrap_or_else(|_| log_dir.to_path_buf());

    if !is_path_within(&canonical_file, &canonical_dir) {
        return Err(reject());
    }

    Ok(canonical_file)
}

/// Component-wise prefix check
fn is_path_within(path: &Path, dir: &Path) -> bool {
    let path_components: Vec<_> = path.components().collect();
    let dir_components: Vec<_> = dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .enumerate()
        .all(|(i, comp)| path_components.get(i) == Some(comp))
}
