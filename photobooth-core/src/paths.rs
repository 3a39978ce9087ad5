//! Path Resolution - Containment Checks
//!
//! Every path the store touches is produced here and must lie strictly
//! inside the store root.

use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// Lexically normalize `candidate` against `root` and require the result
/// to be strictly inside `root`. Absolute candidates replace the root on
/// join and therefore fail the check.
pub fn resolve(root: &Path, candidate: &str) -> Result<PathBuf, StoreError> {
    let resolved = normalize(&root.join(candidate));
    let root = normalize(root);

    if resolved == root || !resolved.starts_with(&root) {
        return Err(StoreError::PathTraversalDetected(candidate.to_string()));
    }

    Ok(resolved)
}

/// Re-check containment after following symlinks. `root` must already be
/// canonical; `path` must exist.
pub fn ensure_contained(root: &Path, path: &Path) -> Result<PathBuf, StoreError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| StoreError::io(path, e))?;

    if canonical == root || !canonical.starts_with(root) {
        return Err(StoreError::PathTraversalDetected(
            path.display().to_string(),
        ));
    }

    Ok(canonical)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
