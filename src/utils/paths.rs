use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Converts `path` (under `base`) into the canonical inventory key.
///
/// Keys are relative, `/`-separated and contain only normal components. Returns `None` when
/// `path` is not under `base`, is `base` itself, or has a component that is not valid UTF-8.
#[must_use]
pub fn relative_key(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Normalizes a user-supplied relative scope such as `./docs/` into `docs`.
///
/// # Errors
///
/// Returns an error if the scope escapes its base (`..`), is absolute, or is not UTF-8.
pub fn normalize_scope(scope: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in scope.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .with_context(|| format!("Scope is not valid UTF-8: {}", scope.display()))?,
            ),
            Component::CurDir => {}
            _ => anyhow::bail!("Scope must stay inside the base path: {}", scope.display()),
        }
    }
    Ok(parts.join("/"))
}

/// Ensures parent directories exist for a given path
///
/// # Errors
///
/// Returns an error if the parent directories cannot be created
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create parent directories for {}", path.display())
        })?;
    }
    Ok(())
}

/// Makes a path absolute, resolving relative paths from current directory
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined
pub fn make_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir()?;
        Ok(current_dir.join(path))
    }
}
