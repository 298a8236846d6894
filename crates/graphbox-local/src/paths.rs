//! Path validation for environment-relative paths.
//!
//! Keeps every path a caller hands to the provider inside the environment
//! directory.

use std::path::{Component, Path, PathBuf};

use graphbox_core::ProviderError;

/// Join `relative` onto `root`, rejecting anything that could escape it.
///
/// Absolute paths, `..` components and empty paths are refused. The check
/// is purely lexical, so it works for paths that do not exist yet.
pub fn join_relative(root: &Path, relative: &str) -> Result<PathBuf, ProviderError> {
    if relative.trim().is_empty() {
        return Err(ProviderError::InvalidPath("empty path".to_string()));
    }

    let input = Path::new(relative);
    let mut joined = root.to_path_buf();
    for component in input.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ProviderError::InvalidPath(format!(
                    "{} escapes the environment",
                    relative
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ProviderError::InvalidPath(format!(
                    "{} is not relative",
                    relative
                )))
            }
        }
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_relative_accepts_nested_paths() {
        let root = Path::new("/tmp/env");
        assert_eq!(
            join_relative(root, "src/App.tsx").unwrap(),
            PathBuf::from("/tmp/env/src/App.tsx")
        );
        assert_eq!(
            join_relative(root, "./package.json").unwrap(),
            PathBuf::from("/tmp/env/package.json")
        );
    }

    #[test]
    fn test_join_relative_rejects_escapes() {
        let root = Path::new("/tmp/env");
        for bad in ["../outside", "src/../../x", "/etc/passwd", "", "   "] {
            assert!(
                matches!(join_relative(root, bad), Err(ProviderError::InvalidPath(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
