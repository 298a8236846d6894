//! Project file set: the ordered directory/file operations for one project.
//!
//! Paths are relative and `/`-separated. Directory creation is an explicit
//! operation; a file's parent directory either has no entry in the set or is
//! created before the file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A single operation against the environment filesystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FileOp {
    /// Create a directory.
    CreateDir { path: String },

    /// Write a file with the given contents.
    WriteFile { path: String, contents: String },
}

impl FileOp {
    /// Relative path targeted by this operation.
    pub fn path(&self) -> &str {
        match self {
            FileOp::CreateDir { path } => path,
            FileOp::WriteFile { path, .. } => path,
        }
    }
}

/// A file whose parent directory is created only after the file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderViolation {
    /// The file written too early.
    pub file: String,
    /// The directory created too late.
    pub directory: String,
}

/// Ordered sequence of filesystem operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectFileSet {
    ops: Vec<FileOp>,
}

impl ProjectFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory creation.
    pub fn create_dir(&mut self, path: impl Into<String>) -> &mut Self {
        self.ops.push(FileOp::CreateDir { path: path.into() });
        self
    }

    /// Append a file write.
    pub fn write_file(&mut self, path: impl Into<String>, contents: impl Into<String>) -> &mut Self {
        self.ops.push(FileOp::WriteFile {
            path: path.into(),
            contents: contents.into(),
        });
        self
    }

    /// All operations in order.
    pub fn ops(&self) -> &[FileOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Contents of the file written at `path`, if any.
    pub fn file(&self, path: &str) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
            FileOp::WriteFile { path: p, contents } if p == path => Some(contents.as_str()),
            _ => None,
        })
    }

    /// Position of the operation targeting `path`.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.ops.iter().position(|op| op.path() == path)
    }

    /// Check that no file is written before its parent directory is created.
    ///
    /// Returns the first violation in operation order.
    pub fn check_order(&self) -> Result<(), OrderViolation> {
        let dir_positions: HashMap<&str, usize> = self
            .ops
            .iter()
            .enumerate()
            .filter_map(|(i, op)| match op {
                FileOp::CreateDir { path } => Some((path.as_str(), i)),
                FileOp::WriteFile { .. } => None,
            })
            .collect();

        for (i, op) in self.ops.iter().enumerate() {
            for dir in ancestors(op.path()) {
                if let Some(&dir_pos) = dir_positions.get(dir) {
                    if dir_pos > i {
                        return Err(OrderViolation {
                            file: op.path().to_string(),
                            directory: dir.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// SHA-256 over the ordered operations (hex). Identical sets yield identical digests.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for op in &self.ops {
            match op {
                FileOp::CreateDir { path } => {
                    hasher.update(b"dir\0");
                    hasher.update(path.as_bytes());
                    hasher.update(b"\0");
                }
                FileOp::WriteFile { path, contents } => {
                    hasher.update(b"file\0");
                    hasher.update(path.as_bytes());
                    hasher.update(b"\0");
                    hasher.update((contents.len() as u64).to_le_bytes());
                    hasher.update(contents.as_bytes());
                }
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Proper ancestors of a relative path, nearest first: `a/b/c` -> `a/b`, `a`.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_end_matches('/');
    trimmed
        .char_indices()
        .rev()
        .filter(|&(_, c)| c == '/')
        .map(move |(i, _)| &trimmed[..i])
        .filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_nearest_first() {
        let got: Vec<&str> = ancestors("src/components/Chart.tsx").collect();
        assert_eq!(got, vec!["src/components", "src"]);
        assert_eq!(ancestors("package.json").count(), 0);
    }

    #[test]
    fn test_check_order_accepts_dir_before_file() {
        let mut set = ProjectFileSet::new();
        set.write_file("package.json", "{}")
            .create_dir("src")
            .write_file("src/App.tsx", "x");
        assert!(set.check_order().is_ok());
    }

    #[test]
    fn test_check_order_accepts_file_without_dir_entry() {
        let mut set = ProjectFileSet::new();
        set.write_file("public/robots.txt", "");
        assert!(set.check_order().is_ok());
    }

    #[test]
    fn test_check_order_rejects_dir_after_file() {
        let mut set = ProjectFileSet::new();
        set.write_file("src/main.tsx", "x").create_dir("src");
        let violation = set.check_order().unwrap_err();
        assert_eq!(violation.file, "src/main.tsx");
        assert_eq!(violation.directory, "src");
    }

    #[test]
    fn test_file_lookup_and_position() {
        let mut set = ProjectFileSet::new();
        set.create_dir("src").write_file("src/App.tsx", "app");
        assert_eq!(set.file("src/App.tsx"), Some("app"));
        assert_eq!(set.file("src"), None);
        assert_eq!(set.position("src"), Some(0));
        assert_eq!(set.position("src/App.tsx"), Some(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_digest_deterministic_and_order_sensitive() {
        let mut a = ProjectFileSet::new();
        a.create_dir("src").write_file("src/a", "1");
        let mut b = ProjectFileSet::new();
        b.create_dir("src").write_file("src/a", "1");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);

        let mut c = ProjectFileSet::new();
        c.write_file("src/a", "1").create_dir("src");
        assert_ne!(a.digest(), c.digest());
    }
}
