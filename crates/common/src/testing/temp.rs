//! Temporary directory helper
//!
//! A scratch directory under the system temp dir, removed with its contents
//! when dropped.

#![allow(clippy::missing_errors_doc)]

use std::path::{Path, PathBuf};
use std::{fs, io};

#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    /// Create `<tmp>/<prefix>-<uuid>`.
    pub fn new(prefix: &str) -> io::Result<Self> {
        let path = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a (not yet existing) file inside the directory.
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `contents` to a file in the directory and return its path.
    pub fn create_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let file_path = self.path.join(name);
        fs::write(&file_path, contents)?;
        Ok(file_path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let temp_dir = TempDir::new("minetally-test").unwrap();
        let path = temp_dir.path().to_path_buf();
        assert!(path.exists());

        drop(temp_dir);
        assert!(!path.exists());
    }

    #[test]
    fn create_file_writes_contents() {
        let temp_dir = TempDir::new("minetally-test").unwrap();
        let file_path = temp_dir.create_file("minetally.toml", "[solver]\n").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "[solver]\n");
        assert_eq!(temp_dir.join("minetally.toml"), file_path);
    }
}
