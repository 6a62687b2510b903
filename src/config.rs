use std::io;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_STORAGE_PATH: &str = "./uploads/images/";

/// Where uploaded files live. Built once at startup and handed to
/// [`LocalFileStore::init`](crate::file::LocalFileStore::init).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_STORAGE_PATH),
        }
    }
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Absolute, lexically normalized form of `base_path`. Relative paths are
    /// taken against the current working directory; symlinks are left alone.
    pub fn resolve(&self) -> io::Result<PathBuf> {
        let absolute = if self.base_path.is_absolute() {
            self.base_path.clone()
        } else {
            std::env::current_dir()?.join(&self.base_path)
        };
        Ok(normalize(&absolute))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // popping at the root is a no-op, so ".." never climbs above it
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
