use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::error::{StorageError, StorageResult};
use super::naming::{generate_name, is_plain_file_name};
use crate::config::StoreConfig;

const WRITE_PROBE_NAME: &str = "test-write.tmp";

/// Flat directory of uploaded files, each named `<hex-id><ext>`.
///
/// The directory listing is the only index. Nothing here coordinates
/// concurrent callers beyond what the filesystem itself guarantees.
#[derive(Debug)]
pub struct LocalFileStore {
    root: PathBuf,
}

/// Handle to a regular file inside the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    name: String,
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub writable: bool,
    pub file_count: usize,
}

impl LocalFileStore {
    /// Resolves the configured path, creates it if needed and checks that a
    /// file can be written there.
    pub fn init(config: &StoreConfig) -> StorageResult<Self> {
        let root = config
            .resolve()
            .map_err(|source| StorageError::Initialization {
                path: config.base_path.clone(),
                reason: "could not be resolved",
                source,
            })?;

        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|source| StorageError::Initialization {
                path: root.clone(),
                reason: "could not be created",
                source,
            })?;
            info!("Storage directory created: {}", root.display());
        }

        let probe = root.join(WRITE_PROBE_NAME);
        File::create(&probe)
            .and_then(|_| fs::remove_file(&probe))
            .map_err(|source| StorageError::Initialization {
                path: root.clone(),
                reason: "is not writable",
                source,
            })?;
        debug!("Storage directory is writable");

        info!(
            configured = %config.base_path.display(),
            resolved = %root.display(),
            "File store initialized"
        );

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every entry in the storage directory, in no particular order.
    pub fn list(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to list {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| match entry.file_name().into_string() {
                Ok(name) => Some(name),
                Err(raw) => {
                    warn!("Skipping non UTF-8 entry {:?}", raw);
                    None
                }
            })
            .collect()
    }

    /// Persists `data` under a freshly generated name and returns that name.
    pub fn store(&self, data: &[u8], original_name: Option<&str>) -> StorageResult<String> {
        if data.is_empty() {
            return Err(StorageError::Validation(
                "File cannot be empty".to_string(),
            ));
        }

        self.write_new(original_name, |file| file.write_all(data))
    }

    /// Same as [`store`](Self::store) but copies the content from `reader`.
    pub fn store_from_reader<R: Read>(
        &self,
        mut reader: R,
        original_name: Option<&str>,
    ) -> StorageResult<String> {
        let mut empty = false;
        let result = self.write_new(original_name, |file| {
            if io::copy(&mut reader, file)? == 0 {
                empty = true;
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty upload"));
            }
            Ok(())
        });

        match result {
            Err(StorageError::Write { .. }) if empty => Err(StorageError::Validation(
                "File cannot be empty".to_string(),
            )),
            other => other,
        }
    }

    /// Writes through a hidden sibling and renames it into place, so the
    /// generated name only ever holds complete content.
    fn write_new<F>(&self, original_name: Option<&str>, write: F) -> StorageResult<String>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let name = generate_name(original_name);
        if !is_plain_file_name(&name) {
            return Err(StorageError::Validation(format!(
                "Invalid file name extension in {:?}",
                original_name.unwrap_or_default()
            )));
        }

        let path = self.root.join(&name);
        // fixed length, so any name that fits on disk also fits its partial
        let partial = self
            .root
            .join(format!(".{}.partial", uuid::Uuid::new_v4().simple()));
        debug!("Storing file {} at {}", name, path.display());

        let result = File::create(&partial)
            .and_then(|mut file| {
                write(&mut file)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&partial, &path));

        match result {
            Ok(()) => {
                info!("File stored: {}", name);
                Ok(name)
            }
            Err(source) => {
                if let Err(e) = fs::remove_file(&partial) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!("Failed to clean up {}: {}", partial.display(), e);
                    }
                }
                error!("Failed to store file {}: {}", name, source);
                Err(StorageError::Write { name, source })
            }
        }
    }

    /// Looks up a stored file. Blank, unsafe or unknown names yield `None`.
    pub fn load(&self, name: &str) -> Option<StoredFile> {
        let path = self.checked_path(name)?;

        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            _ => {
                debug!("File not found: {}", name);
                return None;
            }
        }

        // A symlink may still point outside the directory.
        let inside = match (path.canonicalize(), self.root.canonicalize()) {
            (Ok(file), Ok(root)) => file.starts_with(root),
            _ => false,
        };
        if !inside {
            warn!("Refusing to load {}: resolves outside the store", name);
            return None;
        }

        Some(StoredFile {
            name: name.to_string(),
            path,
        })
    }

    /// Best-effort removal. Failures are logged and never reach the caller.
    pub fn delete(&self, name: &str) {
        let Some(path) = self.checked_path(name) else {
            return;
        };

        if !fs::symlink_metadata(&path).is_ok_and(|meta| meta.is_file()) {
            return;
        }

        match fs::remove_file(&path) {
            Ok(()) => info!("File deleted: {}", name),
            Err(e) => error!("Failed to delete file {}: {}", name, e),
        }
    }

    pub fn storage_info(&self) -> StorageInfo {
        let exists = self.root.is_dir();
        StorageInfo {
            path: self.root.clone(),
            exists,
            writable: exists && can_write(&self.root),
            file_count: self.list().len(),
        }
    }

    fn checked_path(&self, name: &str) -> Option<PathBuf> {
        if name.trim().is_empty() {
            return None;
        }
        if !is_plain_file_name(name) {
            warn!("Rejected file name outside the store: {:?}", name);
            return None;
        }
        Some(self.root.join(name))
    }
}

/// Asks the OS whether this process may write to `path`.
#[cfg(unix)]
fn can_write(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::WRITE_OK).is_ok()
}

#[cfg(not(unix))]
fn can_write(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| !meta.permissions().readonly())
}

impl StoredFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

impl fmt::Display for StorageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Storage Path: {}", self.path.display())?;
        writeln!(f, "Exists: {}", self.exists)?;
        writeln!(f, "Writable: {}", self.writable)?;
        write!(f, "File Count: {}", self.file_count)
    }
}
