use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage directory {} {reason}: {source}", path.display())]
    Initialization {
        path: PathBuf,
        reason: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Validation(String),

    #[error("failed to store file {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
