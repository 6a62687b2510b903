mod error;
mod naming;
mod storage;

pub use error::StorageError;
pub use storage::{LocalFileStore, StorageInfo};
