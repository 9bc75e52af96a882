use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XorshareError {
    #[error("{0}")]
    Config(String),

    #[error("Failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan input directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Unsupported filesystem entry (not a file or directory): {}", .0.display())]
    UnsupportedEntry(PathBuf),

    #[error("Path is a file in one input and a directory in another: {}", .0.display())]
    EntryConflict(PathBuf),

    #[error("Input stream ended early: expected {expected} bytes, got {available}")]
    StreamShortfall { expected: u64, available: u64 },

    #[error("Random source failure: {0}")]
    RandomSource(#[from] rand::Error),

    #[error("Failed to xor file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<XorshareError>,
    },

    #[error("{failed} of {total} files failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl XorshareError {
    /// Attach the operation and path to an I/O failure.
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap a per-file failure with the relative path being transformed.
    pub fn in_file(self, path: impl AsRef<Path>) -> Self {
        Self::File {
            path: path.as_ref().to_path_buf(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, XorshareError>;
