use std::{any::Any, io, path::Path};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки коллаборатора хранилища.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid storage path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StorageError {
    pub fn io(
        path: impl AsRef<Path>,
        source: io::Error,
    ) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl ErrorExt for StorageError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Io { .. } => StatusCode::Io,
            Self::InvalidPath { .. } => StatusCode::InvalidKey,
            Self::Unavailable { .. } => StatusCode::StorageUnavailable,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
