use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, FrameError, SerializerError, StatusCode, StorageError};

/// Ошибка фасада NVRAM: объединяет все нижележащие слои.
#[derive(Debug, Error)]
pub enum NvramError {
    #[error(transparent)]
    Serializer(#[from] SerializerError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ErrorExt for NvramError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Serializer(e) => e.status_code(),
            Self::Frame(e) => e.status_code(),
            Self::Storage(e) => e.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
