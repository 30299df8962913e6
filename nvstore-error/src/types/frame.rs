use std::{any::Any, io};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки слоя выравнивания/фрейминга.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    #[error("Pad threshold must be greater than zero")]
    InvalidPadThreshold,

    /// Байт-флаг сжатия не равен 0 или 1.
    #[error("Invalid compression flag {flag}")]
    InvalidFlag { flag: u8 },

    /// Неизвестная схема записи в хранилище.
    #[error("Invalid framing scheme {scheme}")]
    InvalidScheme { scheme: u8 },

    #[error("Frame is truncated")]
    Truncated,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ErrorExt for FrameError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPadThreshold => StatusCode::InvalidArgs,
            Self::InvalidFlag { .. } | Self::InvalidScheme { .. } => StatusCode::InvalidFrame,
            Self::Truncated => StatusCode::UnexpectedEof,
            Self::Io(_) => StatusCode::CompressionFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
