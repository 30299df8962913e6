use std::{any::Any, io};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки бинарного сериализатора объектов.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializerError {
    /// Ни одна встроенная форма и ни один кодек не подходят для типа.
    #[error("Unsupported type: {type_name}")]
    UnsupportedType { type_name: String },

    /// У объекта нет ровно одного конструктора, совпадающего со свойствами.
    #[error(
        "Schema mismatch for {type_name}: {matched} constructors match properties [{}]; candidates: [{}]",
        .properties.join(", "),
        .candidates.join("; ")
    )]
    SchemaMismatch {
        type_name: String,
        matched: usize,
        properties: Vec<String>,
        candidates: Vec<String>,
    },

    /// Индекс из потока отсутствует в таблице типов.
    #[error("Unknown type index {index} (type table holds {table_len} entries)")]
    UnknownTypeIndex { index: u32, table_len: usize },

    /// Значение записано кодеком, который не зарегистрирован при чтении.
    #[error("No custom codec registered for {type_name}")]
    MissingCustomDeserializer { type_name: String },

    /// Значение объекта не содержит свойства, требуемого конструктором.
    #[error("Object {type_name} has no value for property '{property}'")]
    MissingProperty { type_name: String, property: String },

    /// Значение объекта содержит свойство, которого нет в зарегистрированной форме.
    #[error("Object {type_name} has no declared property '{property}'")]
    UnknownProperty { type_name: String, property: String },

    /// Строка в потоке не является корректным UTF-8.
    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Неизвестный байт тега.
    #[error("Invalid type tag 0x{tag:02X}")]
    InvalidTag { tag: u8 },

    /// Данные не соответствуют формату.
    #[error("Invalid data: {reason}")]
    InvalidData { reason: String },

    /// Декодированное значение не совпадает с ожидаемым Rust-типом.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Превышена глубина вложенности.
    #[error("Maximum nesting depth {limit} exceeded")]
    DepthLimit { limit: usize },

    /// Varint длиннее 5 байт.
    #[error("Varint too long, possible corruption")]
    VarintOverflow,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SerializerError {
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }

    pub fn type_mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl ErrorExt for SerializerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedType { .. } => StatusCode::Unsupported,
            Self::SchemaMismatch { .. }
            | Self::MissingProperty { .. }
            | Self::UnknownProperty { .. } => StatusCode::SchemaMismatch,
            Self::UnknownTypeIndex { .. } => StatusCode::UnknownTypeIndex,
            Self::MissingCustomDeserializer { .. } => StatusCode::MissingCodec,
            Self::InvalidTag { .. } | Self::VarintOverflow => StatusCode::CorruptedData,
            Self::InvalidData { .. } => StatusCode::InvalidData,
            Self::InvalidUtf8(_) => StatusCode::InvalidUtf8,
            Self::TypeMismatch { .. } => StatusCode::TypeError,
            Self::DepthLimit { .. } => StatusCode::DepthLimit,
            Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => StatusCode::UnexpectedEof,
            Self::Io(_) => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
