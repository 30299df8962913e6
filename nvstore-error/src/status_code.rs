use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных
/// - 5xxx: Хранилище
/// - 6xxx: IO
/// - 8xxx: Ошибки кодирования / формата
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 1xxx: Общие ошибки ===
    Unsupported = 1001,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Ошибки данных ===
    TypeError = 2002,
    InvalidKey = 2003,
    InvalidData = 2009,
    SchemaMismatch = 2010,

    // === 5xxx: Хранилище ===
    StorageUnavailable = 5000,
    CorruptedData = 5002,
    CompressionFailed = 5005,

    // === 6xxx: IO ===
    Io = 6000,
    UnexpectedEof = 6007,

    // === 8xxx: Формат ===
    InvalidFrame = 8000,
    InvalidUtf8 = 8004,
    DepthLimit = 8008,
    UnknownTypeIndex = 8012,
    MissingCodec = 8013,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Имеет ли смысл повторять операцию.
    ///
    /// `true` для временных сбоев хранилища и ввода-вывода.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable | Self::Io)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
