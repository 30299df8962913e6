pub mod ext;
pub mod status_code;
pub mod types;

// Публичный реэкспорт всех типов ошибок из корня крейта.
pub use ext::*;
pub use status_code::*;
pub use types::*;

pub type SerResult<T> = Result<T, SerializerError>;
pub type FrameResult<T> = Result<T, FrameError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type NvramResult<T> = Result<T, NvramError>;
