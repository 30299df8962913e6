pub mod frame;
pub mod nvram;
pub mod serializer;
pub mod storage;

// Публичный экспорт всех типов ошибок, чтобы упростить доступ к ним из
// внешнего кода.
pub use frame::*;
pub use nvram::*;
pub use serializer::*;
pub use storage::*;
