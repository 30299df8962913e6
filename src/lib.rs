/// Настройки фасада NVRAM.
pub mod config;
/// Выравнивание и сжатие сохраняемых данных.
pub mod frame;
/// Настройка подписчика логов для бинарников и утилит.
pub mod logging;
/// Фасад NVRAM и бэкенды хранилища.
pub mod nvram;
/// Тегированное бинарное кодирование деревьев значений.
pub mod serializer;

// -----------------------------------------------------------------------------
//  Часто используемые публичные типы
// -----------------------------------------------------------------------------

/// Конфигурация.
pub use config::NvramConfig;
/// Фрейминг.
pub use frame::{unpad, Padder, Unpadded};
/// Фасад, области и бэкенды хранилища.
pub use nvram::{FileStorage, MemoryStorage, Nvram, NvramStorage, Scope};
/// Типы ошибок и коды статуса.
pub use nvstore_error::{
    ErrorExt, FrameError, FrameResult, NvramError, NvramResult, SerResult, SerializerError,
    StatusCode, StorageError, StorageResult,
};
/// Сериализатор, реестр и модель значений.
pub use serializer::{
    BinarySerializer, CustomCodec, Decoder, Encoder, ObjectShape, Persist, PersistObject,
    Registry, RegistryBuilder, Serialized, TypeTable, TypeTag, Value,
};
