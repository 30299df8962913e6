use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::nvram::Scope;

/// Настройки фасада NVRAM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NvramConfig {
    /// Зарезервированный путь записи с таблицей типов.
    pub type_table_path: String,
    /// Область, в которой хранится основная копия таблицы типов.
    pub type_table_scope: Scope,
    /// Сжимать выровненные данные gzip, начиная с `min_compress_size`.
    pub compress_padded: bool,
    pub min_compress_size: usize,
    /// Предел вложенности при кодировании и декодировании.
    pub max_depth: usize,
}

impl Default for NvramConfig {
    fn default() -> Self {
        Self {
            type_table_path: "__type_table".to_string(),
            type_table_scope: Scope::Theme,
            compress_padded: true,
            min_compress_size: 64,
            max_depth: crate::serializer::DEFAULT_MAX_DEPTH,
        }
    }
}

impl NvramConfig {
    /// Значения по умолчанию, переопределённые переменными `NVSTORE_*`.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("type_table_path", defaults.type_table_path)?
            .set_default("type_table_scope", defaults.type_table_scope.as_str())?
            .set_default("compress_padded", defaults.compress_padded)?
            .set_default("min_compress_size", defaults.min_compress_size as u64)?
            .set_default("max_depth", defaults.max_depth as u64)?
            // Переменные окружения с префиксом NVSTORE_
            .add_source(Environment::with_prefix("NVSTORE").try_parsing(true))
            .build()?;

        cfg.try_deserialize()
    }
}
