pub mod decode;
pub mod encode;
pub mod macros;
pub mod persist;
pub mod registry;
pub mod table;
pub mod tags;
pub mod value;
pub mod varint;

use std::{io::Read, sync::Arc};

pub use decode::*;
pub use encode::*;
use nvstore_error::SerResult;
pub use persist::*;
pub use registry::*;
pub use table::*;
pub use tags::*;
use tracing::trace;
pub use value::*;
pub use varint::*;

/// Предел вложенности, если он не задан в настройках.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Результат [`BinarySerializer::serialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serialized {
    pub bytes: Vec<u8>,
    /// Вызов добавил в таблицу типов хотя бы одно имя.
    pub table_grew: bool,
}

/// Точка входа бинарного формата: дерево значений на входе, тегированные байты на выходе.
#[derive(Debug, Clone)]
pub struct BinarySerializer {
    registry: Arc<Registry>,
    max_depth: usize,
}

impl BinarySerializer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Кодирует `value`, добавляя новые имена типов в `table`.
    ///
    /// При ошибке таблица может уже содержать имена, добавленные
    /// предыдущими соседями; эти записи остаются корректными.
    pub fn serialize(
        &self,
        value: &Value,
        table: &mut TypeTable,
    ) -> SerResult<Serialized> {
        let before = table.len();
        let mut bytes = Vec::new();
        Encoder::new(&mut bytes, table, &self.registry, self.max_depth).write_value(value)?;
        let table_grew = table.len() > before;
        trace!(len = bytes.len(), table_grew, "serialized value");
        Ok(Serialized { bytes, table_grew })
    }

    /// Декодирует одно значение; байты после него остаются в `input`.
    pub fn deserialize<R: Read>(
        &self,
        input: &mut R,
        table: &TypeTable,
    ) -> SerResult<Value> {
        Decoder::new(input, table, &self.registry, self.max_depth).read_value()
    }

    pub fn to_bytes<T: Persist>(
        &self,
        value: &T,
        table: &mut TypeTable,
    ) -> SerResult<Serialized> {
        self.serialize(&value.to_value(), table)
    }

    pub fn from_reader<T: Persist, R: Read>(
        &self,
        input: &mut R,
        table: &TypeTable,
    ) -> SerResult<T> {
        T::from_value(self.deserialize(input, table)?)
    }
}
