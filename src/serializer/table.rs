//! Таблица имён типов, допускающая только добавление.
//!
//! Составные значения ссылаются на свой тип по индексу в таблице, а не
//! повторяют полное имя. Индексы существующих записей не меняются, поэтому
//! поток остаётся читаемым, пока таблица, с которой он записан,
//! загружается в том же порядке.

use std::io::Read;

use nvstore_error::{SerResult, SerializerError};

use super::{
    decode::Decoder, encode::Encoder, Persist, Registry, DEFAULT_MAX_DEPTH,
};

/// Тип сохранённой формы таблицы. Всегда имеет индекс 0
/// во внутренней начальной таблице, используемой для этой кодировки.
const TABLE_TYPE_NAME: &str = "List<string>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTable {
    names: Vec<String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Восстанавливает таблицу из имён в сохранённом порядке.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(
        &self,
        type_name: &str,
    ) -> Option<u32> {
        self.names
            .iter()
            .position(|n| n == type_name)
            .map(|i| i as u32)
    }

    /// Возвращает индекс `type_name`, добавляя имя при промахе.
    ///
    /// Поиск линейный.
    pub fn get_or_add(
        &mut self,
        type_name: &str,
    ) -> u32 {
        if let Some(index) = self.index_of(type_name) {
            return index;
        }
        self.names.push(type_name.to_string());
        (self.names.len() - 1) as u32
    }

    pub fn resolve(
        &self,
        index: u32,
    ) -> SerResult<&str> {
        self.names
            .get(index as usize)
            .map(String::as_str)
            .ok_or(SerializerError::UnknownTypeIndex {
                index,
                table_len: self.names.len(),
            })
    }

    /// Кодирует саму таблицу как тегированный `List<string>`.
    ///
    /// Использует пустой реестр, чтобы кодеки приложения не меняли раскладку.
    pub fn encode(&self) -> SerResult<Vec<u8>> {
        let registry = Registry::empty();
        let mut bootstrap = Self::bootstrap();
        let mut out = Vec::new();
        let value = self.names.to_value();
        Encoder::new(&mut out, &mut bootstrap, &registry, DEFAULT_MAX_DEPTH).write_value(&value)?;
        Ok(out)
    }

    pub fn decode<R: Read>(input: &mut R) -> SerResult<Self> {
        let registry = Registry::empty();
        let bootstrap = Self::bootstrap();
        let value = Decoder::new(input, &bootstrap, &registry, DEFAULT_MAX_DEPTH).read_value()?;
        let names = Vec::<String>::from_value(value)?;
        Ok(Self { names })
    }

    fn bootstrap() -> Self {
        Self::from_names([TABLE_TYPE_NAME])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_stable() {
        let mut table = TypeTable::new();
        assert_eq!(table.get_or_add("List<i32>"), 0);
        assert_eq!(table.get_or_add("game.Wager"), 1);
        assert_eq!(table.get_or_add("List<i32>"), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(1).unwrap(), "game.Wager");
    }

    #[test]
    fn test_resolve_out_of_range() {
        let table = TypeTable::from_names(["a"]);
        match table.resolve(3).unwrap_err() {
            SerializerError::UnknownTypeIndex { index, table_len } => {
                assert_eq!(index, 3);
                assert_eq!(table_len, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_persisted_form_roundtrip() {
        let table = TypeTable::from_names(["List<i32>", "game.Wager", "Dictionary<string,i32>"]);
        let bytes = table.encode().unwrap();
        let decoded = TypeTable::decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_bootstrap_matches_list_name() {
        assert_eq!(TABLE_TYPE_NAME, crate::serializer::names::list("string"));
    }

    #[test]
    fn test_empty_table_roundtrip() {
        let bytes = TypeTable::new().encode().unwrap();
        // Тег List, начальный индекс 0, количество 0.
        assert_eq!(bytes, vec![17, 0, 0]);
        assert!(TypeTable::decode(&mut bytes.as_slice()).unwrap().is_empty());
    }
}
