use dashmap::DashMap;
use nvstore_error::StorageResult;

use super::{NvramStorage, Scope};

/// Хранилище в памяти процесса, в основном для тестов и утилит.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<(Scope, String), Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(
        &self,
        scope: Scope,
        path: &str,
    ) -> bool {
        self.entries.contains_key(&(scope, path.to_string()))
    }

    /// Удаляет запись и возвращает её байты.
    pub fn remove(
        &self,
        scope: Scope,
        path: &str,
    ) -> Option<Vec<u8>> {
        self.entries
            .remove(&(scope, path.to_string()))
            .map(|(_, data)| data)
    }
}

impl NvramStorage for MemoryStorage {
    fn try_read(
        &self,
        scope: Scope,
        path: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .entries
            .get(&(scope, path.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn write(
        &self,
        scope: Scope,
        path: &str,
        data: &[u8],
    ) -> StorageResult<()> {
        self.entries.insert((scope, path.to_string()), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_separate() {
        let storage = MemoryStorage::new();
        storage.write(Scope::Theme, "a", b"theme").unwrap();
        storage.write(Scope::History, "a", b"history").unwrap();

        assert_eq!(storage.try_read(Scope::Theme, "a").unwrap().unwrap(), b"theme");
        assert_eq!(storage.try_read(Scope::History, "a").unwrap().unwrap(), b"history");
        assert_eq!(storage.try_read(Scope::Theme, "b").unwrap(), None);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_overwrite_and_remove() {
        let storage = MemoryStorage::new();
        storage.write(Scope::Theme, "a", b"one").unwrap();
        storage.write(Scope::Theme, "a", b"two").unwrap();
        assert_eq!(storage.remove(Scope::Theme, "a").unwrap(), b"two");
        assert!(!storage.contains(Scope::Theme, "a"));
    }
}
