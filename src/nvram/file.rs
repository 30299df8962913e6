//! Файловое хранилище NVRAM.
//!
//! Каждая область (`theme`, `history`) хранится как отдельный каталог под общим
//! корнем, каждая запись хранится как отдельный файл. Запись выполняется через
//! временный файл в том же каталоге и атомарную замену.

use std::{
    fs,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use nvstore_error::{StorageError, StorageResult};
use tempfile::NamedTempFile;
use tracing::trace;

use super::{NvramStorage, Scope};

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Создаёт хранилище с корнем `root`. Каталог создаётся при первой
    /// записи.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Переводит логический путь записи в путь файла.
    ///
    /// Путь состоит из непустых компонентов через `/`; `.`, `..` и абсолютные пути
    /// отвергаются.
    pub fn entry_path(
        &self,
        scope: Scope,
        path: &str,
    ) -> StorageResult<PathBuf> {
        let invalid = |reason: &str| StorageError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };
        if path.is_empty() {
            return Err(invalid("empty path"));
        }
        if path.contains('\\') || path.contains('\0') {
            return Err(invalid("forbidden character"));
        }

        let mut full = self.root.join(scope.as_str());
        for part in path.split('/') {
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(c)), None) => full.push(c),
                (None, _) => return Err(invalid("empty component")),
                _ => return Err(invalid("only plain components are allowed")),
            }
        }
        Ok(full)
    }
}

impl NvramStorage for FileStorage {
    fn try_read(
        &self,
        scope: Scope,
        path: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        let file = self.entry_path(scope, path)?;
        match fs::read(&file) {
            Ok(data) => {
                trace!(path = %file.display(), len = data.len(), "read entry");
                Ok(Some(data))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&file, e)),
        }
    }

    fn write(
        &self,
        scope: Scope,
        path: &str,
        data: &[u8],
    ) -> StorageResult<()> {
        let file = self.entry_path(scope, path)?;
        let dir = file
            .parent()
            .ok_or_else(|| StorageError::InvalidPath {
                path: path.to_string(),
                reason: "no parent directory".to_string(),
            })?;
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        // 1. Временный файл в том же каталоге.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(data).map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.as_file_mut()
            .sync_all()
            .map_err(|e| StorageError::io(tmp.path(), e))?;

        // 2. Атомарная замена.
        tmp.persist(&file)
            .map_err(|e| StorageError::io(&file, e.error))?;
        trace!(path = %file.display(), len = data.len(), "wrote entry");
        Ok(())
    }
}
