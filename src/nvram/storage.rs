use std::{fmt, str::FromStr};

use nvstore_error::StorageResult;
use serde::{Deserialize, Serialize};

/// Логическая область энергонезависимой памяти.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Состояние темы.
    Theme,
    /// Записи истории игр.
    History,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Theme, Scope::History];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Theme => "theme",
            Scope::History => "history",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scope '{s}', expected theme or history"))
    }
}

/// Бэкенд хранения байтов.
///
/// Реализации сообщают об отсутствии записи как `Ok(None)`, а ошибки
/// возвращают только при реальных сбоях.
pub trait NvramStorage: Send + Sync {
    fn try_read(
        &self,
        scope: Scope,
        path: &str,
    ) -> StorageResult<Option<Vec<u8>>>;

    /// Заменяет запись по `path` на `data`.
    fn write(
        &self,
        scope: Scope,
        path: &str,
        data: &[u8],
    ) -> StorageResult<()>;
}

impl<S: NvramStorage + ?Sized> NvramStorage for std::sync::Arc<S> {
    fn try_read(
        &self,
        scope: Scope,
        path: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        (**self).try_read(scope, path)
    }

    fn write(
        &self,
        scope: Scope,
        path: &str,
        data: &[u8],
    ) -> StorageResult<()> {
        (**self).write(scope, path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!("theme".parse::<Scope>().unwrap(), Scope::Theme);
        assert_eq!("HISTORY".parse::<Scope>().unwrap(), Scope::History);
        assert!("bank".parse::<Scope>().is_err());
        assert_eq!(Scope::History.to_string(), "history");
    }
}
