//! Фасад NVRAM: сериализатор, фрейминг и хранилище за одним интерфейсом.
//!
//! Формат записи в хранилище:
//!
//! ```text
//! [scheme = 0][encoded value]
//! [scheme = 1][flag][payload or gzip(payload)][zero padding]
//! ```
//!
//! Таблица типов живёт в зарезервированной записи области
//! `type_table_scope`; область `History` всегда получает свою копию.

use std::{io::Read, sync::Arc};

use nvstore_error::{ErrorExt, FrameError, NvramResult};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{NvramStorage, Scope};
use crate::{
    config::NvramConfig,
    frame::{should_compress, unpad, Padder},
    serializer::{BinarySerializer, Persist, Registry, Resolution, Serialized, TypeTable, Value},
};

/// Запись содержит закодированное значение напрямую.
pub const SCHEME_RAW: u8 = 0;
/// Запись содержит выровненный фрейм.
pub const SCHEME_PADDED: u8 = 1;

#[derive(Debug)]
struct TableState {
    table: TypeTable,
    /// С момента последнего сохранения в таблицу добавлены имена.
    dirty: bool,
}

/// Чтение и запись типизированных значений по `(scope, path)`.
pub struct Nvram<S: NvramStorage> {
    storage: S,
    serializer: BinarySerializer,
    config: NvramConfig,
    state: Mutex<Option<TableState>>,
    padder: Mutex<Padder>,
}

impl<S: NvramStorage> Nvram<S> {
    pub fn new(
        storage: S,
        registry: Arc<Registry>,
    ) -> Self {
        Self::with_config(storage, registry, NvramConfig::default())
    }

    pub fn with_config(
        storage: S,
        registry: Arc<Registry>,
        config: NvramConfig,
    ) -> Self {
        let serializer = BinarySerializer::new(registry).with_max_depth(config.max_depth);
        Self {
            storage,
            serializer,
            config,
            state: Mutex::new(None),
            padder: Mutex::new(Padder::new()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &NvramConfig {
        &self.config
    }

    pub fn serializer(&self) -> &BinarySerializer {
        &self.serializer
    }

    /// Загружает сохранённую таблицу типов, если она ещё не загружена.
    pub fn init(&self) -> NvramResult<()> {
        let mut guard = self.state.lock();
        self.ensure_loaded(&mut guard)?;
        Ok(())
    }

    /// Сбрасывает таблицу в памяти. Хранилище не затрагивается.
    pub fn deinit(&self) {
        if self.state.lock().take().is_some() {
            debug!("type table unloaded");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Копия загруженных имён типов; пуста до `init`.
    pub fn type_names(&self) -> Vec<String> {
        self.state
            .lock()
            .as_ref()
            .map(|state| state.table.names().to_vec())
            .unwrap_or_default()
    }

    pub fn write_nvram<T: Persist>(
        &self,
        scope: Scope,
        path: &str,
        value: &T,
        pad_threshold: usize,
    ) -> NvramResult<()> {
        self.write_value(scope, path, &value.to_value(), pad_threshold)
    }

    /// Кодирует `value` и сохраняет по `(scope, path)`.
    ///
    /// При `pad_threshold == 0` сохраняется голая кодировка, иначе она
    /// оборачивается во фрейм и дополняется нулями до кратного `pad_threshold`.
    pub fn write_value(
        &self,
        scope: Scope,
        path: &str,
        value: &Value,
        pad_threshold: usize,
    ) -> NvramResult<()> {
        let mut guard = self.state.lock();
        let state = self.ensure_loaded(&mut guard)?;

        let before = state.table.len();
        let encoded = self.serializer.serialize(value, &mut state.table);
        if state.table.len() > before {
            debug!(
                added = state.table.len() - before,
                total = state.table.len(),
                "type table grew"
            );
            state.dirty = true;
        }
        let Serialized { bytes, .. } = encoded?;

        let blob = self.frame(&bytes, pad_threshold)?;
        self.storage.write(scope, path, &blob)?;
        trace!(%scope, path, encoded = bytes.len(), stored = blob.len(), "wrote value");

        // History всегда получает текущую таблицу, даже если она не росла.
        let table_scope = self.config.type_table_scope;
        let history = scope == Scope::History;
        if state.dirty || (history && table_scope == Scope::History) {
            self.persist_table(&state.table, table_scope)?;
            state.dirty = false;
        }
        if history && table_scope != Scope::History {
            self.persist_table(&state.table, Scope::History)?;
        }
        Ok(())
    }

    pub fn try_read_nvram<T: Persist>(
        &self,
        scope: Scope,
        path: &str,
    ) -> NvramResult<Option<T>> {
        let value = self.try_read_value(scope, path)?;
        Ok(value.map(T::from_value).transpose()?)
    }

    /// Читает значение по `(scope, path)`; `None`, если записи нет.
    pub fn try_read_value(
        &self,
        scope: Scope,
        path: &str,
    ) -> NvramResult<Option<Value>> {
        let mut guard = self.state.lock();
        let state = self.ensure_loaded(&mut guard)?;

        let Some(blob) = self.storage.try_read(scope, path)? else {
            trace!(%scope, path, "no entry");
            return Ok(None);
        };
        let mut reader = open_blob(&blob)?;
        let value = self.serializer.deserialize(&mut reader, &state.table)?;
        trace!(%scope, path, stored = blob.len(), "read value");
        Ok(Some(value))
    }

    /// Сохраняет таблицу, если в ней есть несохранённые имена. Возвращает,
    /// была ли запись.
    pub fn flush_type_table(&self) -> NvramResult<bool> {
        let mut guard = self.state.lock();
        match guard.as_mut() {
            Some(state) if state.dirty => {
                self.persist_table(&state.table, self.config.type_table_scope)?;
                state.dirty = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn ensure_loaded<'g>(
        &self,
        slot: &'g mut Option<TableState>,
    ) -> NvramResult<&'g mut TableState> {
        let state = match slot.take() {
            Some(state) => state,
            None => self.load_table()?,
        };
        Ok(slot.insert(state))
    }

    fn load_table(&self) -> NvramResult<TableState> {
        let scope = self.config.type_table_scope;
        let path = self.config.type_table_path.as_str();
        let table = match self.storage.try_read(scope, path)? {
            None => {
                debug!(%scope, path, "no persisted type table, starting empty");
                TypeTable::new()
            }
            Some(blob) => match decode_table(&blob) {
                Ok(table) => {
                    debug!(%scope, path, types = table.len(), "type table loaded");
                    self.prime(&table);
                    table
                }
                Err(e) => {
                    warn!(%scope, path, error = %e, "persisted type table unreadable, starting empty");
                    TypeTable::new()
                }
            },
        };
        Ok(TableState {
            table,
            dirty: false,
        })
    }

    /// Разрешает каждое загруженное имя, чтобы выбор кодеков и конструкторов
    /// был сделан до первого чтения.
    fn prime(
        &self,
        table: &TypeTable,
    ) {
        let registry = self.serializer.registry();
        for name in table.names() {
            match registry.prime(name) {
                Ok(Resolution::Codec(codec)) => trace!(type_name = %name, %codec, "codec bound"),
                Ok(Resolution::Object) => trace!(type_name = %name, "object plan ready"),
                Ok(Resolution::Structural) => {}
                Err(e) => warn!(type_name = %name, error = %e, "type cannot be resolved"),
            }
        }
    }

    fn persist_table(
        &self,
        table: &TypeTable,
        scope: Scope,
    ) -> NvramResult<()> {
        let bytes = table.encode()?;
        let blob = self.frame(&bytes, 0)?;
        if let Err(e) = self.storage.write(scope, &self.config.type_table_path, &blob) {
            warn!(
                %scope,
                error = %e,
                retryable = e.status_code().is_retryable(),
                "type table not persisted"
            );
            return Err(e.into());
        }
        debug!(%scope, types = table.len(), "type table persisted");
        Ok(())
    }

    fn frame(
        &self,
        bytes: &[u8],
        pad_threshold: usize,
    ) -> NvramResult<Vec<u8>> {
        if pad_threshold == 0 {
            let mut blob = Vec::with_capacity(1 + bytes.len());
            blob.push(SCHEME_RAW);
            blob.extend_from_slice(bytes);
            return Ok(blob);
        }

        let compressed =
            self.config.compress_padded && should_compress(bytes.len(), self.config.min_compress_size);
        let mut blob = Vec::with_capacity(1 + bytes.len() + pad_threshold);
        blob.push(SCHEME_PADDED);
        self.padder
            .lock()
            .pad(bytes, &mut blob, compressed, pad_threshold)?;
        Ok(blob)
    }
}

/// Снимает байт схемы и фрейминг с сохранённой записи.
pub fn open_blob(blob: &[u8]) -> NvramResult<Box<dyn Read + '_>> {
    let (&scheme, rest) = blob.split_first().ok_or(FrameError::Truncated)?;
    match scheme {
        SCHEME_RAW => Ok(Box::new(rest)),
        SCHEME_PADDED => Ok(Box::new(unpad(rest)?)),
        scheme => Err(FrameError::InvalidScheme { scheme }.into()),
    }
}

/// Декодирует таблицу типов, сохранённую фасадом.
pub fn decode_table(blob: &[u8]) -> NvramResult<TypeTable> {
    let mut reader = open_blob(blob)?;
    Ok(TypeTable::decode(&mut reader)?)
}
