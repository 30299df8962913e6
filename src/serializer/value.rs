//! Динамическое дерево значений бинарного сериализатора.
//!
//! Каждое составное значение несёт имя своего типа; именно оно
//! попадает в [`TypeTable`](super::TypeTable).

use std::borrow::Cow;

use chrono::{DateTime as UtcDateTime, NaiveDateTime, TimeDelta};
use nvstore_error::{SerResult, SerializerError};

use super::tags::TypeTag;

/// Знаковая длительность, в потоке хранится в тиках по 100 нс.
pub type TimeSpan = TimeDelta;
/// Календарный момент без часового пояса; в потоке это тики по 100 нс от 0001-01-01.
pub type DateTime = NaiveDateTime;

/// Канонические имена примитивных типов.
pub mod names {
    pub const BOOL: &str = "bool";
    pub const BYTE: &str = "u8";
    pub const CHAR: &str = "char";
    pub const INT16: &str = "i16";
    pub const INT32: &str = "i32";
    pub const INT64: &str = "i64";
    pub const UINT16: &str = "u16";
    pub const UINT32: &str = "u32";
    pub const UINT64: &str = "u64";
    pub const SINGLE: &str = "f32";
    pub const DOUBLE: &str = "f64";
    pub const STRING: &str = "string";
    pub const TIMESPAN: &str = "timespan";
    pub const DATETIME: &str = "datetime";

    /// Имя списка элементов `element`.
    pub fn list(element: &str) -> String {
        format!("List<{element}>")
    }

    /// Имя одномерного массива элементов `element`.
    pub fn array(element: &str) -> String {
        format!("{element}[]")
    }

    pub fn dictionary(
        key: &str,
        value: &str,
    ) -> String {
        format!("Dictionary<{key},{value}>")
    }

    pub fn tuple<S: AsRef<str>>(elements: &[S]) -> String {
        let parts: Vec<&str> = elements.iter().map(AsRef::as_ref).collect();
        format!("Tuple<{}>", parts.join(","))
    }
}

/// Тиков по 100 нс в секунде.
pub const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;
/// Число тиков от 0001-01-01T00:00:00 до 1970-01-01T00:00:00.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Узел графа объектов в памяти.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(u8),
    Char(char),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Single(f32),
    Double(f64),
    String(String),
    TimeSpan(TimeSpan),
    DateTime(DateTime),
    Tuple {
        type_name: String,
        items: Vec<Value>,
    },
    Array {
        type_name: String,
        items: Vec<Value>,
    },
    List {
        type_name: String,
        items: Vec<Value>,
    },
    /// Записи сохраняют порядок вставки исходного отображения.
    Dictionary {
        type_name: String,
        entries: Vec<(Value, Value)>,
    },
    /// `value` всегда один из целочисленных примитивов.
    Enum {
        type_name: String,
        value: Box<Value>,
    },
    /// Простой объект данных; `fields` это его публичные свойства по имени.
    Object {
        type_name: String,
        fields: Vec<(String, Value)>,
    },
}

impl Value {
    /// Имя типа значения; `None` для [`Value::Null`].
    pub fn type_name(&self) -> Option<Cow<'_, str>> {
        let name = match self {
            Value::Null => return None,
            Value::Bool(_) => names::BOOL,
            Value::Byte(_) => names::BYTE,
            Value::Char(_) => names::CHAR,
            Value::Int16(_) => names::INT16,
            Value::Int32(_) => names::INT32,
            Value::Int64(_) => names::INT64,
            Value::UInt16(_) => names::UINT16,
            Value::UInt32(_) => names::UINT32,
            Value::UInt64(_) => names::UINT64,
            Value::Single(_) => names::SINGLE,
            Value::Double(_) => names::DOUBLE,
            Value::String(_) => names::STRING,
            Value::TimeSpan(_) => names::TIMESPAN,
            Value::DateTime(_) => names::DATETIME,
            Value::Tuple { type_name, .. }
            | Value::Array { type_name, .. }
            | Value::List { type_name, .. }
            | Value::Dictionary { type_name, .. }
            | Value::Enum { type_name, .. }
            | Value::Object { type_name, .. } => return Some(Cow::Borrowed(type_name.as_str())),
        };
        Some(Cow::Borrowed(name))
    }

    /// Тег, с которым пишется значение, если его не забрал кодек.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Byte(_) => TypeTag::Byte,
            Value::Char(_) => TypeTag::Char,
            Value::Int16(_) => TypeTag::Int16,
            Value::Int32(_) => TypeTag::Int32,
            Value::Int64(_) => TypeTag::Int64,
            Value::UInt16(_) => TypeTag::UInt16,
            Value::UInt32(_) => TypeTag::UInt32,
            Value::UInt64(_) => TypeTag::UInt64,
            Value::Single(_) => TypeTag::Single,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::TimeSpan(_) => TypeTag::TimeSpan,
            Value::DateTime(_) => TypeTag::DateTime,
            Value::Tuple { .. } => TypeTag::Tuple,
            Value::Array { .. } => TypeTag::Array,
            Value::List { .. } => TypeTag::List,
            Value::Dictionary { .. } => TypeTag::Dictionary,
            Value::Enum { .. } => TypeTag::Enum,
            Value::Object { .. } => TypeTag::Auto,
        }
    }

    /// Короткое имя формы для сообщений об ошибках.
    pub fn kind(&self) -> &'static str {
        match self.tag() {
            TypeTag::Null => "Null",
            TypeTag::Bool => "Bool",
            TypeTag::Byte => "Byte",
            TypeTag::Char => "Char",
            TypeTag::Int16 => "Int16",
            TypeTag::Int32 => "Int32",
            TypeTag::Int64 => "Int64",
            TypeTag::UInt16 => "UInt16",
            TypeTag::UInt32 => "UInt32",
            TypeTag::UInt64 => "UInt64",
            TypeTag::Single => "Single",
            TypeTag::Double => "Double",
            TypeTag::String => "String",
            TypeTag::TimeSpan => "TimeSpan",
            TypeTag::DateTime => "DateTime",
            TypeTag::Tuple => "Tuple",
            TypeTag::Array => "Array",
            TypeTag::List => "List",
            TypeTag::Dictionary => "Dictionary",
            TypeTag::Enum => "Enum",
            TypeTag::Custom => "Custom",
            TypeTag::Auto => "Object",
        }
    }

    /// Может ли значение быть базовым значением enum.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Int16(_)
                | Value::Int32(_)
                | Value::Int64(_)
                | Value::UInt16(_)
                | Value::UInt32(_)
                | Value::UInt64(_)
        )
    }

    /// Строит объект из пар `(property, value)`.
    pub fn object<N, I>(
        type_name: impl Into<String>,
        fields: I,
    ) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        Value::Object {
            type_name: type_name.into(),
            fields: fields.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }

    /// Ищет свойство объекта по точному имени.
    pub fn field(
        &self,
        name: &str,
    ) -> Option<&Value> {
        match self {
            Value::Object { fields, .. } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Число тиков в `nanos`; `None`, если оно не целое.
fn whole_ticks(nanos: i64) -> Option<i64> {
    (nanos % NANOS_PER_TICK == 0).then_some(nanos / NANOS_PER_TICK)
}

/// Переводит длительность в тики по 100 нс.
///
/// Длительность с точностью мельче одного тика не сохраняется без потерь
/// и отклоняется.
pub fn timespan_to_ticks(span: &TimeSpan) -> SerResult<i64> {
    let sub_ticks = whole_ticks(i64::from(span.subsec_nanos()))
        .ok_or_else(|| SerializerError::invalid_data(format!("timespan {span} is finer than 100 ns")))?;
    span.num_seconds()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(sub_ticks))
        .ok_or_else(|| SerializerError::invalid_data(format!("timespan {span} out of tick range")))
}

pub fn ticks_to_timespan(ticks: i64) -> TimeSpan {
    // Тики i64 заведомо меньше предела TimeDelta в i64::MAX миллисекунд.
    TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK)
}

/// Переводит момент времени в тики по 100 нс от 0001-01-01T00:00:00.
///
/// Точность мельче тика отклоняется, как в [`timespan_to_ticks`].
pub fn datetime_to_ticks(dt: &DateTime) -> SerResult<i64> {
    let utc = dt.and_utc();
    let sub_ticks = whole_ticks(i64::from(utc.timestamp_subsec_nanos()))
        .ok_or_else(|| SerializerError::invalid_data(format!("datetime {dt} is finer than 100 ns")))?;
    utc.timestamp()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(sub_ticks))
        .and_then(|t| t.checked_add(UNIX_EPOCH_TICKS))
        .ok_or_else(|| SerializerError::invalid_data(format!("datetime {dt} out of tick range")))
}

pub fn ticks_to_datetime(ticks: i64) -> SerResult<DateTime> {
    let since_unix = ticks
        .checked_sub(UNIX_EPOCH_TICKS)
        .ok_or_else(|| SerializerError::invalid_data(format!("tick count {ticks} out of range")))?;
    let secs = since_unix.div_euclid(TICKS_PER_SECOND);
    let nanos = since_unix.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    UtcDateTime::from_timestamp(secs, nanos as u32)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| SerializerError::invalid_data(format!("tick count {ticks} out of range")))
}
