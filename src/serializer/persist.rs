//! Преобразование между типами Rust и деревьями [`Value`].

use std::{
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
};

use nvstore_error::{SerResult, SerializerError};

use super::value::{names, DateTime, TimeSpan, Value};

/// Тип Rust, имеющий сохраняемую форму.
///
/// `type_name` попадает в таблицу типов для составных значений и
/// сравнивается с параметрами конструктора для свойств объекта.
pub trait Persist: Sized {
    fn type_name() -> String;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> SerResult<Self>;
}

/// `TypeMismatch` с именем фактического типа `found`.
pub fn unexpected(
    expected: &str,
    found: &Value,
) -> SerializerError {
    let found = found
        .type_name()
        .map_or_else(|| "null".to_string(), |n| n.into_owned());
    SerializerError::type_mismatch(expected, found)
}

/// Извлекает свойство `name` из полей декодированного объекта и преобразует его.
pub fn take_field<T: Persist>(
    fields: &mut Vec<(String, Value)>,
    type_name: &str,
    name: &str,
) -> SerResult<T> {
    let pos = fields.iter().position(|(n, _)| n == name).ok_or_else(|| {
        SerializerError::MissingProperty {
            type_name: type_name.to_string(),
            property: name.to_string(),
        }
    })?;
    T::from_value(fields.swap_remove(pos).1)
}

macro_rules! impl_primitive {
    ($($ty:ty => $variant:ident, $name:expr;)*) => {
        $(
            impl Persist for $ty {
                fn type_name() -> String {
                    $name.to_string()
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> SerResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(unexpected($name, &other)),
                    }
                }
            }
        )*
    };
}

impl_primitive! {
    bool => Bool, names::BOOL;
    u8 => Byte, names::BYTE;
    char => Char, names::CHAR;
    i16 => Int16, names::INT16;
    i32 => Int32, names::INT32;
    i64 => Int64, names::INT64;
    u16 => UInt16, names::UINT16;
    u32 => UInt32, names::UINT32;
    u64 => UInt64, names::UINT64;
    f32 => Single, names::SINGLE;
    f64 => Double, names::DOUBLE;
    String => String, names::STRING;
    TimeSpan => TimeSpan, names::TIMESPAN;
    DateTime => DateTime, names::DATETIME;
}

/// `None` сохраняется как `Null`; имя типа совпадает с именем `T`.
impl<T: Persist> Persist for Option<T> {
    fn type_name() -> String {
        T::type_name()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> SerResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn items_from<T: Persist>(items: Vec<Value>) -> SerResult<Vec<T>> {
    items.into_iter().map(T::from_value).collect()
}

impl<T: Persist> Persist for Vec<T> {
    fn type_name() -> String {
        names::list(&T::type_name())
    }

    fn to_value(&self) -> Value {
        Value::List {
            type_name: Self::type_name(),
            items: self.iter().map(Persist::to_value).collect(),
        }
    }

    fn from_value(value: Value) -> SerResult<Self> {
        match value {
            Value::List { items, .. } => items_from(items),
            other => Err(unexpected(&Self::type_name(), &other)),
        }
    }
}

impl<T: Persist> Persist for Box<[T]> {
    fn type_name() -> String {
        names::array(&T::type_name())
    }

    fn to_value(&self) -> Value {
        Value::Array {
            type_name: Self::type_name(),
            items: self.iter().map(Persist::to_value).collect(),
        }
    }

    fn from_value(value: Value) -> SerResult<Self> {
        match value {
            Value::Array { items, .. } => items_from(items).map(Vec::into_boxed_slice),
            other => Err(unexpected(&Self::type_name(), &other)),
        }
    }
}

fn entries_from<K: Persist, V: Persist>(
    value: Value,
    expected: &str,
) -> SerResult<impl Iterator<Item = SerResult<(K, V)>>> {
    match value {
        Value::Dictionary { entries, .. } => Ok(entries
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))),
        other => Err(unexpected(expected, &other)),
    }
}

impl<K, V, S> Persist for HashMap<K, V, S>
where
    K: Persist + Eq + Hash,
    V: Persist,
    S: BuildHasher + Default,
{
    fn type_name() -> String {
        names::dictionary(&K::type_name(), &V::type_name())
    }

    fn to_value(&self) -> Value {
        Value::Dictionary {
            type_name: Self::type_name(),
            entries: self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect(),
        }
    }

    fn from_value(value: Value) -> SerResult<Self> {
        entries_from(value, &Self::type_name())?.collect()
    }
}

impl<K, V> Persist for BTreeMap<K, V>
where
    K: Persist + Ord,
    V: Persist,
{
    fn type_name() -> String {
        names::dictionary(&K::type_name(), &V::type_name())
    }

    fn to_value(&self) -> Value {
        Value::Dictionary {
            type_name: Self::type_name(),
            entries: self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect(),
        }
    }

    fn from_value(value: Value) -> SerResult<Self> {
        entries_from(value, &Self::type_name())?.collect()
    }
}

macro_rules! impl_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: Persist),+> Persist for ($($name,)+) {
            fn type_name() -> String {
                names::tuple(&[$($name::type_name()),+])
            }

            fn to_value(&self) -> Value {
                Value::Tuple {
                    type_name: Self::type_name(),
                    items: vec![$(self.$idx.to_value()),+],
                }
            }

            fn from_value(value: Value) -> SerResult<Self> {
                let items = match value {
                    Value::Tuple { items, .. } => items,
                    other => return Err(unexpected(&Self::type_name(), &other)),
                };
                let arity = [$(stringify!($idx)),+].len();
                if items.len() != arity {
                    return Err(SerializerError::invalid_data(format!(
                        "{} expects {arity} items, got {}",
                        Self::type_name(),
                        items.len()
                    )));
                }
                let mut items = items.into_iter();
                Ok(($(
                    $name::from_value(items.next().unwrap_or(Value::Null))?,
                )+))
            }
        }
    };
}

impl_tuple!(A 0, B 1);
impl_tuple!(A 0, B 1, C 2);
impl_tuple!(A 0, B 1, C 2, D 3);
