//! Модуль для десериализации значений [`Value`] из бинарного формата.
//!
//! Каждое значение начинается с однобайтового тега. Декодер читает ровно
//! столько байт, сколько занимает значение, поэтому хвостовые нули после
//! выравнивания никогда не затрагиваются.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use nvstore_error::{SerResult, SerializerError};

use super::{
    tags::TypeTag,
    value::{ticks_to_datetime, ticks_to_timespan},
    varint::read_varint,
    Registry, TypeTable, Value,
};

/// Верхняя граница ёмкости, резервируемой по недоверенной длине.
const MAX_PREALLOC: usize = 1024;

/// Контекст декодирования, передаваемый пользовательским кодекам.
pub struct Decoder<'a> {
    input: &'a mut dyn Read,
    table: &'a TypeTable,
    registry: &'a Registry,
    depth: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new<R: Read>(
        input: &'a mut R,
        table: &'a TypeTable,
        registry: &'a Registry,
        max_depth: usize,
    ) -> Self {
        Self {
            input,
            table,
            registry,
            depth: 0,
            max_depth,
        }
    }

    /// Сырой ввод для данных кодека.
    pub fn reader(&mut self) -> &mut dyn Read {
        &mut *self.input
    }

    pub fn read_varint(&mut self) -> SerResult<u32> {
        read_varint(&mut *self.input)
    }

    pub fn read_len(&mut self) -> SerResult<usize> {
        Ok(self.read_varint()? as usize)
    }

    pub fn read_str(&mut self) -> SerResult<String> {
        let len = self.read_len()?;
        let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC * 64));
        (&mut *self.input)
            .take(len as u64)
            .read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        Ok(String::from_utf8(buf)?)
    }

    /// Читает индекс таблицы типов и разрешает его в имя.
    pub fn read_type_name(&mut self) -> SerResult<String> {
        let index = self.read_varint()?;
        self.table.resolve(index).map(str::to_string)
    }

    /// Читает одно тегированное значение, рекурсивно спускаясь в потомков.
    pub fn read_value(&mut self) -> SerResult<Value> {
        if self.depth >= self.max_depth {
            return Err(SerializerError::DepthLimit {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = self.read_inner();
        self.depth -= 1;
        result
    }

    fn read_inner(&mut self) -> SerResult<Value> {
        let tag = TypeTag::try_from(self.input.read_u8()?)?;
        let value = match tag {
            TypeTag::Null => Value::Null,
            TypeTag::Bool => match self.input.read_u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(SerializerError::invalid_data(format!(
                        "invalid bool byte {other}"
                    )))
                }
            },
            TypeTag::Byte => Value::Byte(self.input.read_u8()?),
            TypeTag::Char => {
                let code = self.input.read_u32::<LittleEndian>()?;
                let c = char::from_u32(code).ok_or_else(|| {
                    SerializerError::invalid_data(format!("invalid char code 0x{code:X}"))
                })?;
                Value::Char(c)
            }
            TypeTag::Int16 => Value::Int16(self.input.read_i16::<LittleEndian>()?),
            TypeTag::Int32 => Value::Int32(self.input.read_i32::<LittleEndian>()?),
            TypeTag::Int64 => Value::Int64(self.input.read_i64::<LittleEndian>()?),
            TypeTag::UInt16 => Value::UInt16(self.input.read_u16::<LittleEndian>()?),
            TypeTag::UInt32 => Value::UInt32(self.input.read_u32::<LittleEndian>()?),
            TypeTag::UInt64 => Value::UInt64(self.input.read_u64::<LittleEndian>()?),
            TypeTag::Single => Value::Single(self.input.read_f32::<LittleEndian>()?),
            TypeTag::Double => Value::Double(self.input.read_f64::<LittleEndian>()?),
            TypeTag::String => Value::String(self.read_str()?),
            TypeTag::TimeSpan => {
                Value::TimeSpan(ticks_to_timespan(self.input.read_i64::<LittleEndian>()?))
            }
            TypeTag::DateTime => {
                Value::DateTime(ticks_to_datetime(self.input.read_i64::<LittleEndian>()?)?)
            }
            TypeTag::Tuple => {
                let type_name = self.read_type_name()?;
                let items = self.read_items()?;
                Value::Tuple { type_name, items }
            }
            TypeTag::Array => {
                let type_name = self.read_type_name()?;
                let items = self.read_items()?;
                Value::Array { type_name, items }
            }
            TypeTag::List => {
                let type_name = self.read_type_name()?;
                let items = self.read_items()?;
                Value::List { type_name, items }
            }
            TypeTag::Dictionary => {
                let type_name = self.read_type_name()?;
                let len = self.read_len()?;
                let mut entries = Vec::with_capacity(len.min(MAX_PREALLOC));
                for _ in 0..len {
                    let key = self.read_value()?;
                    let val = self.read_value()?;
                    entries.push((key, val));
                }
                Value::Dictionary { type_name, entries }
            }
            TypeTag::Enum => {
                let type_name = self.read_type_name()?;
                let value = self.read_value()?;
                if !value.is_integer() {
                    return Err(SerializerError::invalid_data(format!(
                        "enum {type_name} has non-integer underlying value {}",
                        value.kind()
                    )));
                }
                Value::Enum {
                    type_name,
                    value: Box::new(value),
                }
            }
            TypeTag::Custom => {
                let type_name = self.read_type_name()?;
                let registry = self.registry;
                let codec = registry.codec_for(&type_name).ok_or_else(|| {
                    SerializerError::MissingCustomDeserializer {
                        type_name: type_name.clone(),
                    }
                })?;
                codec.decode(&type_name, self)?
            }
            TypeTag::Auto => {
                let type_name = self.read_type_name()?;
                let plan = self.registry.object_plan(&type_name)?;
                let mut args = Vec::with_capacity(plan.arity());
                for _ in 0..plan.arity() {
                    args.push(self.read_value()?);
                }
                plan.construct(args)?
            }
        };
        Ok(value)
    }

    fn read_items(&mut self) -> SerResult<Vec<Value>> {
        let len = self.read_len()?;
        let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            items.push(self.read_value()?);
        }
        Ok(items)
    }
}
