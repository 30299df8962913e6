//! Запись значений [`Value`] в тегированный бинарный поток.
//!
//! Каждое значение начинается с однобайтового тега. Составные значения
//! дополнительно пишут индекс своего типа в [`TypeTable`], затем длину и
//! дочерние значения.

use byteorder::{LittleEndian, WriteBytesExt};
use nvstore_error::{SerResult, SerializerError};

use super::{
    tags::TypeTag,
    value::{datetime_to_ticks, timespan_to_ticks},
    varint::{write_len, write_varint},
    Registry, TypeTable, Value,
};

/// Контекст кодирования: выходной буфер, пополняемая таблица типов и
/// реестр. Кодеки получают его, чтобы писать свои данные и вложенные значения.
pub struct Encoder<'a> {
    out: &'a mut Vec<u8>,
    table: &'a mut TypeTable,
    registry: &'a Registry,
    depth: usize,
    max_depth: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(
        out: &'a mut Vec<u8>,
        table: &'a mut TypeTable,
        registry: &'a Registry,
        max_depth: usize,
    ) -> Self {
        Self {
            out,
            table,
            registry,
            depth: 0,
            max_depth,
        }
    }

    /// Сырой вывод для данных кодека.
    pub fn writer(&mut self) -> &mut Vec<u8> {
        self.out
    }

    pub fn write_varint(
        &mut self,
        value: u32,
    ) -> SerResult<()> {
        write_varint(self.out, value).map(|_| ())
    }

    /// Длина в байтах (varint), затем байты UTF-8.
    pub fn write_str(
        &mut self,
        s: &str,
    ) -> SerResult<()> {
        write_len(self.out, s.len())?;
        self.out.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Пишет индекс `type_name` в таблице, добавляя новое имя.
    pub fn write_type_index(
        &mut self,
        type_name: &str,
    ) -> SerResult<u32> {
        let index = self.table.get_or_add(type_name);
        self.write_varint(index)?;
        Ok(index)
    }

    fn write_tag(
        &mut self,
        tag: TypeTag,
    ) -> SerResult<()> {
        self.out.write_u8(tag.into())?;
        Ok(())
    }

    /// Пишет одно тегированное значение, рекурсивно спускаясь в потомков.
    pub fn write_value(
        &mut self,
        value: &Value,
    ) -> SerResult<()> {
        if self.depth >= self.max_depth {
            return Err(SerializerError::DepthLimit {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = self.write_inner(value);
        self.depth -= 1;
        result
    }

    fn write_inner(
        &mut self,
        value: &Value,
    ) -> SerResult<()> {
        let Some(type_name) = value.type_name() else {
            return self.write_tag(TypeTag::Null);
        };

        // Кодеки получают любое непустое значение раньше встроенных форм.
        let registry = self.registry;
        if let Some(codec) = registry.codec_for(&type_name) {
            self.write_tag(TypeTag::Custom)?;
            self.write_type_index(&type_name)?;
            return codec.encode(value, self);
        }

        match value {
            Value::Null => self.write_tag(TypeTag::Null),
            Value::Bool(b) => {
                self.write_tag(TypeTag::Bool)?;
                self.out.write_u8(u8::from(*b))?;
                Ok(())
            }
            Value::Byte(b) => {
                self.write_tag(TypeTag::Byte)?;
                self.out.write_u8(*b)?;
                Ok(())
            }
            Value::Char(c) => {
                self.write_tag(TypeTag::Char)?;
                self.out.write_u32::<LittleEndian>(u32::from(*c))?;
                Ok(())
            }
            Value::Int16(i) => {
                self.write_tag(TypeTag::Int16)?;
                self.out.write_i16::<LittleEndian>(*i)?;
                Ok(())
            }
            Value::Int32(i) => {
                self.write_tag(TypeTag::Int32)?;
                self.out.write_i32::<LittleEndian>(*i)?;
                Ok(())
            }
            Value::Int64(i) => {
                self.write_tag(TypeTag::Int64)?;
                self.out.write_i64::<LittleEndian>(*i)?;
                Ok(())
            }
            Value::UInt16(u) => {
                self.write_tag(TypeTag::UInt16)?;
                self.out.write_u16::<LittleEndian>(*u)?;
                Ok(())
            }
            Value::UInt32(u) => {
                self.write_tag(TypeTag::UInt32)?;
                self.out.write_u32::<LittleEndian>(*u)?;
                Ok(())
            }
            Value::UInt64(u) => {
                self.write_tag(TypeTag::UInt64)?;
                self.out.write_u64::<LittleEndian>(*u)?;
                Ok(())
            }
            Value::Single(f) => {
                self.write_tag(TypeTag::Single)?;
                self.out.write_f32::<LittleEndian>(*f)?;
                Ok(())
            }
            Value::Double(f) => {
                self.write_tag(TypeTag::Double)?;
                self.out.write_f64::<LittleEndian>(*f)?;
                Ok(())
            }
            Value::String(s) => {
                self.write_tag(TypeTag::String)?;
                self.write_str(s)
            }
            Value::TimeSpan(span) => {
                let ticks = timespan_to_ticks(span)?;
                self.write_tag(TypeTag::TimeSpan)?;
                self.out.write_i64::<LittleEndian>(ticks)?;
                Ok(())
            }
            Value::DateTime(dt) => {
                let ticks = datetime_to_ticks(dt)?;
                self.write_tag(TypeTag::DateTime)?;
                self.out.write_i64::<LittleEndian>(ticks)?;
                Ok(())
            }
            Value::Tuple { type_name, items } => self.write_sequence(TypeTag::Tuple, type_name, items),
            Value::Array { type_name, items } => self.write_sequence(TypeTag::Array, type_name, items),
            Value::List { type_name, items } => self.write_sequence(TypeTag::List, type_name, items),
            Value::Dictionary { type_name, entries } => {
                self.write_tag(TypeTag::Dictionary)?;
                self.write_type_index(type_name)?;
                write_len(self.out, entries.len())?;
                for (key, val) in entries {
                    self.write_value(key)?;
                    self.write_value(val)?;
                }
                Ok(())
            }
            Value::Enum { type_name, value } => {
                if !value.is_integer() {
                    return Err(SerializerError::invalid_data(format!(
                        "enum {type_name} has non-integer underlying value {}",
                        value.kind()
                    )));
                }
                self.write_tag(TypeTag::Enum)?;
                self.write_type_index(type_name)?;
                self.write_value(value)
            }
            Value::Object { type_name, fields } => {
                // Проверка до обращения к таблице: отклонённый тип
                // в неё не попадает.
                let plan = registry.object_plan(type_name)?;
                let args = plan.arguments(fields)?;

                self.write_tag(TypeTag::Auto)?;
                self.write_type_index(type_name)?;
                for arg in args {
                    self.write_value(arg)?;
                }
                Ok(())
            }
        }
    }

    fn write_sequence(
        &mut self,
        tag: TypeTag,
        type_name: &str,
        items: &[Value],
    ) -> SerResult<()> {
        self.write_tag(tag)?;
        self.write_type_index(type_name)?;
        write_len(self.out, items.len())?;
        for item in items {
            self.write_value(item)?;
        }
        Ok(())
    }
}
