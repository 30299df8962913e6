//! Однобайтовые теги, которые предшествуют каждому закодированному значению.
//!
//! Значения тегов являются частью формата на носителе: существующие номера
//! не меняются, новые добавляются только в конец.

use nvstore_error::SerializerError;

/// Способ кодирования следующего значения в потоке.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null = 0,
    Bool = 1,
    Byte = 2,
    Char = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    UInt16 = 7,
    UInt32 = 8,
    UInt64 = 9,
    Single = 10,
    Double = 11,
    String = 12,
    TimeSpan = 13,
    DateTime = 14,
    Tuple = 15,
    Array = 16,
    List = 17,
    Dictionary = 18,
    Enum = 19,
    Custom = 20,
    Auto = 21,
}

impl TypeTag {
    /// Все теги в порядке их номеров.
    pub const ALL: [TypeTag; 22] = [
        TypeTag::Null,
        TypeTag::Bool,
        TypeTag::Byte,
        TypeTag::Char,
        TypeTag::Int16,
        TypeTag::Int32,
        TypeTag::Int64,
        TypeTag::UInt16,
        TypeTag::UInt32,
        TypeTag::UInt64,
        TypeTag::Single,
        TypeTag::Double,
        TypeTag::String,
        TypeTag::TimeSpan,
        TypeTag::DateTime,
        TypeTag::Tuple,
        TypeTag::Array,
        TypeTag::List,
        TypeTag::Dictionary,
        TypeTag::Enum,
        TypeTag::Custom,
        TypeTag::Auto,
    ];
}

impl TryFrom<u8> for TypeTag {
    type Error = SerializerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TypeTag::ALL
            .get(value as usize)
            .copied()
            .ok_or(SerializerError::InvalidTag { tag: value })
    }
}

impl From<TypeTag> for u8 {
    fn from(tag: TypeTag) -> Self {
        tag as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_ordered_by_discriminant() {
        for (i, tag) in TypeTag::ALL.iter().enumerate() {
            assert_eq!(*tag as usize, i);
            assert_eq!(TypeTag::try_from(i as u8).unwrap(), *tag);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = TypeTag::try_from(22).unwrap_err();
        assert!(matches!(err, SerializerError::InvalidTag { tag: 22 }));
        assert!(TypeTag::try_from(0xFF).is_err());
    }
}
