//! Кодирование целых переменной длины (в стиле LEB128).
//!
//! Используется для индексов таблицы типов, длин коллекций и длин строк:
//! - 0-127: 1 байт
//! - 128-16383: 2 байта
//! - до u32::MAX: 5 байт максимум

use std::io::{Read, Write};

use nvstore_error::{SerResult, SerializerError};

/// Максимальное кол-во байт для u32 в varint encoding (5 байт)
pub const MAX_VARINT_LEN: usize = 5;

/// Записывает u32 в varint формате и возвращает число записанных байт.
///
/// # Формат
/// - Каждый байт: 7 бит данных + 1 бит continuation
/// - MSB=1: есть ещё байты
/// - MSB=0: последний байт
///
/// # Пример
/// ```
/// use nvstore::serializer::varint::write_varint;
///
/// let mut buf = Vec::new();
/// write_varint(&mut buf, 128).unwrap();
/// assert_eq!(buf, vec![0x80, 0x01]);
/// ```
pub fn write_varint<W: Write + ?Sized>(
    w: &mut W,
    mut value: u32,
) -> SerResult<usize> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut len = 0;

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf[len] = byte;
        len += 1;
        if value == 0 {
            break;
        }
    }

    w.write_all(&buf[..len])?;
    Ok(len)
}

/// Читает u32 из varint формата.
///
/// # Ошибки
/// - `Io(UnexpectedEof)` если поток кончился раньше времени
/// - `VarintOverflow` если varint длиннее 5 байт или не влезает в u32
pub fn read_varint<R: Read + ?Sized>(r: &mut R) -> SerResult<u32> {
    let mut result: u32 = 0;

    for i in 0..MAX_VARINT_LEN {
        let mut buf = [0u8; 1];
        r.read_exact(&mut buf)?;
        let byte = buf[0];

        // В пятом байте допустимы только младшие 4 бита.
        if i == MAX_VARINT_LEN - 1 && byte & 0xF0 != 0 {
            return Err(SerializerError::VarintOverflow);
        }

        result |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }

    Err(SerializerError::VarintOverflow)
}

/// Записывает длину коллекции, отклоняя значения больше `u32::MAX`.
pub fn write_len<W: Write + ?Sized>(
    w: &mut W,
    len: usize,
) -> SerResult<usize> {
    let len = u32::try_from(len).map_err(|_| {
        SerializerError::invalid_data(format!("length {len} does not fit into u32"))
    })?;
    write_varint(w, len)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        for value in [0, 1, 127, 128, 255, 16383, 16384, 1_000_000, u32::MAX] {
            let mut buf = Vec::new();
            let written = write_varint(&mut buf, value).unwrap();

            let mut cursor = Cursor::new(&buf);
            let decoded = read_varint(&mut cursor).unwrap();

            assert_eq!(decoded, value, "Roundtrip failed for {value}");
            assert_eq!(written, buf.len());
        }
    }

    #[test]
    fn test_known_encodings() {
        // 300 => 0xAC, 0x02
        let mut buf = Vec::new();
        write_varint(&mut buf, 300).unwrap();
        assert_eq!(buf, vec![0xAC, 0x02]);

        let mut buf = Vec::new();
        write_varint(&mut buf, u32::MAX).unwrap();
        assert_eq!(buf, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_varint_invalid_long() {
        // 6 байт с continuation bits (невалидно)
        let mut cursor = Cursor::new(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        let err = read_varint(&mut cursor).unwrap_err();
        assert!(matches!(err, SerializerError::VarintOverflow));
    }

    #[test]
    fn test_varint_fifth_byte_overflow() {
        let mut cursor = Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x1F]);
        assert!(matches!(
            read_varint(&mut cursor).unwrap_err(),
            SerializerError::VarintOverflow
        ));
    }

    #[test]
    fn test_varint_unexpected_eof() {
        for case in [vec![0x80], vec![0x80, 0x80], vec![0x80, 0x80, 0x80, 0x80]] {
            let mut cursor = Cursor::new(case);
            match read_varint(&mut cursor).unwrap_err() {
                SerializerError::Io(e) => {
                    assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
                }
                other => panic!("expected EOF, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_read_leaves_extra_bytes() {
        let mut cursor = Cursor::new(vec![0xAC, 0x02, 0x42]);
        assert_eq!(read_varint(&mut cursor).unwrap(), 300);

        let mut next = [0u8; 1];
        cursor.read_exact(&mut next).unwrap();
        assert_eq!(next[0], 0x42);
    }

    #[test]
    fn test_write_len() {
        let mut buf = Vec::new();
        assert_eq!(write_len(&mut buf, 3).unwrap(), 1);
        assert_eq!(buf, vec![3]);
    }
}
