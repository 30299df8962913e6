//! Модуль для сжатия полезной нагрузки фрейма с помощью gzip.
//!
//! Сжимается весь буфер целиком одним gzip-потоком; распаковка
//! выполняется потоково через [`GzDecoder`](flate2::read::GzDecoder).

use std::io::{self, Write};

use flate2::{write::GzEncoder, Compression};

/// Проверяет, стоит ли сжимать блок данных заданного размера.
///
/// # Аргументы
///
/// * `size`: длина блока данных в байтах.
/// * `min_size`: минимальный размер, с которого сжатие включается.
pub fn should_compress(
    size: usize,
    min_size: usize,
) -> bool {
    size >= min_size
}

/// Сжимает `data` в `out`, предварительно очищая его.
///
/// Буфер `out` переиспользуется между вызовами, поэтому его ёмкость
/// сохраняется.
pub fn compress_into(
    data: &[u8],
    out: &mut Vec<u8>,
) -> io::Result<()> {
    out.clear();
    let mut encoder = GzEncoder::new(out, Compression::default());
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;

    #[test]
    fn test_should_compress_threshold() {
        assert!(!should_compress(0, 64));
        assert!(!should_compress(63, 64));
        assert!(should_compress(64, 64));
        assert!(should_compress(0, 0));
    }

    /// Буфер очищается перед каждой записью.
    #[test]
    fn test_compress_into_reuses_buffer() {
        let mut buf = b"stale".to_vec();
        compress_into(b"abcabcabc", &mut buf).unwrap();
        assert_eq!(&buf[..2], &[0x1F, 0x8B]);

        let mut out = Vec::new();
        GzDecoder::new(buf.as_slice()).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcabcabc");
    }
}
