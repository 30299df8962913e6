use std::io::{self, Read, Write};

use byteorder::ReadBytesExt;
use flate2::read::GzDecoder;
use nvstore_error::{FrameError, FrameResult};
use tracing::trace;

use super::compression::compress_into;

/// Данные следуют без изменений.
pub const FLAG_RAW: u8 = 0;
/// Данные записаны одним потоком gzip.
pub const FLAG_GZIP: u8 = 1;

/// Пишет фреймы `[flag][payload][zeros]`, длина которых кратна размеру
/// блока.
///
/// Держит буфер нулей, который растёт до наибольшего встреченного порога
/// и никогда не уменьшается, а также буфер для вывода gzip.
#[derive(Debug, Default)]
pub struct Padder {
    scratch: Vec<u8>,
    compress_buf: Vec<u8>,
}

impl Padder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Текущий размер буфера нулей.
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// Записывает фрейм с `data` в `target` и возвращает число записанных байт,
    /// всегда кратное `pad_threshold`.
    pub fn pad<W: Write + ?Sized>(
        &mut self,
        data: &[u8],
        target: &mut W,
        compressed: bool,
        pad_threshold: usize,
    ) -> FrameResult<usize> {
        if pad_threshold == 0 {
            return Err(FrameError::InvalidPadThreshold);
        }

        let payload = if compressed {
            compress_into(data, &mut self.compress_buf)?;
            self.compress_buf.as_slice()
        } else {
            data
        };

        target.write_all(&[if compressed { FLAG_GZIP } else { FLAG_RAW }])?;
        target.write_all(payload)?;

        let written = 1 + payload.len();
        let padding = (pad_threshold - written % pad_threshold) % pad_threshold;
        if self.scratch.len() < pad_threshold {
            self.scratch.resize(pad_threshold, 0);
        }
        target.write_all(&self.scratch[..padding])?;

        trace!(
            raw = data.len(),
            payload = payload.len(),
            padding,
            compressed,
            "padded frame"
        );
        Ok(written + padding)
    }
}

/// Читатель данных без выравнивания. Хвостовые нули в режиме raw
/// отдаются как есть, после конца потока gzip игнорируются.
pub enum Unpadded<R: Read> {
    Raw(R),
    Gzip(GzDecoder<R>),
}

impl<R: Read> Unpadded<R> {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Unpadded::Gzip(_))
    }
}

impl<R: Read> Read for Unpadded<R> {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> io::Result<usize> {
        match self {
            Unpadded::Raw(r) => r.read(buf),
            Unpadded::Gzip(r) => r.read(buf),
        }
    }
}

/// Читает байт флага фрейма, записанного [`Padder::pad`].
pub fn unpad<R: Read>(mut input: R) -> FrameResult<Unpadded<R>> {
    let flag = match input.read_u8() {
        Ok(flag) => flag,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(FrameError::Truncated),
        Err(e) => return Err(e.into()),
    };
    match flag {
        FLAG_RAW => Ok(Unpadded::Raw(input)),
        FLAG_GZIP => Ok(Unpadded::Gzip(GzDecoder::new(input))),
        flag => Err(FrameError::InvalidFlag { flag }),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const N: usize = 16;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(N - 1)]
    #[case(N)]
    #[case(N + 1)]
    #[case(10 * N + 3)]
    fn test_raw_pad_is_exact(#[case] len: usize) {
        let data = payload(len);
        let mut out = Vec::new();
        let written = Padder::new().pad(&data, &mut out, false, N).unwrap();

        assert_eq!(written, out.len());
        assert_eq!(out.len() % N, 0);
        assert_eq!(out.len(), (1 + len).div_ceil(N) * N);
        assert_eq!(out[0], FLAG_RAW);

        let mut back = Vec::new();
        unpad(out.as_slice()).unwrap().read_to_end(&mut back).unwrap();
        assert_eq!(&back[..len], data.as_slice());
        assert!(back[len..].iter().all(|&b| b == 0));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(N - 1)]
    #[case(N)]
    #[case(N + 1)]
    #[case(4096)]
    fn test_gzip_pad_is_exact(#[case] len: usize) {
        let data = payload(len);
        let mut out = Vec::new();
        let written = Padder::new().pad(&data, &mut out, true, N).unwrap();

        assert_eq!(written, out.len());
        assert_eq!(out.len() % N, 0);
        assert_eq!(out[0], FLAG_GZIP);

        let mut reader = unpad(out.as_slice()).unwrap();
        assert!(reader.is_compressed());
        let mut back = Vec::new();
        reader.read_to_end(&mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut out = Vec::new();
        let err = Padder::new().pad(b"x", &mut out, false, 0).unwrap_err();
        assert!(matches!(err, FrameError::InvalidPadThreshold));
        assert!(out.is_empty());
    }

    #[test]
    fn test_threshold_one_adds_no_padding() {
        let mut out = Vec::new();
        let written = Padder::new().pad(b"abc", &mut out, false, 1).unwrap();
        assert_eq!(written, 4);
        assert_eq!(out, vec![FLAG_RAW, b'a', b'b', b'c']);
    }

    #[test]
    fn test_scratch_grows_and_never_shrinks() {
        let mut padder = Padder::new();
        let mut sink = Vec::new();
        padder.pad(b"a", &mut sink, false, 64).unwrap();
        assert_eq!(padder.scratch_len(), 64);
        padder.pad(b"a", &mut sink, false, 8).unwrap();
        assert_eq!(padder.scratch_len(), 64);
        padder.pad(b"a", &mut sink, false, 256).unwrap();
        assert_eq!(padder.scratch_len(), 256);
    }

    #[test]
    fn test_unpad_errors() {
        assert!(matches!(unpad(&[0u8; 0][..]), Err(FrameError::Truncated)));
        assert!(matches!(
            unpad(&[7u8, 0, 0][..]),
            Err(FrameError::InvalidFlag { flag: 7 })
        ));
    }
}
