//! RIFF/WAV packaging for raw 16-bit little-endian PCM windows.
//!
//! Windows are concatenated client chunks with no header of their own, so
//! services that sniff the container need one wrapped around them.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;

/// Wrap `pcm` (PCM16LE, interleaved) in a canonical 44-byte WAV header.
///
/// An odd trailing byte cannot form a sample and is dropped.
pub fn wrap_pcm16(pcm: &[u8], sample_rate: u32, channels: u16) -> io::Result<Vec<u8>> {
    if sample_rate == 0 || channels == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "sample rate and channel count must be non-zero",
        ));
    }

    let data = &pcm[..pcm.len() - pcm.len() % 2];
    let data_len = u32::try_from(data.len())
        .ok()
        .filter(|len| len.checked_add(36).is_some())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "window too large for WAV"))?;
    let block_align = channels
        .checked_mul(BITS_PER_SAMPLE / 8)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "too many channels for WAV"))?;
    let byte_rate = sample_rate
        .checked_mul(u32::from(block_align))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "sample rate too high for WAV"))?;

    let mut out = Vec::with_capacity(HEADER_LEN + data.len());
    out.write_all(b"RIFF")?;
    out.write_u32::<LittleEndian>(36 + data_len)?;
    out.write_all(b"WAVE")?;

    out.write_all(b"fmt ")?;
    out.write_u32::<LittleEndian>(16)?;
    out.write_u16::<LittleEndian>(1)?; // PCM
    out.write_u16::<LittleEndian>(channels)?;
    out.write_u32::<LittleEndian>(sample_rate)?;
    out.write_u32::<LittleEndian>(byte_rate)?;
    out.write_u16::<LittleEndian>(block_align)?;
    out.write_u16::<LittleEndian>(BITS_PER_SAMPLE)?;

    out.write_all(b"data")?;
    out.write_u32::<LittleEndian>(data_len)?;
    out.write_all(data)?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    #[test]
    fn test_header_describes_mono_16khz() {
        let pcm = vec![0u8; 32_000];
        let wav = wrap_pcm16(&pcm, 16_000, 1).unwrap();

        assert_eq!(wav.len(), HEADER_LEN + pcm.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[36..40], b"data");

        let mut cursor = Cursor::new(&wav[22..36]);
        assert_eq!(cursor.read_u16::<LittleEndian>().unwrap(), 1);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 16_000);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 32_000);
        assert_eq!(cursor.read_u16::<LittleEndian>().unwrap(), 2);
        assert_eq!(cursor.read_u16::<LittleEndian>().unwrap(), 16);
    }

    #[test]
    fn test_odd_trailing_byte_is_dropped() {
        let wav = wrap_pcm16(&[1, 2, 3], 8_000, 1).unwrap();
        assert_eq!(&wav[HEADER_LEN..], &[1, 2]);

        let mut cursor = Cursor::new(&wav[40..44]);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 2);
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        assert!(wrap_pcm16(&[0, 0], 0, 1).is_err());
    }

    #[test]
    fn test_oversized_format_is_rejected_not_wrapped() {
        let err = wrap_pcm16(&[0, 0], 3_000_000_000, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = wrap_pcm16(&[0, 0], 16_000, u16::MAX).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
