//! Scalar line codec.
//!
//! Streams carry one ASCII value per line. Floats are written with six
//! fractional digits, integers as plain decimal. The reader is forgiving:
//! it strips whitespace, `\r` and NUL bytes, keeps at most [`MAX_LINE`]
//! bytes of a line (the rest is skipped up to the newline so the stream
//! stays aligned), and decodes anything unparsable as `0.0`.

use core::fmt::{self, Write as _};

use crate::error::StoreError;
use crate::store::{ByteSink, ByteSource};

/// Bytes of a line kept by the reader. Every line the writer produces fits,
/// including `-f32::MAX` at six fractional digits (48 bytes).
pub const MAX_LINE: usize = 64;

/// Stack buffer for one formatted line.
struct LineBuf {
    bytes: [u8; MAX_LINE],
    len: usize,
}

impl LineBuf {
    const fn new() -> Self {
        Self {
            bytes: [0; MAX_LINE],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.bytes.len() {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Append `value` as a `{:.6}` line.
pub fn write_f32<K: ByteSink + ?Sized>(sink: &mut K, value: f32) -> Result<(), StoreError> {
    let mut line = LineBuf::new();
    let _ = write!(line, "{value:.6}\n");
    sink.write_bytes(line.as_bytes())
}

/// Append `value` as a decimal integer line.
pub fn write_int<K: ByteSink + ?Sized>(sink: &mut K, value: i64) -> Result<(), StoreError> {
    let mut line = LineBuf::new();
    let _ = write!(line, "{value}\n");
    sink.write_bytes(line.as_bytes())
}

/// Read one raw line into `buf`.
///
/// Returns the number of bytes stored, or `None` if the stream was already at
/// its end. Bytes beyond `buf.len()` are discarded up to the newline.
pub fn read_line<R: ByteSource + ?Sized>(
    source: &mut R,
    buf: &mut [u8],
) -> Result<Option<usize>, StoreError> {
    let mut len = 0;
    let mut seen_any = false;
    let mut truncated = false;
    while let Some(byte) = source.read_byte()? {
        seen_any = true;
        if byte == b'\n' {
            break;
        }
        if len < buf.len() {
            buf[len] = byte;
            len += 1;
        } else {
            truncated = true;
        }
    }
    if !seen_any {
        return Ok(None);
    }
    if truncated {
        log::warn!("line longer than {} bytes truncated", buf.len());
    }
    Ok(Some(len))
}

fn is_padding(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == 0
}

/// Read the next value. `Ok(None)` means end of stream.
pub fn read_f32<R: ByteSource + ?Sized>(source: &mut R) -> Result<Option<f32>, StoreError> {
    let mut buf = [0u8; MAX_LINE];
    let Some(len) = read_line(source, &mut buf)? else {
        return Ok(None);
    };
    Ok(Some(parse_token(&buf[..len])))
}

/// Read the next value as a byte, rounding and saturating to `0..=255`.
pub fn read_u8<R: ByteSource + ?Sized>(source: &mut R) -> Result<Option<u8>, StoreError> {
    Ok(read_f32(source)?.map(|v| {
        let r = libm::roundf(v);
        if r.is_nan() || r <= 0.0 {
            0
        } else if r >= 255.0 {
            255
        } else {
            r as u8
        }
    }))
}

/// Decode one token. Empty tokens are `0.0`; a token with trailing garbage
/// keeps its longest numeric prefix.
pub fn parse_token(raw: &[u8]) -> f32 {
    let start = raw.iter().position(|&b| !is_padding(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|&b| !is_padding(b)).map_or(start, |i| i + 1);
    let token = &raw[start..end];
    if token.is_empty() {
        return 0.0;
    }
    if let Some(v) = core::str::from_utf8(token).ok().and_then(|s| s.parse::<f32>().ok()) {
        return v;
    }
    let prefix = &token[..numeric_prefix(token)];
    match core::str::from_utf8(prefix).ok().and_then(|s| s.parse::<f32>().ok()) {
        Some(v) => {
            log::warn!("token {:?} decoded from its numeric prefix", EscapedToken(token));
            v
        }
        None => {
            log::warn!("unparsable token {:?} decoded as 0", EscapedToken(token));
            0.0
        }
    }
}

/// Length of the longest `[+-]digits[.digits][e[+-]digits]` prefix.
fn numeric_prefix(token: &[u8]) -> usize {
    let digits = |from: usize| {
        token[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let mut i = 0;
    if matches!(token.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_digits = digits(i);
    i += int_digits;
    let mut frac_digits = 0;
    if token.get(i) == Some(&b'.') {
        frac_digits = digits(i + 1);
        i += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }
    if matches!(token.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(token.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = digits(j);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }
    i
}

struct EscapedToken<'t>(&'t [u8]);

impl fmt::Debug for EscapedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for &b in self.0 {
            for c in core::ascii::escape_default(b) {
                f.write_char(c as char)?;
            }
        }
        f.write_char('"')
    }
}

/// Encode a whole vector.
#[cfg(feature = "alloc")]
pub fn encode_values(values: &[f32]) -> alloc::vec::Vec<u8> {
    let mut out = alloc::vec::Vec::with_capacity(values.len() * 10);
    for &v in values {
        let _ = write_f32(&mut out, v);
    }
    out
}

/// Decode every line of `bytes`.
#[cfg(feature = "alloc")]
pub fn decode_values(bytes: &[u8]) -> alloc::vec::Vec<f32> {
    let mut cursor = crate::store::ByteCursor::new(bytes);
    let mut out = alloc::vec::Vec::new();
    // ByteCursor never fails.
    while let Ok(Some(v)) = read_f32(&mut cursor) {
        out.push(v);
    }
    out
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::store::ByteCursor;

    fn read_all(bytes: &[u8]) -> Vec<f32> {
        let mut cursor = ByteCursor::new(bytes);
        let mut out = Vec::new();
        while let Some(v) = read_f32(&mut cursor).unwrap() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_write_f32_six_digits() {
        let mut out = Vec::new();
        write_f32(&mut out, 1.5).unwrap();
        write_f32(&mut out, -0.25).unwrap();
        write_f32(&mut out, 3.0).unwrap();
        assert_eq!(out, b"1.500000\n-0.250000\n3.000000\n");
    }

    #[test]
    fn test_write_int_decimal() {
        let mut out = Vec::new();
        write_int(&mut out, 255).unwrap();
        write_int(&mut out, -7).unwrap();
        assert_eq!(out, b"255\n-7\n");
    }

    #[test]
    fn test_widest_values_round_trip() {
        let values = [f32::MAX, -f32::MAX, -3e35, 1e31, f32::MIN_POSITIVE];
        let mut out = Vec::new();
        for &v in &values {
            write_f32(&mut out, v).unwrap();
        }
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), values.len());
        assert!(out.split(|&b| b == b'\n').all(|line| line.len() < MAX_LINE));
        let back = read_all(&out);
        assert_eq!(&back[..4], &values[..4]);
        assert_eq!(back[4], 0.0);
    }

    #[test]
    fn test_read_strips_cr_nul_and_spaces() {
        let values = read_all(b"  1.25\r\n2.5\0\r\n\t-3\n");
        assert_eq!(values, [1.25, 2.5, -3.0]);
    }

    #[test]
    fn test_last_line_without_newline() {
        assert_eq!(read_all(b"4\n5"), [4.0, 5.0]);
    }

    #[test]
    fn test_empty_and_garbage_lines_are_zero() {
        assert_eq!(read_all(b"\nabc\n7\n"), [0.0, 0.0, 7.0]);
    }

    #[test]
    fn test_numeric_prefix_kept() {
        assert_eq!(parse_token(b"12.5xyz"), 12.5);
        assert_eq!(parse_token(b"-3e2abc"), -300.0);
        assert_eq!(parse_token(b"1e"), 1.0);
        assert_eq!(parse_token(b"."), 0.0);
    }

    #[test]
    fn test_long_line_discarded_to_newline() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"1.0");
        bytes.extend(core::iter::repeat(b'0').take(100));
        bytes.extend_from_slice(b"\n2\n");
        let values = read_all(&bytes);
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], 2.0);
    }

    #[test]
    fn test_eof_is_none() {
        let mut cursor = ByteCursor::new(b"");
        assert_eq!(read_f32(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_read_u8_saturates() {
        let mut cursor = ByteCursor::new(b"12\n300\n-4\n7.6\n");
        let bytes: Vec<u8> = core::iter::from_fn(|| read_u8(&mut cursor).unwrap()).collect();
        assert_eq!(bytes, [12, 255, 0, 8]);
    }

    #[test]
    fn test_encode_decode_vector() {
        let values = [0.5, -1.0, 2.75, 0.0];
        assert_eq!(decode_values(&encode_values(&values)), values);
    }
}
