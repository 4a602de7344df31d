//! Byte-Channel Primitives
//!
//! Checked reads over a sequential byte channel. Events serialize through
//! the [`bytes`] traits; a short or inconsistent buffer surfaces as
//! [`EvhubError::MalformedParcel`](crate::EvhubError::MalformedParcel)
//! instead of a panic.

use crate::error::{EvhubError, Result};
use bytes::Buf;

fn ensure(buf: &impl Buf, needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(EvhubError::MalformedParcel(format!(
            "need {needed} bytes for {what}, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

pub(crate) fn read_u8(buf: &mut impl Buf, what: &str) -> Result<u8> {
    ensure(buf, 1, what)?;
    Ok(buf.get_u8())
}

pub(crate) fn read_u32(buf: &mut impl Buf, what: &str) -> Result<u32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32())
}

pub(crate) fn read_i32(buf: &mut impl Buf, what: &str) -> Result<i32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_i32())
}

pub(crate) fn read_u64(buf: &mut impl Buf, what: &str) -> Result<u64> {
    ensure(buf, 8, what)?;
    Ok(buf.get_u64())
}

pub(crate) fn read_i64(buf: &mut impl Buf, what: &str) -> Result<i64> {
    ensure(buf, 8, what)?;
    Ok(buf.get_i64())
}

pub(crate) fn read_f32(buf: &mut impl Buf, what: &str) -> Result<f32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_f32())
}

pub(crate) fn read_bool(buf: &mut impl Buf, what: &str) -> Result<bool> {
    Ok(read_u8(buf, what)? != 0)
}

pub(crate) fn read_array<const N: usize>(buf: &mut impl Buf, what: &str) -> Result<[u8; N]> {
    ensure(buf, N, what)?;
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_buffer_is_an_error() {
        let data = [0u8; 3];
        let mut buf = &data[..];
        assert!(read_u32(&mut buf, "test").is_err());
        assert!(read_u8(&mut buf, "test").is_ok());
    }

    #[test]
    fn test_array_read() {
        let data = [1u8, 2, 3, 4];
        let mut buf = &data[..];
        let arr: [u8; 4] = read_array(&mut buf, "test").unwrap();
        assert_eq!(arr, [1, 2, 3, 4]);
    }
}
