//! Zig-zag and base-128 variable-length integers.

use std::io::{Read, Write};

use crate::error::{classify_read_error, DecodeError, Result};

/// Longest encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Maps signed to unsigned so small magnitudes get short encodings.
pub fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Encodes `n` into `buf`, returning the number of bytes used.
pub fn encode_long(n: i64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut z = zigzag(n);
    let mut i = 0;
    while z >= 0x80 {
        buf[i] = (z as u8 & 0x7f) | 0x80;
        z >>= 7;
        i += 1;
    }
    buf[i] = z as u8;
    i + 1
}

pub fn write_long<W: Write + ?Sized>(out: &mut W, n: i64) -> Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_long(n, &mut buf);
    out.write_all(&buf[..len])?;
    Ok(())
}

/// Reads one zig-zag varint.
pub fn read_long<R: Read + ?Sized>(input: &mut R) -> Result<i64> {
    let mut value: u64 = 0;
    let mut byte = [0u8; 1];
    for i in 0..MAX_VARINT_LEN {
        input
            .read_exact(&mut byte)
            .map_err(|e| classify_read_error(e, "varint"))?;
        let b = byte[0];
        // The tenth byte may only contribute the top bit.
        if i == MAX_VARINT_LEN - 1 && b > 0x01 {
            return Err(DecodeError::VarintOverflow.into());
        }
        value |= ((b & 0x7f) as u64) << (7 * i);
        if b & 0x80 == 0 {
            return Ok(unzigzag(value));
        }
    }
    Err(DecodeError::VarintOverflow.into())
}

/// Reads a varint that must fit in an i32.
pub fn read_int<R: Read + ?Sized>(input: &mut R) -> Result<i32> {
    let n = read_long(input)?;
    i32::try_from(n).map_err(|_| DecodeError::IntOutOfRange(n).into())
}
