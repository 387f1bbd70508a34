//! Low-level wire helpers
//!
//! Solana encodes lengths as "compact-u16": seven bits per byte,
//! little-endian, high bit set on every byte but the last, at most
//! three bytes.

use thiserror::Error;

/// Errors produced while encoding or decoding chain data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unexpected end of input: needed {needed} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("Invalid compact-u16 length at offset {0}")]
    InvalidLength(usize),
    #[error("Unsupported message version: {0}")]
    UnsupportedVersion(u8),
    #[error("Trailing bytes after transaction: {0}")]
    TrailingBytes(usize),
    #[error("Invalid message header: {0}")]
    InvalidHeader(String),
    #[error("Invalid public key: {0}")]
    InvalidPubkey(String),
    #[error("Invalid seeds: {0}")]
    InvalidSeeds(String),
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),
    #[error("Too many items for compact-u16: {0}")]
    TooLong(usize),
}

/// Append a compact-u16 length
pub fn encode_length(out: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    if len > u16::MAX as usize {
        return Err(CodecError::TooLong(len));
    }
    let mut rem = len as u16;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Cursor over an encoded buffer
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn peek_u8(&self) -> Result<u8, CodecError> {
        self.data
            .get(self.offset)
            .copied()
            .ok_or(CodecError::UnexpectedEof {
                offset: self.offset,
                needed: 1,
            })
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let byte = self.peek_u8()?;
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
                needed: len,
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a compact-u16 length
    pub fn read_length(&mut self) -> Result<usize, CodecError> {
        let start = self.offset;
        let mut value: u32 = 0;
        for i in 0..3 {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7f) as u32) << (i * 7);
            if byte & 0x80 == 0 {
                // reject non-minimal encodings and overflow
                if (i > 0 && byte == 0) || value > u16::MAX as u32 {
                    return Err(CodecError::InvalidLength(start));
                }
                return Ok(value as usize);
            }
        }
        Err(CodecError::InvalidLength(start))
    }
}
