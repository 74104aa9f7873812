//! Primitive encoders shared by the artifact writer, the artifact reader and the
//! translation table: little-endian scalars, 7-bit variable-length integers and
//! length-prefixed UTF-8 strings.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    let mut bytes = [0; 4];
    LittleEndian::write_u32(&mut bytes, value);
    out.extend_from_slice(&bytes);
}

pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    let mut bytes = [0; 4];
    LittleEndian::write_i32(&mut bytes, value);
    out.extend_from_slice(&bytes);
}

pub fn write_f32(out: &mut Vec<u8>, value: f32) {
    let mut bytes = [0; 4];
    LittleEndian::write_f32(&mut bytes, value);
    out.extend_from_slice(&bytes);
}

/// Low seven bits first, high bit set on every byte but the last.
pub fn write_7bit(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn write_string(out: &mut Vec<u8>, value: &str) {
    write_7bit(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

/// Forward-only cursor over an encoded buffer.
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn read_bytes(&mut self, length: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        if self.remaining() < length {
            return Err(FormatError::Truncated(what));
        }
        let bytes = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8, FormatError> {
        Ok(self.read_bytes(1, what)?[0])
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        Ok(LittleEndian::read_u32(self.read_bytes(4, what)?))
    }

    pub fn read_i32(&mut self, what: &'static str) -> Result<i32, FormatError> {
        Ok(LittleEndian::read_i32(self.read_bytes(4, what)?))
    }

    pub fn read_f32(&mut self, what: &'static str) -> Result<f32, FormatError> {
        Ok(LittleEndian::read_f32(self.read_bytes(4, what)?))
    }

    pub fn read_7bit(&mut self, what: &'static str) -> Result<u32, FormatError> {
        let start = self.offset;
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8(what)?;
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FormatError::InvalidVarint(start))
    }

    pub fn read_string(&mut self, what: &'static str) -> Result<String, FormatError> {
        let length = self.read_7bit(what)? as usize;
        let start = self.offset;
        let bytes = self.read_bytes(length, what)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| FormatError::InvalidUtf8(start))
    }
}
