//! Packed little-endian instruction encoding
//!
//! Zero-copy cursor readers and writers over fixed-size payloads. Every wire
//! field is little-endian with no implicit padding.

use crate::error::PercolatorError;
use crate::types::{MakerClass, Side, TimeInForce};

/// Cursor reader over an instruction payload
pub struct InstructionReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> InstructionReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn read_u8(&mut self) -> Result<u8, PercolatorError> {
        if self.offset >= self.data.len() {
            return Err(PercolatorError::InvalidArgument);
        }
        let value = self.data[self.offset];
        self.offset += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, PercolatorError> {
        Ok(u16::from_le_bytes(self.read_bytes::<2>()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, PercolatorError> {
        Ok(u32::from_le_bytes(self.read_bytes::<4>()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, PercolatorError> {
        Ok(u64::from_le_bytes(self.read_bytes::<8>()?))
    }

    pub fn read_u128(&mut self) -> Result<u128, PercolatorError> {
        Ok(u128::from_le_bytes(self.read_bytes::<16>()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, PercolatorError> {
        Ok(i64::from_le_bytes(self.read_bytes::<8>()?))
    }

    pub fn read_i128(&mut self) -> Result<i128, PercolatorError> {
        Ok(i128::from_le_bytes(self.read_bytes::<16>()?))
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], PercolatorError> {
        if self.offset + N > self.data.len() {
            return Err(PercolatorError::InvalidArgument);
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        Ok(bytes)
    }

    pub fn read_side(&mut self) -> Result<Side, PercolatorError> {
        match self.read_u8()? {
            0 => Ok(Side::Buy),
            1 => Ok(Side::Sell),
            _ => Err(PercolatorError::InvalidArgument),
        }
    }

    pub fn read_tif(&mut self) -> Result<TimeInForce, PercolatorError> {
        match self.read_u8()? {
            0 => Ok(TimeInForce::GTC),
            1 => Ok(TimeInForce::IOC),
            2 => Ok(TimeInForce::FOK),
            _ => Err(PercolatorError::InvalidArgument),
        }
    }

    pub fn read_maker_class(&mut self) -> Result<MakerClass, PercolatorError> {
        match self.read_u8()? {
            0 => Ok(MakerClass::Regular),
            1 => Ok(MakerClass::Dlp),
            _ => Err(PercolatorError::InvalidArgument),
        }
    }
}

/// Cursor writer over a fixed-size result buffer
pub struct InstructionWriter<'a> {
    data: &'a mut [u8],
    offset: usize,
}

impl<'a> InstructionWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes written so far
    pub fn written(&self) -> usize {
        self.offset
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), PercolatorError> {
        if self.offset >= self.data.len() {
            return Err(PercolatorError::InvalidArgument);
        }
        self.data[self.offset] = value;
        self.offset += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), PercolatorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), PercolatorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), PercolatorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u128(&mut self, value: u128) -> Result<(), PercolatorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), PercolatorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i128(&mut self, value: i128) -> Result<(), PercolatorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), PercolatorError> {
        if self.offset + bytes.len() > self.data.len() {
            return Err(PercolatorError::InvalidArgument);
        }
        self.data[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
        Ok(())
    }
}
