//! Memory collaborator interface.
//!
//! The core issues byte, word and longword accesses against a flat 32-bit
//! virtual address space. Translation (if any) happens on the far side of
//! this trait; the bus reports a failed translation as a [`BusFault`] and
//! the core turns it into an architectural exception.

use thiserror::Error;

/// Access width for a single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Size {
    Byte,
    Word,
    Long,
}

impl Size {
    /// Width in bytes (1, 2 or 4).
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 4,
        }
    }

    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Mask covering the low `bits()` bits.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Long => 0xFFFF_FFFF,
        }
    }

    /// The sign bit at this width.
    #[must_use]
    pub const fn sign_bit(self) -> u32 {
        match self {
            Self::Byte => 0x80,
            Self::Word => 0x8000,
            Self::Long => 0x8000_0000,
        }
    }

    /// Sign-extend a value of this width to 32 bits.
    #[must_use]
    pub const fn sign_extend(self, value: u32) -> u32 {
        match self {
            Self::Byte => value as u8 as i8 as i32 as u32,
            Self::Word => value as u16 as i16 as i32 as u32,
            Self::Long => value,
        }
    }
}

/// A failure on the host side of the bus, unrelated to the emulated ISA.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host memory failure at {addr:#010x}: {reason}")]
pub struct HostError {
    pub addr: u32,
    pub reason: String,
}

impl HostError {
    #[must_use]
    pub fn new(addr: u32, reason: impl Into<String>) -> Self {
        Self {
            addr,
            reason: reason.into(),
        }
    }
}

/// Why a bus transaction did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusFault {
    /// The address is not accessible (protection or no backing store).
    #[error("access violation at {addr:#010x} (write: {write})")]
    AccessViolation { addr: u32, write: bool },
    /// The address has no valid translation.
    #[error("translation not valid at {addr:#010x} (write: {write})")]
    TranslationNotValid { addr: u32, write: bool },
    /// The host itself failed; not recoverable by the emulated program.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Memory collaborator consumed by a CPU core.
///
/// Multi-byte values are little-endian. Unaligned accesses are allowed.
pub trait Bus {
    /// Read `size` bytes at `addr`, zero-extended to 32 bits.
    fn read(&mut self, addr: u32, size: Size) -> Result<u32, BusFault>;

    /// Write the low `size` bytes of `value` at `addr`.
    fn write(&mut self, addr: u32, size: Size, value: u32) -> Result<(), BusFault>;
}

/// Flat byte-addressed memory starting at address zero.
///
/// Anything at or beyond `len()` reports an access violation.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    /// Allocate `size` bytes of zeroed memory.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Size of the backing store in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy `bytes` into memory at `addr`. Bytes past the end are dropped.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        let start = addr as usize;
        if start >= self.data.len() {
            return;
        }
        let end = (start + bytes.len()).min(self.data.len());
        self.data[start..end].copy_from_slice(&bytes[..end - start]);
    }

    /// Read a byte without going through the bus. Out of range reads as 0.
    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        self.data.get(addr as usize).copied().unwrap_or(0)
    }

    /// Read a little-endian longword without going through the bus.
    #[must_use]
    pub fn peek_long(&self, addr: u32) -> u32 {
        u32::from_le_bytes([
            self.peek(addr),
            self.peek(addr.wrapping_add(1)),
            self.peek(addr.wrapping_add(2)),
            self.peek(addr.wrapping_add(3)),
        ])
    }

    /// Write a byte without going through the bus. Out of range is ignored.
    pub fn poke(&mut self, addr: u32, value: u8) {
        if let Some(slot) = self.data.get_mut(addr as usize) {
            *slot = value;
        }
    }

    /// Write a little-endian longword without going through the bus.
    pub fn poke_long(&mut self, addr: u32, value: u32) {
        self.load(addr, &value.to_le_bytes());
    }

    fn range(&self, addr: u32, size: Size, write: bool) -> Result<usize, BusFault> {
        let start = addr as usize;
        let end = start + size.bytes() as usize;
        if end > self.data.len() {
            return Err(BusFault::AccessViolation { addr, write });
        }
        Ok(start)
    }
}

impl Bus for FlatMemory {
    fn read(&mut self, addr: u32, size: Size) -> Result<u32, BusFault> {
        let start = self.range(addr, size, false)?;
        let mut value = 0u32;
        for i in (0..size.bytes() as usize).rev() {
            value = (value << 8) | u32::from(self.data[start + i]);
        }
        Ok(value)
    }

    fn write(&mut self, addr: u32, size: Size, value: u32) -> Result<(), BusFault> {
        let start = self.range(addr, size, true)?;
        for i in 0..size.bytes() as usize {
            self.data[start + i] = (value >> (i * 8)) as u8;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_memory_is_little_endian() {
        let mut mem = FlatMemory::new(16);
        mem.write(4, Size::Long, 0x1234_5678).expect("in range");
        assert_eq!(mem.peek(4), 0x78);
        assert_eq!(mem.peek(7), 0x12);
        assert_eq!(mem.read(4, Size::Word), Ok(0x5678));
        assert_eq!(mem.read(6, Size::Byte), Ok(0x34));
    }

    #[test]
    fn flat_memory_faults_past_end() {
        let mut mem = FlatMemory::new(16);
        assert_eq!(
            mem.read(14, Size::Long),
            Err(BusFault::AccessViolation {
                addr: 14,
                write: false
            })
        );
        assert_eq!(
            mem.write(16, Size::Byte, 0),
            Err(BusFault::AccessViolation {
                addr: 16,
                write: true
            })
        );
    }

    #[test]
    fn sign_extend_by_width() {
        assert_eq!(Size::Byte.sign_extend(0x80), 0xFFFF_FF80);
        assert_eq!(Size::Word.sign_extend(0x7FFF), 0x7FFF);
        assert_eq!(Size::Word.sign_extend(0x8000), 0xFFFF_8000);
    }
}
