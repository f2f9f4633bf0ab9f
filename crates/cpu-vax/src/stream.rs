//! Instruction-stream prefetch buffer.
//!
//! Instruction length is unknown until every operand specifier has been
//! parsed, so bytes are fetched ahead into a small buffer. The buffer is
//! emptied at the start of every instruction and after every memory write.
//!
//! A refill only has to succeed for the bytes actually requested. Bytes
//! past those are speculative: a fault there ends the refill early rather
//! than faulting an instruction that never uses them. Host failures are
//! reported regardless.

use emu_core::{Bus, BusFault, Size};

/// Prefetch depth in bytes.
pub const PREFETCH_BYTES: usize = 16;

#[derive(Debug, Clone)]
pub(crate) struct InstructionStream {
    buf: [u8; PREFETCH_BYTES],
    /// Address of `buf[0]`.
    base: u32,
    /// Number of valid bytes.
    len: usize,
}

impl InstructionStream {
    pub(crate) const fn new() -> Self {
        Self {
            buf: [0; PREFETCH_BYTES],
            base: 0,
            len: 0,
        }
    }

    /// Drop everything buffered.
    pub(crate) fn reset(&mut self) {
        self.len = 0;
    }

    /// Read `size` bytes of instruction stream at `pc`, zero-extended.
    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B, pc: u32, size: Size) -> Result<u32, BusFault> {
        let needed = size.bytes() as usize;
        if !self.holds(pc, needed) {
            self.refill(bus, pc, needed)?;
        }
        let start = pc.wrapping_sub(self.base) as usize;
        let value = self.buf[start..start + needed]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        Ok(value)
    }

    fn holds(&self, pc: u32, needed: usize) -> bool {
        let offset = pc.wrapping_sub(self.base) as usize;
        self.len > 0 && offset < self.len && offset + needed <= self.len
    }

    fn refill<B: Bus>(&mut self, bus: &mut B, pc: u32, needed: usize) -> Result<(), BusFault> {
        self.base = pc;
        self.len = 0;
        for i in 0..PREFETCH_BYTES {
            match bus.read(pc.wrapping_add(i as u32), Size::Byte) {
                Ok(byte) => {
                    self.buf[i] = byte as u8;
                    self.len = i + 1;
                }
                Err(fault @ BusFault::Host(_)) => {
                    self.len = 0;
                    return Err(fault);
                }
                Err(fault) if i < needed => {
                    self.len = 0;
                    return Err(fault);
                }
                Err(_) => break,
            }
        }
        Ok(())
    }
}
