//! VAX register file.
//!
//! - R0-R11: general registers
//! - R12 (AP): argument pointer
//! - R13 (FP): frame pointer
//! - R14 (SP): stack pointer for the current access mode
//! - R15 (PC): program counter
//! - PSL: processor status longword
//!
//! Each access mode has its own stack pointer. The active one lives in R14;
//! the others are parked in `sp_bank` and swapped on every mode change.

use emu_core::Size;

use crate::flags::{AccessMode, Status};

/// Argument pointer.
pub const AP: usize = 12;
/// Frame pointer.
pub const FP: usize = 13;
/// Stack pointer.
pub const SP: usize = 14;
/// Program counter.
pub const PC: usize = 15;

/// VAX register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// General registers R0-R15.
    pub r: [u32; 16],
    /// Processor status longword.
    pub psl: u32,
    /// Parked stack pointers, indexed by access mode. The slot for the
    /// current mode is stale while that mode is active.
    pub sp_bank: [u32; 4],
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Create registers in reset state: kernel mode, IPL 31.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            r: [0; 16],
            psl: Status::compose(AccessMode::Kernel, AccessMode::Kernel, 31, 0),
            sp_bank: [0; 4],
        }
    }

    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.r[PC]
    }

    pub fn set_pc(&mut self, value: u32) {
        self.r[PC] = value;
    }

    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.r[SP]
    }

    pub fn set_sp(&mut self, value: u32) {
        self.r[SP] = value;
    }

    #[must_use]
    pub const fn fp(&self) -> u32 {
        self.r[FP]
    }

    #[must_use]
    pub const fn ap(&self) -> u32 {
        self.r[AP]
    }

    /// Current access mode.
    #[must_use]
    pub const fn mode(&self) -> AccessMode {
        Status::cur_mode(self.psl)
    }

    /// Stack pointer belonging to `mode`, whether or not it is active.
    #[must_use]
    pub const fn stack_pointer(&self, mode: AccessMode) -> u32 {
        if mode as usize == self.mode() as usize {
            self.r[SP]
        } else {
            self.sp_bank[mode.index()]
        }
    }

    /// Set the stack pointer belonging to `mode`.
    pub fn set_stack_pointer(&mut self, mode: AccessMode, value: u32) {
        if mode == self.mode() {
            self.r[SP] = value;
        } else {
            self.sp_bank[mode.index()] = value;
        }
    }

    /// Park the active SP and load the one for `to`.
    ///
    /// Must run before the PSL mode field changes.
    pub fn switch_stack(&mut self, to: AccessMode) {
        let from = self.mode();
        if from != to {
            self.sp_bank[from.index()] = self.r[SP];
            self.r[SP] = self.sp_bank[to.index()];
        }
    }

    /// Read a register at the given width.
    #[must_use]
    pub const fn read_sized(&self, n: usize, size: Size) -> u32 {
        self.r[n] & size.mask()
    }

    /// Write a register at the given width, preserving the untouched bits.
    pub fn write_sized(&mut self, n: usize, value: u32, size: Size) {
        let mask = size.mask();
        self.r[n] = (self.r[n] & !mask) | (value & mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_write_preserves_upper_bits() {
        let mut regs = Registers::new();
        regs.r[3] = 0x1234_5678;
        regs.write_sized(3, 0xAB, Size::Byte);
        assert_eq!(regs.r[3], 0x1234_56AB);
        regs.write_sized(3, 0xFFFF_0001, Size::Word);
        assert_eq!(regs.r[3], 0x1234_0001);
    }

    #[test]
    fn switch_stack_parks_active_sp() {
        let mut regs = Registers::new();
        regs.r[SP] = 0x8000;
        regs.sp_bank[AccessMode::User.index()] = 0x4000;
        regs.switch_stack(AccessMode::User);
        assert_eq!(regs.sp(), 0x4000);
        assert_eq!(regs.sp_bank[AccessMode::Kernel.index()], 0x8000);
    }

    #[test]
    fn stack_pointer_reads_live_sp_for_current_mode() {
        let mut regs = Registers::new();
        regs.r[SP] = 0x7000;
        regs.sp_bank[0] = 0xDEAD;
        assert_eq!(regs.stack_pointer(AccessMode::Kernel), 0x7000);
        regs.set_stack_pointer(AccessMode::User, 0x3000);
        assert_eq!(regs.sp_bank[AccessMode::User.index()], 0x3000);
    }
}
