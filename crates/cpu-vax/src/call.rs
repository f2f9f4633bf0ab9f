//! Procedure calls: CALLS, CALLG and RET.
//!
//! Frame built by CALLS/CALLG, lowest address first:
//!
//! ```text
//!   FP ->  0                      condition handler
//!          mask/PSW longword      spa<31:30> s<29> mask<27:16> psw<15:5>
//!          saved AP
//!          saved FP
//!          saved PC
//!          saved R0..R11          only those selected by the entry mask
//!          0-3 alignment bytes    spa
//!          numarg                 CALLS only; AP points here
//!          arguments
//! ```
//!
//! RET trusts the frame: if the callee has corrupted it, the restored state
//! is whatever the frame says.

use emu_core::{Bus, Size};

use crate::cpu::{Completion, Fault, Vax};
use crate::exceptions::Exception;
use crate::flags::{CC_MASK, DV, FU, IV, Status, T};
use crate::registers::{AP, FP};

/// Entry mask bits that must be zero.
const MASK_MBZ: u32 = 0x3000;
/// Entry mask bit enabling integer overflow traps.
const MASK_IV: u32 = 1 << 14;
/// Entry mask bit enabling decimal overflow traps.
const MASK_DV: u32 = 1 << 15;
/// Frame longword bit: the call came from CALLS.
const FRAME_CALLS: u32 = 1 << 29;
/// PSW bits saved in the frame.
const SAVED_PSW: u32 = 0xFFE0;

/// Where a procedure's argument list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgList {
    /// CALLS: `numarg` longwords already on the stack.
    Stack(u32),
    /// CALLG: argument list in memory.
    General(u32),
}

impl Vax {
    /// Build a call frame and enter the procedure at `target`.
    pub(crate) fn call<B: Bus>(&mut self, bus: &mut B, target: u32, args: ArgList) -> Result<Completion, Fault> {
        let mask = self.read(bus, target, Size::Word)?;
        if mask & MASK_MBZ != 0 {
            return Err(Exception::ReservedOperand.into());
        }

        let new_ap = match args {
            ArgList::Stack(numarg) => {
                self.push(bus, numarg)?;
                self.regs.sp()
            }
            ArgList::General(list) => list,
        };

        let spa = self.regs.sp() & 3;
        self.regs.set_sp(self.regs.sp() & !3);

        for n in (0..12).rev() {
            if mask & (1 << n) != 0 {
                self.push(bus, self.regs.r[n])?;
            }
        }
        self.push(bus, self.regs.pc())?;
        self.push(bus, self.regs.fp())?;
        self.push(bus, self.regs.ap())?;

        let calls = if matches!(args, ArgList::Stack(_)) { FRAME_CALLS } else { 0 };
        let frame = (spa << 30) | calls | ((mask & 0x0FFF) << 16) | (self.regs.psl & SAVED_PSW);
        self.push(bus, frame)?;
        self.push(bus, 0)?;

        self.regs.r[FP] = self.regs.sp();
        self.regs.r[AP] = new_ap;

        let mut psl = self.regs.psl & !(CC_MASK | IV | FU | DV);
        psl = Status::set_if(psl, IV, mask & MASK_IV != 0);
        psl = Status::set_if(psl, DV, mask & MASK_DV != 0);
        self.regs.psl = psl;
        self.regs.set_pc(target.wrapping_add(2));
        Ok(Completion::Next)
    }

    /// Tear down the frame at FP and return to the saved PC.
    pub(crate) fn ret<B: Bus>(&mut self, bus: &mut B) -> Result<Completion, Fault> {
        let mut sp = self.regs.fp().wrapping_add(4);
        let frame = self.read(bus, sp, Size::Long)?;
        if frame & 0xFF00 != 0 {
            return Err(Exception::ReservedOperand.into());
        }
        let ap = self.read(bus, sp.wrapping_add(4), Size::Long)?;
        let fp = self.read(bus, sp.wrapping_add(8), Size::Long)?;
        let pc = self.read(bus, sp.wrapping_add(12), Size::Long)?;
        sp = sp.wrapping_add(16);

        let mask = (frame >> 16) & 0x0FFF;
        let mut saved = self.regs.r;
        for (n, slot) in saved.iter_mut().enumerate().take(12) {
            if mask & (1 << n) != 0 {
                *slot = self.read(bus, sp, Size::Long)?;
                sp = sp.wrapping_add(4);
            }
        }

        sp = sp.wrapping_add(frame >> 30);
        if frame & FRAME_CALLS != 0 {
            let numarg = self.read(bus, sp, Size::Long)? & 0xFF;
            sp = sp.wrapping_add(4 + 4 * numarg);
        }

        self.regs.r[..12].copy_from_slice(&saved[..12]);
        self.regs.r[AP] = ap;
        self.regs.r[FP] = fp;
        self.regs.set_sp(sp);
        self.regs.set_pc(pc);
        self.regs.psl = (self.regs.psl & (0xFFFF_0000 | T)) | (frame & SAVED_PSW);
        Ok(Completion::Next)
    }
}

#[cfg(test)]
mod tests {
    use emu_core::FlatMemory;

    use super::*;
    use crate::flags::{AccessMode, C, N, TP, V, Z};

    const PROC: u32 = 0x200;

    fn cpu_with_stack(mem: &mut FlatMemory, mask: u16) -> Vax {
        mem.load(PROC, &mask.to_le_bytes());
        let mut cpu = Vax::new();
        cpu.regs.set_sp(0x1000);
        cpu.regs.set_pc(0x100);
        cpu
    }

    #[test]
    fn calls_frame_layout() {
        let mut mem = FlatMemory::new(0x2000);
        let mut cpu = cpu_with_stack(&mut mem, 0x0006);
        cpu.regs.r[1] = 0x11;
        cpu.regs.r[2] = 0x22;
        cpu.regs.r[AP] = 0xAAAA;
        cpu.regs.r[FP] = 0xFFFF;
        cpu.regs.psl |= N | Z | V | C;

        cpu.call(&mut mem, PROC, ArgList::Stack(0)).expect("call");

        // Handler, frame, AP, FP, PC, R1, R2, numarg from FP upwards.
        assert_eq!(cpu.regs.ap(), 0xFFC);
        assert_eq!(cpu.regs.fp(), 0xFE0);
        assert_eq!(cpu.regs.sp(), 0xFE0);
        assert_eq!(mem.peek_long(0xFE0), 0);
        assert_eq!(mem.peek_long(0xFE4), FRAME_CALLS | (0x0006 << 16));
        assert_eq!(mem.peek_long(0xFE8), 0xAAAA);
        assert_eq!(mem.peek_long(0xFEC), 0xFFFF);
        assert_eq!(mem.peek_long(0xFF0), 0x100);
        assert_eq!(mem.peek_long(0xFF4), 0x11);
        assert_eq!(mem.peek_long(0xFF8), 0x22);
        assert_eq!(mem.peek_long(0xFFC), 0);
        assert_eq!(cpu.regs.pc(), PROC + 2);
        assert_eq!(cpu.regs.psl & CC_MASK, 0);
    }

    #[test]
    fn ret_restores_registers_and_pops_arguments() {
        let mut mem = FlatMemory::new(0x2000);
        let mut cpu = cpu_with_stack(&mut mem, 0x0FFF);
        cpu.push(&mut mem, 7).expect("arg");
        let before = cpu.regs;

        cpu.call(&mut mem, PROC, ArgList::Stack(1)).expect("call");
        for n in 0..12 {
            cpu.regs.r[n] = 0xDEAD_0000 + n as u32;
        }
        cpu.ret(&mut mem).expect("ret");

        for n in 0..14 {
            assert_eq!(cpu.regs.r[n], before.r[n], "r{n}");
        }
        // The argument CALLS was given is gone too.
        assert_eq!(cpu.regs.sp(), 0x1000);
        assert_eq!(cpu.regs.pc(), 0x100);
    }

    #[test]
    fn unaligned_stack_is_realigned_and_restored() {
        let mut mem = FlatMemory::new(0x2000);
        let mut cpu = cpu_with_stack(&mut mem, 0);
        cpu.regs.set_sp(0x0FFE);
        cpu.call(&mut mem, PROC, ArgList::General(0x400)).expect("call");
        assert_eq!(cpu.regs.fp() & 3, 0);
        assert_eq!(cpu.regs.ap(), 0x400);
        cpu.ret(&mut mem).expect("ret");
        assert_eq!(cpu.regs.sp(), 0x0FFE);
    }

    #[test]
    fn entry_mask_sets_trap_enables() {
        let mut mem = FlatMemory::new(0x2000);
        let mut cpu = cpu_with_stack(&mut mem, 0x4000);
        cpu.call(&mut mem, PROC, ArgList::General(0)).expect("call");
        assert_ne!(cpu.regs.psl & IV, 0);
        assert_eq!(cpu.regs.psl & DV, 0);
        cpu.ret(&mut mem).expect("ret");
        assert_eq!(cpu.regs.psl & IV, 0);
    }

    #[test]
    fn reserved_mask_bits_fault() {
        let mut mem = FlatMemory::new(0x2000);
        let mut cpu = cpu_with_stack(&mut mem, 0x1000);
        assert_eq!(
            cpu.call(&mut mem, PROC, ArgList::Stack(0)),
            Err(Fault::Exception(Exception::ReservedOperand))
        );
    }

    #[test]
    fn ret_keeps_mode_and_trace_state() {
        let mut mem = FlatMemory::new(0x2000);
        let mut cpu = cpu_with_stack(&mut mem, 0);
        cpu.call(&mut mem, PROC, ArgList::Stack(0)).expect("call");
        cpu.regs.psl |= T | TP;
        cpu.ret(&mut mem).expect("ret");
        assert_ne!(cpu.regs.psl & T, 0);
        assert_ne!(cpu.regs.psl & TP, 0);
        assert_eq!(cpu.regs.mode(), AccessMode::Kernel);
    }
}
