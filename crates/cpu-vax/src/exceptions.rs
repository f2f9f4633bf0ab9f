//! Exception and interrupt dispatch, and REI.
//!
//! Every fault, trap and accepted interrupt is delivered the same way:
//! read the handler address from the System Control Block, switch to the
//! kernel stack, then push the interrupted PSL, the PC and any
//! exception-specific parameters. The handler pops the parameters and
//! returns with REI.
//!
//! Kernel stack after entry (lowest address first):
//!
//! ```text
//!   SP ->  parameters (0-2 longwords, last pushed on top)
//!          PC
//!          PSL
//! ```

use emu_core::{Bus, HostError, Size};
use tracing::{debug, warn};

use crate::cpu::{Completion, Fault, HaltReason, State, Vax};
use crate::flags::{AccessMode, PSL_MBZ, Status};

/// SCB vector indices. The byte offset of an entry is `4 * index`.
pub mod scb {
    pub const RESERVED_INSTRUCTION: u16 = 4;
    pub const RESERVED_OPERAND: u16 = 6;
    pub const RESERVED_ADDRESSING_MODE: u16 = 7;
    pub const ACCESS_VIOLATION: u16 = 8;
    pub const TRANSLATION_NOT_VALID: u16 = 9;
    pub const TRACE_PENDING: u16 = 10;
    pub const BREAKPOINT: u16 = 11;
    pub const ARITHMETIC: u16 = 13;
    pub const CHMK: u16 = 16;
}

/// Arithmetic trap code: integer overflow.
pub const INTEGER_OVERFLOW: u32 = 1;
/// Arithmetic trap code: integer divide by zero.
pub const INTEGER_DIVIDE_BY_ZERO: u32 = 2;

/// Access-violation reason mask bit: the access was a write.
const REASON_WRITE: u32 = 1 << 2;

/// Every exception or interrupt the core can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    /// Reserved or privileged opcode.
    ReservedInstruction,
    /// Invalid operand value (REI validation, CALLS entry mask, RET frame).
    ReservedOperand,
    /// Addressing mode not permitted for the operand.
    ReservedAddressingMode,
    AccessViolation { addr: u32, write: bool },
    TranslationNotValid { addr: u32, write: bool },
    /// Trace fault taken between instructions.
    TracePending,
    /// BPT.
    Breakpoint,
    /// Arithmetic trap with its code.
    Arithmetic(u32),
    /// CHMK with its operand.
    ChangeModeKernel { code: i16 },
    /// Accepted interrupt request.
    Interrupt { ipl: u8, vector: u16 },
}

impl Exception {
    /// SCB index this exception vectors through.
    #[must_use]
    pub const fn scb_index(self) -> u16 {
        match self {
            Self::ReservedInstruction => scb::RESERVED_INSTRUCTION,
            Self::ReservedOperand => scb::RESERVED_OPERAND,
            Self::ReservedAddressingMode => scb::RESERVED_ADDRESSING_MODE,
            Self::AccessViolation { .. } => scb::ACCESS_VIOLATION,
            Self::TranslationNotValid { .. } => scb::TRANSLATION_NOT_VALID,
            Self::TracePending => scb::TRACE_PENDING,
            Self::Breakpoint => scb::BREAKPOINT,
            Self::Arithmetic(_) => scb::ARITHMETIC,
            Self::ChangeModeKernel { .. } => scb::CHMK,
            Self::Interrupt { vector, .. } => vector,
        }
    }

    /// Longwords pushed above the saved PC, in push order.
    #[must_use]
    pub fn parameters(self) -> Vec<u32> {
        match self {
            Self::AccessViolation { addr, write } | Self::TranslationNotValid { addr, write } => {
                vec![addr, if write { REASON_WRITE } else { 0 }]
            }
            Self::Arithmetic(code) => vec![code],
            Self::ChangeModeKernel { code } => vec![i32::from(code) as u32],
            _ => Vec::new(),
        }
    }

    /// Short name for logs and observation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReservedInstruction => "reserved instruction",
            Self::ReservedOperand => "reserved operand",
            Self::ReservedAddressingMode => "reserved addressing mode",
            Self::AccessViolation { .. } => "access violation",
            Self::TranslationNotValid { .. } => "translation not valid",
            Self::TracePending => "trace pending",
            Self::Breakpoint => "breakpoint",
            Self::Arithmetic(_) => "arithmetic",
            Self::ChangeModeKernel { .. } => "chmk",
            Self::Interrupt { .. } => "interrupt",
        }
    }
}

/// A pending interrupt request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptRequest {
    pub ipl: u8,
    pub vector: u16,
}

impl Vax {
    /// Deliver an exception through the SCB.
    ///
    /// A fault while reading the SCB or pushing the frame halts the machine
    /// with [`HaltReason::DoubleFault`]. Only host failures are returned.
    pub(crate) fn dispatch<B: Bus>(&mut self, bus: &mut B, exception: Exception) -> Result<(), HostError> {
        let old_psl = self.regs.psl;
        let pc = self.regs.pc();
        match self.deliver(bus, exception, old_psl, pc) {
            Ok(handler) => {
                debug!(
                    "{} from {:#010X} (psl {:#010X}) -> handler {:#010X}",
                    exception.name(),
                    pc,
                    old_psl,
                    handler
                );
                self.pending_exception = Some(exception);
                Ok(())
            }
            Err(Fault::Exception(nested)) => {
                warn!(
                    "double fault: {} while delivering {} at {:#010X}",
                    nested.name(),
                    exception.name(),
                    pc
                );
                self.pending_exception = Some(nested);
                self.state = State::Halted;
                self.halt_reason = Some(HaltReason::DoubleFault);
                Ok(())
            }
            Err(Fault::Host(err)) => Err(err),
        }
    }

    fn deliver<B: Bus>(
        &mut self,
        bus: &mut B,
        exception: Exception,
        old_psl: u32,
        pc: u32,
    ) -> Result<u32, Fault> {
        let entry = self.scbb.wrapping_add(4 * u32::from(exception.scb_index()));
        let handler = self.read(bus, entry, Size::Long)? & !3;

        let ipl = match exception {
            Exception::Interrupt { ipl, .. } => ipl,
            _ => Status::ipl(old_psl),
        };
        self.regs.switch_stack(AccessMode::Kernel);
        self.regs.psl = Status::exception_entry(old_psl, ipl);

        self.push(bus, old_psl)?;
        self.push(bus, pc)?;
        for param in exception.parameters() {
            self.push(bus, param)?;
        }
        self.regs.set_pc(handler);
        Ok(handler)
    }

    /// REI: pop PC and PSL, validate the PSL against the current one, then
    /// commit both and switch to the restored mode's stack.
    pub(crate) fn rei<B: Bus>(&mut self, bus: &mut B) -> Result<Completion, Fault> {
        let sp = self.regs.sp();
        let new_pc = self.read(bus, sp, Size::Long)?;
        let new_psl = self.read(bus, sp.wrapping_add(4), Size::Long)?;

        let cur = Status::cur_mode(self.regs.psl);
        let new_cur = Status::cur_mode(new_psl);
        let new_prv = Status::prv_mode(new_psl);
        if new_psl & PSL_MBZ != 0
            || new_cur < cur
            || new_prv < new_cur
            || Status::ipl(new_psl) > Status::ipl(self.regs.psl)
        {
            debug!(
                "REI rejected: psl {:#010X} from {} mode",
                new_psl,
                cur.name()
            );
            return Err(Exception::ReservedOperand.into());
        }

        self.regs.set_sp(sp.wrapping_add(8));
        self.regs.switch_stack(new_cur);
        self.regs.psl = new_psl;
        self.regs.set_pc(new_pc);
        self.pending_exception = None;
        debug!(
            "REI to {:#010X} in {} mode, ipl {}",
            new_pc,
            new_cur.name(),
            Status::ipl(new_psl)
        );
        Ok(Completion::Next)
    }

    /// Post an interrupt request. A repeated `(ipl, vector)` pair is kept once.
    pub fn request_interrupt(&mut self, ipl: u8, vector: u16) {
        let request = InterruptRequest { ipl: ipl & 0x1F, vector };
        if !self.interrupts.contains(&request) {
            self.interrupts.push(request);
        }
    }

    /// Withdraw every request at `ipl`.
    pub fn clear_interrupt(&mut self, ipl: u8) {
        self.interrupts.retain(|r| r.ipl != ipl);
    }

    /// Pending requests, in posting order.
    #[must_use]
    pub fn interrupt_requests(&self) -> &[InterruptRequest] {
        &self.interrupts
    }

    /// Remove and return the highest request above the current IPL.
    pub(crate) fn accept_interrupt(&mut self) -> Option<InterruptRequest> {
        let current = Status::ipl(self.regs.psl);
        let (index, _) = self
            .interrupts
            .iter()
            .enumerate()
            .filter(|(_, r)| r.ipl > current)
            .max_by_key(|(_, r)| r.ipl)?;
        Some(self.interrupts.remove(index))
    }
}
