//! The VAX core: instruction loop, memory helpers and processor registers.
//!
//! One call to [`Vax::step`] does exactly one of: deliver a pending trace
//! fault, accept an interrupt, or run one instruction to completion
//! (fetch, decode, resolve operands, execute, write back). A fault raised
//! anywhere in the instruction rolls the general registers and PSL back to
//! their values at instruction start before it is delivered, so the saved
//! PC is the faulting instruction's own address. Traps are delivered after
//! writeback with the PC of the next instruction.

use emu_core::{Bus, BusFault, Cpu, HostError, Observable, Size, Ticks, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::VaxConfig;
use crate::exceptions::{Exception, InterruptRequest};
use crate::flags::{AccessMode, C, N, Status, T, TP, V, Z};
use crate::registers::{PC, Registers};
use crate::stream::InstructionStream;

/// Internal processor register numbers for MTPR/MFPR.
pub mod pr {
    pub const KSP: u32 = 0x00;
    pub const ESP: u32 = 0x01;
    pub const SSP: u32 = 0x02;
    pub const USP: u32 = 0x03;
    pub const SCBB: u32 = 0x11;
    pub const IPL: u32 = 0x12;
}

/// Host-level failure. ISA faults never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error(transparent)]
    Host(#[from] HostError),
}

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Running,
    Halted,
}

/// Why the core stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// HALT executed in kernel mode.
    Instruction,
    /// A fault while delivering another exception.
    DoubleFault,
}

/// Result of one [`Vax::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An instruction ran to completion.
    Retired,
    /// An exception or interrupt was delivered; PC is at its handler.
    Exception(Exception),
    /// The core is halted.
    Halted,
}

/// Result of [`Vax::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Halted(HaltReason),
    /// The step budget ran out.
    Limit,
}

/// Anything that stops an instruction part way through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fault {
    Exception(Exception),
    Host(HostError),
}

impl From<Exception> for Fault {
    fn from(exception: Exception) -> Self {
        Self::Exception(exception)
    }
}

impl From<BusFault> for Fault {
    fn from(fault: BusFault) -> Self {
        match fault {
            BusFault::AccessViolation { addr, write } => {
                Self::Exception(Exception::AccessViolation { addr, write })
            }
            BusFault::TranslationNotValid { addr, write } => {
                Self::Exception(Exception::TranslationNotValid { addr, write })
            }
            BusFault::Host(err) => Self::Host(err),
        }
    }
}

/// How an instruction finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    Next,
    Halt,
    /// Deliver a trap now that writeback is done.
    Trap(Exception),
}

/// VAX-style 32-bit CPU.
#[derive(Debug, Clone)]
pub struct Vax {
    // === Registers ===
    pub regs: Registers,
    /// System Control Block base.
    pub(crate) scbb: u32,

    // === Execution state ===
    pub(crate) state: State,
    pub(crate) halt_reason: Option<HaltReason>,
    pub(crate) stream: InstructionStream,
    instructions: Ticks,

    // === Exception state ===
    /// Most recently delivered exception, cleared by REI.
    pub(crate) pending_exception: Option<Exception>,
    pub(crate) interrupts: Vec<InterruptRequest>,

    config: VaxConfig,
}

impl Vax {
    /// Create a CPU with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(VaxConfig::default())
    }

    /// Create a CPU in reset state for `config`.
    #[must_use]
    pub fn with_config(config: VaxConfig) -> Self {
        let mut regs = Registers::new();
        regs.set_pc(config.reset_pc);
        regs.set_sp(config.reset_sp);
        Self {
            regs,
            scbb: config.scbb & !3,
            state: State::Running,
            halt_reason: None,
            stream: InstructionStream::new(),
            instructions: Ticks::ZERO,
            pending_exception: None,
            interrupts: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &VaxConfig {
        &self.config
    }

    /// True once HALT has run or a double fault occurred.
    #[must_use]
    pub fn halted(&self) -> bool {
        self.state == State::Halted
    }

    #[must_use]
    pub const fn halt_reason(&self) -> Option<HaltReason> {
        self.halt_reason
    }

    /// Most recently delivered exception, if any.
    ///
    /// Only the latest delivery is kept. Any REI clears it, so after a
    /// nested handler returns this reads `None` even while the outer
    /// handler is still running.
    #[must_use]
    pub const fn pending_exception(&self) -> Option<Exception> {
        self.pending_exception
    }

    /// Instructions retired since reset.
    #[must_use]
    pub const fn instructions(&self) -> Ticks {
        self.instructions
    }

    #[must_use]
    pub const fn scbb(&self) -> u32 {
        self.scbb
    }

    // === Instruction loop ===

    /// Run one instruction or deliver one exception.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<StepOutcome, CpuError> {
        if self.halted() {
            return Ok(StepOutcome::Halted);
        }

        if self.regs.psl & TP != 0 {
            self.regs.psl &= !TP;
            return self.take(bus, Exception::TracePending);
        }

        if let Some(request) = self.accept_interrupt() {
            let exception = Exception::Interrupt {
                ipl: request.ipl,
                vector: request.vector,
            };
            return self.take(bus, exception);
        }

        let start_r = self.regs.r;
        let start_psl = self.regs.psl;
        if start_psl & T != 0 {
            self.regs.psl |= TP;
        }
        self.stream.reset();

        match self.execute_instruction(bus) {
            Ok(Completion::Next) => {
                self.instructions.advance();
                Ok(StepOutcome::Retired)
            }
            Ok(Completion::Halt) => {
                self.instructions.advance();
                self.state = State::Halted;
                self.halt_reason = Some(HaltReason::Instruction);
                info!(
                    "HALT at {:#010X} after {}",
                    start_r[PC],
                    self.instructions
                );
                Ok(StepOutcome::Halted)
            }
            Ok(Completion::Trap(exception)) => {
                self.instructions.advance();
                self.take(bus, exception)
            }
            Err(Fault::Exception(exception)) => {
                self.regs.r = start_r;
                self.regs.psl = start_psl;
                self.take(bus, exception)
            }
            Err(Fault::Host(err)) => Err(err.into()),
        }
    }

    /// Step until halted or `limit` steps (instructions plus exception
    /// deliveries) have run.
    pub fn run<B: Bus>(&mut self, bus: &mut B, limit: u64) -> Result<StopReason, CpuError> {
        for _ in 0..limit {
            if self.step(bus)? == StepOutcome::Halted {
                return Ok(StopReason::Halted(
                    self.halt_reason.unwrap_or(HaltReason::Instruction),
                ));
            }
        }
        Ok(StopReason::Limit)
    }

    fn take<B: Bus>(&mut self, bus: &mut B, exception: Exception) -> Result<StepOutcome, CpuError> {
        self.dispatch(bus, exception)?;
        if self.halted() {
            Ok(StepOutcome::Halted)
        } else {
            Ok(StepOutcome::Exception(exception))
        }
    }

    // === Memory access ===

    /// Consume `size` bytes of instruction stream at PC.
    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B, size: Size) -> Result<u32, Fault> {
        let pc = self.regs.pc();
        let value = self.stream.fetch(bus, pc, size)?;
        self.regs.set_pc(pc.wrapping_add(size.bytes()));
        Ok(value)
    }

    pub(crate) fn read<B: Bus>(&mut self, bus: &mut B, addr: u32, size: Size) -> Result<u32, Fault> {
        Ok(bus.read(addr, size)?)
    }

    /// Write to memory. Anything prefetched may now be stale.
    pub(crate) fn write<B: Bus>(
        &mut self,
        bus: &mut B,
        addr: u32,
        size: Size,
        value: u32,
    ) -> Result<(), Fault> {
        self.stream.reset();
        Ok(bus.write(addr, size, value)?)
    }

    /// Push a longword on the current stack. SP moves only if the write
    /// succeeds.
    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u32) -> Result<(), Fault> {
        let sp = self.regs.sp().wrapping_sub(4);
        self.write(bus, sp, Size::Long, value)?;
        self.regs.set_sp(sp);
        Ok(())
    }

    pub(crate) fn pop<B: Bus>(&mut self, bus: &mut B) -> Result<u32, Fault> {
        let sp = self.regs.sp();
        let value = self.read(bus, sp, Size::Long)?;
        self.regs.set_sp(sp.wrapping_add(4));
        Ok(value)
    }

    // === Processor registers ===

    /// Move to processor register. Unknown registers are ignored.
    pub fn mtpr(&mut self, reg: u32, value: u32) {
        match reg {
            pr::KSP => self.regs.set_stack_pointer(AccessMode::Kernel, value),
            pr::ESP => self.regs.set_stack_pointer(AccessMode::Executive, value),
            pr::SSP => self.regs.set_stack_pointer(AccessMode::Supervisor, value),
            pr::USP => self.regs.set_stack_pointer(AccessMode::User, value),
            pr::SCBB => self.scbb = value & !3,
            pr::IPL => self.regs.psl = Status::with_ipl(self.regs.psl, value as u8),
            _ => warn!("MTPR to unknown processor register {:#X} ignored", reg),
        }
    }

    /// Move from processor register. Unknown registers read as zero.
    #[must_use]
    pub fn mfpr(&self, reg: u32) -> u32 {
        match reg {
            pr::KSP => self.regs.stack_pointer(AccessMode::Kernel),
            pr::ESP => self.regs.stack_pointer(AccessMode::Executive),
            pr::SSP => self.regs.stack_pointer(AccessMode::Supervisor),
            pr::USP => self.regs.stack_pointer(AccessMode::User),
            pr::SCBB => self.scbb,
            pr::IPL => u32::from(Status::ipl(self.regs.psl)),
            _ => {
                warn!("MFPR from unknown processor register {:#X} reads 0", reg);
                0
            }
        }
    }
}

impl Default for Vax {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for Vax {
    type Registers = Registers;
    type Error = CpuError;

    fn step<B: Bus>(&mut self, bus: &mut B) -> Result<(), CpuError> {
        Vax::step(self, bus).map(|_| ())
    }

    fn pc(&self) -> u32 {
        self.regs.pc()
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.halted()
    }

    fn interrupt(&mut self, level: u8, vector: u16) {
        self.request_interrupt(level, vector);
    }

    fn reset(&mut self) {
        *self = Self::with_config(self.config);
    }
}

// === Observable implementation ===

const VAX_QUERY_PATHS: &[&str] = &[
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11",
    "ap", "fp", "sp", "pc",
    "psl",
    "flags.n", "flags.z", "flags.v", "flags.c",
    "mode", "ipl",
    "halted", "exception", "instructions",
];

impl Observable for Vax {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(n) = path.strip_prefix('r') {
            let n: usize = n.parse().ok()?;
            return (n < 12).then(|| self.regs.r[n].into());
        }
        match path {
            "ap" => Some(self.regs.ap().into()),
            "fp" => Some(self.regs.fp().into()),
            "sp" => Some(self.regs.sp().into()),
            "pc" => Some(self.regs.pc().into()),
            "psl" => Some(self.regs.psl.into()),
            "flags.n" => Some((self.regs.psl & N != 0).into()),
            "flags.z" => Some((self.regs.psl & Z != 0).into()),
            "flags.v" => Some((self.regs.psl & V != 0).into()),
            "flags.c" => Some((self.regs.psl & C != 0).into()),
            "mode" => Some(self.regs.mode().name().into()),
            "ipl" => Some(Status::ipl(self.regs.psl).into()),
            "halted" => Some(self.halted().into()),
            "exception" => Some(self.pending_exception.map_or("none", Exception::name).into()),
            "instructions" => Some(self.instructions.get().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        VAX_QUERY_PATHS
    }
}
