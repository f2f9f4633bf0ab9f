//! VAX-style 32-bit CISC instruction-execution core.
//!
//! The core fetches variable-length instructions through a small prefetch
//! buffer, resolves operands through sixteen addressing modes, and runs
//! the two protocols that make the architecture interesting: procedure
//! calls that build and tear down register-save frames (CALLS, CALLG,
//! RET), and exception and interrupt delivery vectored through a System
//! Control Block, with REI validating the state it restores.
//!
//! Memory is reached only through [`emu_core::Bus`]. Translation faults
//! reported by the bus re-enter the core as exceptions; host failures stop
//! [`Vax::step`] with a [`CpuError`].

pub mod addressing;
pub mod alu;
mod call;
pub mod config;
pub mod cpu;
pub mod decode;
mod ea;
pub mod exceptions;
mod execute;
pub mod flags;
pub mod registers;
mod stream;

pub use addressing::{Access, AddrMode, Location, Operand, OperandSpec};
pub use alu::{AluOp, Flags, apply, apply_sized};
pub use config::VaxConfig;
pub use cpu::{CpuError, HaltReason, StepOutcome, StopReason, Vax, pr};
pub use decode::{Class, Form, InstrInfo, Opcode, decode};
pub use exceptions::{Exception, InterruptRequest, scb};
pub use flags::{AccessMode, Cond, Status};
pub use registers::Registers;
pub use stream::PREFETCH_BYTES;
