//! CPU core trait.

use crate::Bus;

/// An instruction-stepped CPU core.
///
/// The bus is passed in, not owned, so a host can share one memory model
/// between a core and its devices. Each call to [`Cpu::step`] retires at
/// most one instruction or delivers one exception.
///
/// Cores expose their internal state for observation and debugging. Every
/// instance owns its own registers; nothing is shared between instances.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Host-level failure that stops emulation outright.
    type Error: std::error::Error;

    /// Execute one instruction (or deliver one pending exception).
    fn step<B: Bus>(&mut self, bus: &mut B) -> Result<(), Self::Error>;

    /// Returns the current program counter.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Raise an interrupt request line at `level` with handler `vector`.
    fn interrupt(&mut self, level: u8, vector: u16);

    /// Reset the CPU to its initial state.
    fn reset(&mut self);
}
