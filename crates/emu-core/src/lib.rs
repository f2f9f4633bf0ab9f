//! Core traits and types shared by CPU cores and their host runners.
//!
//! A core sees memory only through [`Bus`], reports host-side failures as
//! [`HostError`], and exposes its state for inspection through
//! [`Observable`]. Nothing here knows about a particular instruction set.

mod bus;
mod cpu;
mod observable;
mod ticks;

pub use bus::{Bus, BusFault, FlatMemory, HostError, Size};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use ticks::Ticks;
