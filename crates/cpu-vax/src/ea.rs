//! Operand specifier resolution.
//!
//! Resolution consumes the specifier (and any displacement or immediate
//! bytes) from the instruction stream and applies autoincrement and
//! autodecrement to the register file immediately, so a later specifier in
//! the same instruction sees the updated register.

use emu_core::{Bus, Size};

use crate::addressing::{Access, AddrMode, Location, Operand, OperandSpec};
use crate::cpu::{Fault, Vax};
use crate::exceptions::Exception;
use crate::registers::PC;

const RESERVED_MODE: Fault = Fault::Exception(Exception::ReservedAddressingMode);

impl Vax {
    /// Resolve the next operand of the current instruction.
    ///
    /// Read and modify operands come back with their value loaded; write
    /// operands only carry their location; address operands carry the
    /// effective address as their value.
    pub(crate) fn resolve<B: Bus>(&mut self, bus: &mut B, spec: OperandSpec) -> Result<Operand, Fault> {
        let size = spec.size;
        if spec.access == Access::Branch {
            let raw = self.fetch(bus, size)?;
            return Ok(Operand {
                value: size.sign_extend(raw),
                loc: Location::Displacement,
                size,
            });
        }

        let specifier = self.fetch(bus, Size::Byte)? as u8;
        let loc = match AddrMode::decode(specifier) {
            AddrMode::Literal(literal) => {
                if spec.access != Access::Read {
                    return Err(RESERVED_MODE);
                }
                return Ok(Operand {
                    value: u32::from(literal),
                    loc: Location::Literal,
                    size,
                });
            }
            AddrMode::Autoincrement(n) if usize::from(n) == PC => {
                if spec.access != Access::Read {
                    return Err(RESERVED_MODE);
                }
                let addr = self.regs.pc();
                let value = self.fetch(bus, size)?;
                return Ok(Operand {
                    value,
                    loc: Location::Memory { addr, immediate: true },
                    size,
                });
            }
            AddrMode::Register(n) => {
                if usize::from(n) == PC || spec.access == Access::Address {
                    return Err(RESERVED_MODE);
                }
                Location::Register(n)
            }
            AddrMode::Index(rx) => {
                if usize::from(rx) == PC {
                    return Err(RESERVED_MODE);
                }
                let base_mode = AddrMode::decode(self.fetch(bus, Size::Byte)? as u8);
                if !base_mode.is_memory() || base_mode == AddrMode::Autoincrement(PC as u8) {
                    return Err(RESERVED_MODE);
                }
                let base = self.effective_address(bus, base_mode, size)?;
                let index = self.regs.r[usize::from(rx)].wrapping_mul(size.bytes());
                Location::Memory {
                    addr: base.wrapping_add(index),
                    immediate: false,
                }
            }
            mode => Location::Memory {
                addr: self.effective_address(bus, mode, size)?,
                immediate: false,
            },
        };

        let value = match (spec.access, loc) {
            (Access::Address, Location::Memory { addr, .. }) => addr,
            (Access::Read | Access::Modify, Location::Register(n)) => {
                self.regs.read_sized(usize::from(n), size)
            }
            (Access::Read | Access::Modify, Location::Memory { addr, .. }) => {
                self.read(bus, addr, size)?
            }
            _ => 0,
        };
        Ok(Operand { value, loc, size })
    }

    /// Effective address of a memory mode, applying register side effects.
    fn effective_address<B: Bus>(&mut self, bus: &mut B, mode: AddrMode, size: Size) -> Result<u32, Fault> {
        match mode {
            AddrMode::RegisterDeferred(n) if usize::from(n) != PC => Ok(self.regs.r[usize::from(n)]),
            AddrMode::Autodecrement(n) if usize::from(n) != PC => {
                let n = usize::from(n);
                self.regs.r[n] = self.regs.r[n].wrapping_sub(size.bytes());
                Ok(self.regs.r[n])
            }
            AddrMode::Autoincrement(n) if usize::from(n) != PC => {
                let n = usize::from(n);
                let addr = self.regs.r[n];
                self.regs.r[n] = addr.wrapping_add(size.bytes());
                Ok(addr)
            }
            // @#address
            AddrMode::AutoincrementDeferred(n) if usize::from(n) == PC => self.fetch(bus, Size::Long),
            AddrMode::AutoincrementDeferred(n) => {
                let n = usize::from(n);
                let pointer = self.regs.r[n];
                self.regs.r[n] = pointer.wrapping_add(4);
                self.read(bus, pointer, Size::Long)
            }
            AddrMode::Displacement {
                reg,
                size: width,
                deferred,
            } => {
                let disp = width.sign_extend(self.fetch(bus, width)?);
                // PC-relative uses the PC after the displacement field.
                let base = self.regs.r[usize::from(reg)];
                let addr = base.wrapping_add(disp);
                if deferred {
                    self.read(bus, addr, Size::Long)
                } else {
                    Ok(addr)
                }
            }
            _ => Err(RESERVED_MODE),
        }
    }

    /// Write a result to a resolved destination.
    pub(crate) fn store<B: Bus>(&mut self, bus: &mut B, dst: &Operand, value: u32) -> Result<(), Fault> {
        match dst.loc {
            Location::Register(n) => {
                self.regs.write_sized(usize::from(n), value, dst.size);
                Ok(())
            }
            Location::Memory { addr, .. } => self.write(bus, addr, dst.size, value),
            Location::Literal | Location::Displacement => Err(RESERVED_MODE),
        }
    }
}
