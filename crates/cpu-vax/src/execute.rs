//! Instruction execution.
//!
//! Fetch and decode the opcode, resolve every operand left to right, then
//! run the instruction by its [`Form`]. ALU results are written back before
//! the condition codes change, and a pending branch is applied last.

use emu_core::{Bus, Size};
use tracing::trace;

use crate::addressing::Operand;
use crate::alu::{AluOp, Flags, apply_sized};
use crate::call::ArgList;
use crate::cpu::{Completion, Fault, Vax};
use crate::decode::{Form, InstrInfo, Opcode, decode, is_prefix};
use crate::exceptions::{Exception, INTEGER_DIVIDE_BY_ZERO, INTEGER_OVERFLOW};
use crate::flags::{AccessMode, IV, Status};

/// Most operand slots any instruction has.
pub const MAX_OPERANDS: usize = 6;

impl Vax {
    /// Fetch, decode, resolve and execute one instruction.
    pub(crate) fn execute_instruction<B: Bus>(&mut self, bus: &mut B) -> Result<Completion, Fault> {
        let start = self.regs.pc();
        let first = self.fetch(bus, Size::Byte)? as u8;
        let opcode = if is_prefix(first) {
            Opcode::Two(first, self.fetch(bus, Size::Byte)? as u8)
        } else {
            Opcode::One(first)
        };
        let Some(info) = decode(opcode) else {
            trace!("{:#010X}: reserved opcode {}", start, opcode);
            return Err(Exception::ReservedInstruction.into());
        };
        trace!("{:#010X}: {}", start, info.mnemonic);

        if matches!(info.form, Form::Halt | Form::MoveToPr | Form::MoveFromPr)
            && self.regs.mode() != AccessMode::Kernel
        {
            return Err(Exception::ReservedInstruction.into());
        }

        let mut ops = [Operand::default(); MAX_OPERANDS];
        for (slot, spec) in ops.iter_mut().zip(info.operands) {
            *slot = self.resolve(bus, *spec)?;
        }
        self.execute(bus, info, &ops[..info.operand_count()])
    }

    fn execute<B: Bus>(&mut self, bus: &mut B, info: &InstrInfo, ops: &[Operand]) -> Result<Completion, Fault> {
        let alu = info.alu;
        match info.form {
            Form::Move => {
                let dst = ops[ops.len() - 1];
                self.alu_writeback(bus, &dst, alu, ops[0].value, 0)
            }
            Form::SignExtend => {
                let dst = ops[ops.len() - 1];
                let value = ops[0].size.sign_extend(ops[0].value);
                self.alu_writeback(bus, &dst, alu, value, !0)
            }
            Form::Clear => self.alu_writeback(bus, &ops[0], alu, 0, 0),
            Form::Binary => {
                let dst = ops[ops.len() - 1];
                self.alu_writeback(bus, &dst, alu, ops[1].value, ops[0].value)
            }
            Form::Unary(constant) => {
                let dst = ops[ops.len() - 1];
                self.alu_writeback(bus, &dst, alu, ops[0].value, constant)
            }
            Form::Negate => {
                let dst = ops[ops.len() - 1];
                self.alu_writeback(bus, &dst, alu, 0, ops[0].value)
            }
            Form::Push => {
                let value = ops[0].value;
                self.push(bus, value)?;
                let (_, flags) = apply_sized(AluOp::Move, value, 0, Size::Long);
                self.set_flags(flags, AluOp::Move);
                Ok(Completion::Next)
            }
            Form::Compare => {
                let b = ops.get(1).map_or(!0, |op| op.value);
                let (_, flags) = apply_sized(alu, ops[0].value, b, ops[0].size);
                self.set_flags(flags, alu);
                Ok(Completion::Next)
            }

            Form::Branch(cond) => {
                if Status::condition(self.regs.psl, cond) {
                    self.branch(&ops[0]);
                }
                Ok(Completion::Next)
            }
            Form::LowBit(set) => {
                if (ops[0].value & 1 != 0) == set {
                    self.branch(&ops[1]);
                }
                Ok(Completion::Next)
            }
            Form::SubtractBranch { geq } => {
                let (result, flags) = self.loop_step(bus, &ops[0], AluOp::Sub)?;
                let remaining = result as i32;
                let taken = if geq { remaining >= 0 } else { remaining > 0 };
                if taken {
                    self.branch(&ops[1]);
                }
                Ok(self.overflow_trap(flags.v, INTEGER_OVERFLOW))
            }
            Form::AddBranch { leq } => {
                let limit = ops[0].value as i32;
                let (result, flags) = self.loop_step(bus, &ops[1], AluOp::Add)?;
                let index = result as i32;
                let taken = if leq { index <= limit } else { index < limit };
                if taken {
                    self.branch(&ops[2]);
                }
                Ok(self.overflow_trap(flags.v, INTEGER_OVERFLOW))
            }
            Form::BranchSubroutine => {
                self.push(bus, self.regs.pc())?;
                self.branch(&ops[0]);
                Ok(Completion::Next)
            }
            Form::Jump => {
                self.regs.set_pc(ops[0].value);
                Ok(Completion::Next)
            }
            Form::JumpSubroutine => {
                self.push(bus, self.regs.pc())?;
                self.regs.set_pc(ops[0].value);
                Ok(Completion::Next)
            }
            Form::ReturnSubroutine => {
                let target = self.pop(bus)?;
                self.regs.set_pc(target);
                Ok(Completion::Next)
            }

            Form::CallStack => self.call(bus, ops[1].value, ArgList::Stack(ops[0].value)),
            Form::CallGeneral => self.call(bus, ops[1].value, ArgList::General(ops[0].value)),
            Form::Return => self.ret(bus),
            Form::ReturnException => self.rei(bus),

            Form::Halt => Ok(Completion::Halt),
            Form::Nop => Ok(Completion::Next),
            Form::Breakpoint => Err(Exception::Breakpoint.into()),
            Form::ChangeModeKernel => Ok(Completion::Trap(Exception::ChangeModeKernel {
                code: ops[0].value as u16 as i16,
            })),
            Form::Bug(size) => {
                self.fetch(bus, size)?;
                Err(Exception::ReservedInstruction.into())
            }
            Form::MoveToPr => {
                let value = ops[0].value;
                self.mtpr(ops[1].value, value);
                let (_, flags) = apply_sized(AluOp::Move, value, 0, Size::Long);
                self.set_flags(flags, AluOp::Move);
                Ok(Completion::Next)
            }
            Form::MoveFromPr => {
                let value = self.mfpr(ops[0].value);
                self.alu_writeback(bus, &ops[1], AluOp::Move, value, 0)
            }
            Form::MoveCharacters => self.move_characters(bus, ops[0].value, ops[1].value, ops[2].value),
        }
    }

    /// Run the ALU at the destination width, store, then set the flags.
    fn alu_writeback<B: Bus>(
        &mut self,
        bus: &mut B,
        dst: &Operand,
        op: AluOp,
        a: u32,
        b: u32,
    ) -> Result<Completion, Fault> {
        let (result, flags) = apply_sized(op, a, b, dst.size);
        self.store(bus, dst, result)?;
        self.set_flags(flags, op);
        let code = if op == AluOp::Div && b & dst.size.mask() == 0 {
            INTEGER_DIVIDE_BY_ZERO
        } else {
            INTEGER_OVERFLOW
        };
        Ok(self.overflow_trap(flags.v, code))
    }

    /// Increment or decrement a loop index for SOB/AOB. C is left alone.
    fn loop_step<B: Bus>(&mut self, bus: &mut B, index: &Operand, op: AluOp) -> Result<(u32, Flags), Fault> {
        let (result, flags) = apply_sized(op, index.value, 1, Size::Long);
        self.store(bus, index, result)?;
        self.regs.psl = Status::set_cc(self.regs.psl, flags, false);
        Ok((result, flags))
    }

    fn set_flags(&mut self, flags: Flags, op: AluOp) {
        self.regs.psl = Status::set_cc(self.regs.psl, flags, op.writes_carry());
    }

    fn overflow_trap(&self, overflow: bool, code: u32) -> Completion {
        if overflow && self.regs.psl & IV != 0 {
            Completion::Trap(Exception::Arithmetic(code))
        } else {
            Completion::Next
        }
    }

    /// Branch relative to the PC after the displacement field.
    fn branch(&mut self, displacement: &Operand) {
        let target = self.regs.pc().wrapping_add(displacement.value);
        self.regs.set_pc(target);
    }

    /// MOVC3: copy `len` bytes from `src` to `dst`, correct for overlap.
    fn move_characters<B: Bus>(&mut self, bus: &mut B, len: u32, src: u32, dst: u32) -> Result<Completion, Fault> {
        let backward = dst > src && dst < src.wrapping_add(len);
        for i in 0..len {
            let offset = if backward { len - 1 - i } else { i };
            let byte = self.read(bus, src.wrapping_add(offset), Size::Byte)?;
            self.write(bus, dst.wrapping_add(offset), Size::Byte, byte)?;
        }
        self.regs.r[0] = 0;
        self.regs.r[1] = src.wrapping_add(len);
        self.regs.r[2] = 0;
        self.regs.r[3] = dst.wrapping_add(len);
        self.regs.r[4] = 0;
        self.regs.r[5] = 0;
        self.regs.psl = Status::set_cc(self.regs.psl, Flags { z: true, ..Flags::default() }, true);
        Ok(Completion::Next)
    }
}
