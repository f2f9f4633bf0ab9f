//! Opcode decode tables.
//!
//! Decoding is a pure lookup: one 256-entry table for single-byte opcodes
//! and a short pair table for the two-byte opcodes introduced by the
//! prefix bytes 0xFD, 0xFE and 0xFF. A missing entry means the opcode is
//! reserved; the engine turns that into a reserved-instruction fault.

use std::fmt;

use emu_core::Size;

use crate::addressing::{Access, OperandSpec};
use crate::alu::AluOp;
use crate::flags::Cond;

/// Instruction class. Routes execution; not retained afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Move,
    Arithmetic,
    Logical,
    Compare,
    Branch,
    Jump,
    Call,
    Return,
    Privileged,
    Control,
    String,
    Shift,
}

/// Execution shape of an instruction: how its operand slots feed the ALU
/// or which protocol runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// First operand to the last, flags at the destination width.
    Move,
    /// Like `Move`, sign-extending the source first. Clears C.
    SignExtend,
    /// Push the first operand's value (or address) on the stack.
    Push,
    /// Store zero.
    Clear,
    /// `last = ops[1] op ops[0]` (ops[1] is also the destination in the
    /// two-operand forms).
    Binary,
    /// `last = ops[0] op constant`.
    Unary(u32),
    /// `last = 0 - ops[0]`.
    Negate,
    /// Flags from `ops[0] op ops[1]`, or `ops[0] op all-ones` for TST.
    Compare,
    /// Branch on condition codes.
    Branch(Cond),
    /// Branch on the low bit of the first operand being `set`.
    LowBit(bool),
    /// Decrement, branch while `>= 0` (or `> 0` when false).
    SubtractBranch { geq: bool },
    /// Increment, branch while `< limit` (or `<= limit` when true).
    AddBranch { leq: bool },
    BranchSubroutine,
    Jump,
    JumpSubroutine,
    ReturnSubroutine,
    CallStack,
    CallGeneral,
    Return,
    ReturnException,
    Halt,
    Nop,
    Breakpoint,
    ChangeModeKernel,
    /// Reserved bug-check with an inline literal of the given width.
    Bug(Size),
    MoveToPr,
    MoveFromPr,
    MoveCharacters,
}

/// Decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    One(u8),
    Two(u8, u8),
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(op) => write!(f, "{op:02X}"),
            Self::Two(prefix, op) => write!(f, "{prefix:02X} {op:02X}"),
        }
    }
}

/// Static description of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrInfo {
    pub mnemonic: &'static str,
    pub class: Class,
    pub alu: AluOp,
    pub form: Form,
    pub operands: &'static [OperandSpec],
}

impl InstrInfo {
    /// Number of operand slots, branch displacements included.
    #[must_use]
    pub const fn operand_count(&self) -> usize {
        self.operands.len()
    }
}

/// True if `byte` introduces a two-byte opcode.
#[must_use]
pub const fn is_prefix(byte: u8) -> bool {
    matches!(byte, 0xFD..=0xFF)
}

/// Look up an opcode. `None` means reserved.
#[must_use]
pub fn decode(opcode: Opcode) -> Option<&'static InstrInfo> {
    match opcode {
        Opcode::One(op) => PRIMARY[usize::from(op)].as_ref(),
        Opcode::Two(prefix, op) => TWO_BYTE
            .iter()
            .find(|(key, _)| *key == (prefix, op))
            .map(|(_, info)| info),
    }
}

// === Operand descriptor shorthands ===

const fn spec(access: Access, size: Size) -> OperandSpec {
    OperandSpec::new(access, size)
}

const RB: OperandSpec = spec(Access::Read, Size::Byte);
const RW: OperandSpec = spec(Access::Read, Size::Word);
const RL: OperandSpec = spec(Access::Read, Size::Long);
const WB: OperandSpec = spec(Access::Write, Size::Byte);
const WW: OperandSpec = spec(Access::Write, Size::Word);
const WL: OperandSpec = spec(Access::Write, Size::Long);
const MB: OperandSpec = spec(Access::Modify, Size::Byte);
const MW: OperandSpec = spec(Access::Modify, Size::Word);
const ML: OperandSpec = spec(Access::Modify, Size::Long);
const AB: OperandSpec = spec(Access::Address, Size::Byte);
const AW: OperandSpec = spec(Access::Address, Size::Word);
const AL: OperandSpec = spec(Access::Address, Size::Long);
const BB: OperandSpec = spec(Access::Branch, Size::Byte);
const BW: OperandSpec = spec(Access::Branch, Size::Word);

// === Tables ===

const fn entry(
    mnemonic: &'static str,
    class: Class,
    alu: AluOp,
    form: Form,
    operands: &'static [OperandSpec],
) -> Option<InstrInfo> {
    Some(InstrInfo {
        mnemonic,
        class,
        alu,
        form,
        operands,
    })
}

static PRIMARY: [Option<InstrInfo>; 256] = build_primary();

const fn build_primary() -> [Option<InstrInfo>; 256] {
    use AluOp::{Add, And, Ash, Bic, Cmp, Div, Move, Mul, Or, Rot, Sub, Test, Xor};
    use Class::{Arithmetic, Branch, Call, Compare, Control, Jump, Logical, Privileged, Return, Shift};

    let mut t: [Option<InstrInfo>; 256] = [None; 256];

    // Control and privileged
    t[0x00] = entry("HALT", Privileged, Move, Form::Halt, &[]);
    t[0x01] = entry("NOP", Control, Move, Form::Nop, &[]);
    t[0x02] = entry("REI", Return, Move, Form::ReturnException, &[]);
    t[0x03] = entry("BPT", Control, Move, Form::Breakpoint, &[]);
    t[0xBC] = entry("CHMK", Privileged, Move, Form::ChangeModeKernel, &[RW]);
    t[0xDA] = entry("MTPR", Privileged, Move, Form::MoveToPr, &[RL, RL]);
    t[0xDB] = entry("MFPR", Privileged, Move, Form::MoveFromPr, &[RL, WL]);

    // Subroutines, jumps and procedure calls
    t[0x04] = entry("RET", Return, Move, Form::Return, &[]);
    t[0x05] = entry("RSB", Return, Move, Form::ReturnSubroutine, &[]);
    t[0x10] = entry("BSBB", Branch, Move, Form::BranchSubroutine, &[BB]);
    t[0x30] = entry("BSBW", Branch, Move, Form::BranchSubroutine, &[BW]);
    t[0x16] = entry("JSB", Jump, Move, Form::JumpSubroutine, &[AB]);
    t[0x17] = entry("JMP", Jump, Move, Form::Jump, &[AB]);
    t[0xFA] = entry("CALLG", Call, Move, Form::CallGeneral, &[AB, AB]);
    t[0xFB] = entry("CALLS", Call, Move, Form::CallStack, &[RL, AB]);

    // Branches
    t[0x11] = entry("BRB", Branch, Move, Form::Branch(Cond::Always), &[BB]);
    t[0x31] = entry("BRW", Branch, Move, Form::Branch(Cond::Always), &[BW]);
    t[0x12] = entry("BNEQ", Branch, Move, Form::Branch(Cond::Neq), &[BB]);
    t[0x13] = entry("BEQL", Branch, Move, Form::Branch(Cond::Eql), &[BB]);
    t[0x14] = entry("BGTR", Branch, Move, Form::Branch(Cond::Gtr), &[BB]);
    t[0x15] = entry("BLEQ", Branch, Move, Form::Branch(Cond::Leq), &[BB]);
    t[0x18] = entry("BGEQ", Branch, Move, Form::Branch(Cond::Geq), &[BB]);
    t[0x19] = entry("BLSS", Branch, Move, Form::Branch(Cond::Lss), &[BB]);
    t[0x1A] = entry("BGTRU", Branch, Move, Form::Branch(Cond::Gtru), &[BB]);
    t[0x1B] = entry("BLEQU", Branch, Move, Form::Branch(Cond::Lequ), &[BB]);
    t[0x1C] = entry("BVC", Branch, Move, Form::Branch(Cond::Vc), &[BB]);
    t[0x1D] = entry("BVS", Branch, Move, Form::Branch(Cond::Vs), &[BB]);
    t[0x1E] = entry("BCC", Branch, Move, Form::Branch(Cond::Cc), &[BB]);
    t[0x1F] = entry("BCS", Branch, Move, Form::Branch(Cond::Cs), &[BB]);
    t[0xE8] = entry("BLBS", Branch, Move, Form::LowBit(true), &[RL, BB]);
    t[0xE9] = entry("BLBC", Branch, Move, Form::LowBit(false), &[RL, BB]);
    t[0xF2] = entry("AOBLSS", Branch, Add, Form::AddBranch { leq: false }, &[RL, ML, BB]);
    t[0xF3] = entry("AOBLEQ", Branch, Add, Form::AddBranch { leq: true }, &[RL, ML, BB]);
    t[0xF4] = entry("SOBGEQ", Branch, Sub, Form::SubtractBranch { geq: true }, &[ML, BB]);
    t[0xF5] = entry("SOBGTR", Branch, Sub, Form::SubtractBranch { geq: false }, &[ML, BB]);

    // Moves
    t[0x90] = entry("MOVB", Class::Move, Move, Form::Move, &[RB, WB]);
    t[0xB0] = entry("MOVW", Class::Move, Move, Form::Move, &[RW, WW]);
    t[0xD0] = entry("MOVL", Class::Move, Move, Form::Move, &[RL, WL]);
    t[0x9E] = entry("MOVAB", Class::Move, Move, Form::Move, &[AB, WL]);
    t[0x3E] = entry("MOVAW", Class::Move, Move, Form::Move, &[AW, WL]);
    t[0xDE] = entry("MOVAL", Class::Move, Move, Form::Move, &[AL, WL]);
    t[0x9A] = entry("MOVZBL", Class::Move, Move, Form::Move, &[RB, WL]);
    t[0x3C] = entry("MOVZWL", Class::Move, Move, Form::Move, &[RW, WL]);
    t[0x98] = entry("CVTBL", Class::Move, Test, Form::SignExtend, &[RB, WL]);
    t[0x32] = entry("CVTWL", Class::Move, Test, Form::SignExtend, &[RW, WL]);
    t[0xDD] = entry("PUSHL", Class::Move, Move, Form::Push, &[RL]);
    t[0xDF] = entry("PUSHAL", Class::Move, Move, Form::Push, &[AL]);
    t[0x94] = entry("CLRB", Class::Move, Move, Form::Clear, &[WB]);
    t[0xB4] = entry("CLRW", Class::Move, Move, Form::Clear, &[WW]);
    t[0xD4] = entry("CLRL", Class::Move, Move, Form::Clear, &[WL]);
    t[0xCE] = entry("MNEGL", Class::Move, Sub, Form::Negate, &[RL, WL]);
    t[0xD2] = entry("MCOML", Class::Move, Xor, Form::Unary(!0), &[RL, WL]);

    // Integer arithmetic
    t[0x80] = entry("ADDB2", Arithmetic, Add, Form::Binary, &[RB, MB]);
    t[0x81] = entry("ADDB3", Arithmetic, Add, Form::Binary, &[RB, RB, WB]);
    t[0x82] = entry("SUBB2", Arithmetic, Sub, Form::Binary, &[RB, MB]);
    t[0x83] = entry("SUBB3", Arithmetic, Sub, Form::Binary, &[RB, RB, WB]);
    t[0xA0] = entry("ADDW2", Arithmetic, Add, Form::Binary, &[RW, MW]);
    t[0xA1] = entry("ADDW3", Arithmetic, Add, Form::Binary, &[RW, RW, WW]);
    t[0xA2] = entry("SUBW2", Arithmetic, Sub, Form::Binary, &[RW, MW]);
    t[0xA3] = entry("SUBW3", Arithmetic, Sub, Form::Binary, &[RW, RW, WW]);
    t[0xC0] = entry("ADDL2", Arithmetic, Add, Form::Binary, &[RL, ML]);
    t[0xC1] = entry("ADDL3", Arithmetic, Add, Form::Binary, &[RL, RL, WL]);
    t[0xC2] = entry("SUBL2", Arithmetic, Sub, Form::Binary, &[RL, ML]);
    t[0xC3] = entry("SUBL3", Arithmetic, Sub, Form::Binary, &[RL, RL, WL]);
    t[0xC4] = entry("MULL2", Arithmetic, Mul, Form::Binary, &[RL, ML]);
    t[0xC5] = entry("MULL3", Arithmetic, Mul, Form::Binary, &[RL, RL, WL]);
    t[0xC6] = entry("DIVL2", Arithmetic, Div, Form::Binary, &[RL, ML]);
    t[0xC7] = entry("DIVL3", Arithmetic, Div, Form::Binary, &[RL, RL, WL]);
    t[0xD6] = entry("INCL", Arithmetic, Add, Form::Unary(1), &[ML]);
    t[0xD7] = entry("DECL", Arithmetic, Sub, Form::Unary(1), &[ML]);

    // Logical
    t[0xC8] = entry("BISL2", Logical, Or, Form::Binary, &[RL, ML]);
    t[0xC9] = entry("BISL3", Logical, Or, Form::Binary, &[RL, RL, WL]);
    t[0xCA] = entry("BICL2", Logical, Bic, Form::Binary, &[RL, ML]);
    t[0xCB] = entry("BICL3", Logical, Bic, Form::Binary, &[RL, RL, WL]);
    t[0xCC] = entry("XORL2", Logical, Xor, Form::Binary, &[RL, ML]);
    t[0xCD] = entry("XORL3", Logical, Xor, Form::Binary, &[RL, RL, WL]);

    // Shifts
    t[0x78] = entry("ASHL", Shift, Ash, Form::Binary, &[RB, RL, WL]);
    t[0x9C] = entry("ROTL", Shift, Rot, Form::Binary, &[RB, RL, WL]);

    // Compare and test
    t[0x91] = entry("CMPB", Compare, Cmp, Form::Compare, &[RB, RB]);
    t[0xB1] = entry("CMPW", Compare, Cmp, Form::Compare, &[RW, RW]);
    t[0xD1] = entry("CMPL", Compare, Cmp, Form::Compare, &[RL, RL]);
    t[0x95] = entry("TSTB", Compare, Test, Form::Compare, &[RB]);
    t[0xB5] = entry("TSTW", Compare, Test, Form::Compare, &[RW]);
    t[0xD5] = entry("TSTL", Compare, Test, Form::Compare, &[RL]);
    t[0xD3] = entry("BITL", Compare, And, Form::Compare, &[RL, RL]);

    // Strings
    t[0x28] = entry("MOVC3", Class::String, Move, Form::MoveCharacters, &[RW, AB, AB]);

    t
}

static TWO_BYTE: [((u8, u8), InstrInfo); 2] = [
    (
        (0xFF, 0xFD),
        InstrInfo {
            mnemonic: "BUGL",
            class: Class::Control,
            alu: AluOp::Move,
            form: Form::Bug(Size::Long),
            operands: &[],
        },
    ),
    (
        (0xFF, 0xFE),
        InstrInfo {
            mnemonic: "BUGW",
            class: Class::Control,
            alu: AluOp::Move,
            form: Form::Bug(Size::Word),
            operands: &[],
        },
    ),
];
