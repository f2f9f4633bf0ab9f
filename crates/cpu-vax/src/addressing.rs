//! Operand specifier modes and operand descriptors.
//!
//! Every operand except a branch displacement starts with one specifier
//! byte: the high nibble selects the mode, the low nibble the register.

use emu_core::Size;

/// Addressing mode decoded from a specifier byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Modes 0-3: 6-bit literal in the specifier itself.
    Literal(u8),
    /// Mode 4: `base[Rx]`, base follows as another specifier.
    Index(u8),
    /// Mode 5: `Rn`.
    Register(u8),
    /// Mode 6: `(Rn)`.
    RegisterDeferred(u8),
    /// Mode 7: `-(Rn)`.
    Autodecrement(u8),
    /// Mode 8: `(Rn)+`. With PC this is immediate.
    Autoincrement(u8),
    /// Mode 9: `@(Rn)+`. With PC this is absolute.
    AutoincrementDeferred(u8),
    /// Modes A-F: `disp(Rn)` or `@disp(Rn)`.
    Displacement { reg: u8, size: Size, deferred: bool },
}

impl AddrMode {
    /// Decode a specifier byte.
    #[must_use]
    pub const fn decode(specifier: u8) -> Self {
        let reg = specifier & 0x0F;
        match specifier >> 4 {
            0..=3 => Self::Literal(specifier & 0x3F),
            4 => Self::Index(reg),
            5 => Self::Register(reg),
            6 => Self::RegisterDeferred(reg),
            7 => Self::Autodecrement(reg),
            8 => Self::Autoincrement(reg),
            9 => Self::AutoincrementDeferred(reg),
            0xA => Self::Displacement { reg, size: Size::Byte, deferred: false },
            0xB => Self::Displacement { reg, size: Size::Byte, deferred: true },
            0xC => Self::Displacement { reg, size: Size::Word, deferred: false },
            0xD => Self::Displacement { reg, size: Size::Word, deferred: true },
            0xE => Self::Displacement { reg, size: Size::Long, deferred: false },
            _ => Self::Displacement { reg, size: Size::Long, deferred: true },
        }
    }

    /// True for modes that name a memory location (and so can be indexed).
    #[must_use]
    pub const fn is_memory(self) -> bool {
        !matches!(self, Self::Literal(_) | Self::Index(_) | Self::Register(_))
    }
}

/// How an instruction uses an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Value is read.
    Read,
    /// Location is written at writeback; nothing is read.
    Write,
    /// Value is read, then the location is written back.
    Modify,
    /// The effective address itself is the value.
    Address,
    /// Raw branch displacement in the instruction stream, not a specifier.
    Branch,
}

/// One operand of an instruction: access type and data width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandSpec {
    pub access: Access,
    pub size: Size,
}

impl OperandSpec {
    #[must_use]
    pub const fn new(access: Access, size: Size) -> Self {
        Self { access, size }
    }
}

/// Where a resolved operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// Short literal; read-only.
    #[default]
    Literal,
    /// General register `n`.
    Register(u8),
    /// Memory at the given address. `immediate` marks PC-autoincrement,
    /// where the address is inside the instruction stream.
    Memory { addr: u32, immediate: bool },
    /// Branch displacement; `value` is the sign-extended offset.
    Displacement,
}

/// A resolved operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    /// Operand value (zero-extended), effective address, or displacement.
    pub value: u32,
    pub loc: Location,
    pub size: Size,
}

impl Default for Operand {
    fn default() -> Self {
        Self {
            value: 0,
            loc: Location::Literal,
            size: Size::Long,
        }
    }
}

impl Operand {
    /// Address of a memory-resident operand.
    #[must_use]
    pub const fn address(&self) -> Option<u32> {
        match self.loc {
            Location::Memory { addr, .. } => Some(addr),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_register(&self) -> bool {
        matches!(self.loc, Location::Register(_))
    }

    /// Register index of a register-resident operand.
    #[must_use]
    pub const fn register(&self) -> Option<u8> {
        match self.loc {
            Location::Register(n) => Some(n),
            _ => None,
        }
    }

    /// True for short literals and PC-autoincrement immediates.
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        matches!(
            self.loc,
            Location::Literal | Location::Memory { immediate: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_every_mode_nibble() {
        assert_eq!(AddrMode::decode(0x2A), AddrMode::Literal(0x2A));
        assert_eq!(AddrMode::decode(0x3F), AddrMode::Literal(0x3F));
        assert_eq!(AddrMode::decode(0x43), AddrMode::Index(3));
        assert_eq!(AddrMode::decode(0x51), AddrMode::Register(1));
        assert_eq!(AddrMode::decode(0x62), AddrMode::RegisterDeferred(2));
        assert_eq!(AddrMode::decode(0x7E), AddrMode::Autodecrement(14));
        assert_eq!(AddrMode::decode(0x8F), AddrMode::Autoincrement(15));
        assert_eq!(AddrMode::decode(0x9F), AddrMode::AutoincrementDeferred(15));
        assert_eq!(
            AddrMode::decode(0xBD),
            AddrMode::Displacement { reg: 13, size: Size::Byte, deferred: true }
        );
        assert_eq!(
            AddrMode::decode(0xC5),
            AddrMode::Displacement { reg: 5, size: Size::Word, deferred: false }
        );
        assert_eq!(
            AddrMode::decode(0xFF),
            AddrMode::Displacement { reg: 15, size: Size::Long, deferred: true }
        );
    }

    #[test]
    fn only_memory_modes_are_indexable() {
        assert!(!AddrMode::decode(0x05).is_memory());
        assert!(!AddrMode::decode(0x41).is_memory());
        assert!(!AddrMode::decode(0x51).is_memory());
        assert!(AddrMode::decode(0x61).is_memory());
        assert!(AddrMode::decode(0xE1).is_memory());
    }

    #[test]
    fn operand_slot_accessors() {
        let reg = Operand { value: 7, loc: Location::Register(3), size: Size::Long };
        assert!(reg.is_register());
        assert_eq!(reg.register(), Some(3));
        assert_eq!(reg.address(), None);
        let imm = Operand {
            value: 42,
            loc: Location::Memory { addr: 0x1001, immediate: true },
            size: Size::Long,
        };
        assert!(imm.is_immediate());
        assert_eq!(imm.address(), Some(0x1001));
    }
}
