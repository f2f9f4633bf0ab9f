//! Processor status longword (PSL).
//!
//! The PSL is 32 bits:
//! - Bits 0-3: Condition codes
//!   - C (bit 0): Carry / borrow
//!   - V (bit 1): Overflow
//!   - Z (bit 2): Zero
//!   - N (bit 3): Negative
//! - Bit 4: Trace enable (T)
//! - Bit 5: Integer overflow trap enable (IV)
//! - Bit 6: Floating underflow enable (FU, carried but unused)
//! - Bit 7: Decimal overflow enable (DV, carried but unused)
//! - Bits 16-20: Interrupt priority level (IPL)
//! - Bits 22-23: Previous access mode
//! - Bits 24-25: Current access mode
//! - Bit 30: Trace pending (TP)
//! - All other bits must be zero in a PSL restored by REI.

use crate::alu::Flags;

/// Carry flag.
pub const C: u32 = 0x0000_0001;
/// Overflow flag.
pub const V: u32 = 0x0000_0002;
/// Zero flag.
pub const Z: u32 = 0x0000_0004;
/// Negative flag.
pub const N: u32 = 0x0000_0008;
/// Trace enable.
pub const T: u32 = 0x0000_0010;
/// Integer overflow trap enable.
pub const IV: u32 = 0x0000_0020;
/// Floating underflow enable.
pub const FU: u32 = 0x0000_0040;
/// Decimal overflow trap enable.
pub const DV: u32 = 0x0000_0080;
/// Trace pending.
pub const TP: u32 = 0x4000_0000;

/// Mask for the four condition codes.
pub const CC_MASK: u32 = N | Z | V | C;
/// Mask for the interrupt priority level field.
pub const IPL_MASK: u32 = 0x001F_0000;
const IPL_SHIFT: u32 = 16;
/// Mask for the previous-mode field.
pub const PRV_MOD_MASK: u32 = 0x00C0_0000;
const PRV_MOD_SHIFT: u32 = 22;
/// Mask for the current-mode field.
pub const CUR_MOD_MASK: u32 = 0x0300_0000;
const CUR_MOD_SHIFT: u32 = 24;
/// Bits that must be zero in any PSL accepted by REI.
pub const PSL_MBZ: u32 = 0xBC20_FF00;

/// Highest interrupt priority level.
pub const IPL_MAX: u8 = 31;

/// Access mode, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessMode {
    Kernel = 0,
    Executive = 1,
    Supervisor = 2,
    User = 3,
}

impl AccessMode {
    /// Decode a two-bit mode field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Kernel,
            1 => Self::Executive,
            2 => Self::Supervisor,
            _ => Self::User,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Stack bank slot for this mode.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kernel => "kernel",
            Self::Executive => "executive",
            Self::Supervisor => "supervisor",
            Self::User => "user",
        }
    }
}

/// Branch conditions, evaluated against the condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Always,
    Neq,
    Eql,
    Gtr,
    Leq,
    Geq,
    Lss,
    Gtru,
    Lequ,
    Vc,
    Vs,
    Cc,
    Cs,
}

/// PSL helper functions.
pub struct Status;

impl Status {
    /// Current access mode.
    #[must_use]
    pub const fn cur_mode(psl: u32) -> AccessMode {
        AccessMode::from_bits((psl & CUR_MOD_MASK) >> CUR_MOD_SHIFT)
    }

    /// Previous access mode.
    #[must_use]
    pub const fn prv_mode(psl: u32) -> AccessMode {
        AccessMode::from_bits((psl & PRV_MOD_MASK) >> PRV_MOD_SHIFT)
    }

    /// Interrupt priority level (0-31).
    #[must_use]
    pub const fn ipl(psl: u32) -> u8 {
        ((psl & IPL_MASK) >> IPL_SHIFT) as u8
    }

    /// Replace the IPL field.
    #[must_use]
    pub const fn with_ipl(psl: u32, ipl: u8) -> u32 {
        (psl & !IPL_MASK) | ((ipl as u32 & 0x1F) << IPL_SHIFT)
    }

    /// Replace both mode fields.
    #[must_use]
    pub const fn with_modes(psl: u32, cur: AccessMode, prv: AccessMode) -> u32 {
        (psl & !(CUR_MOD_MASK | PRV_MOD_MASK))
            | (cur.bits() << CUR_MOD_SHIFT)
            | (prv.bits() << PRV_MOD_SHIFT)
    }

    /// Build a PSL from its fields. Everything not named is zero.
    #[must_use]
    pub const fn compose(cur: AccessMode, prv: AccessMode, ipl: u8, cc: u32) -> u32 {
        Self::with_ipl(Self::with_modes(cc & CC_MASK, cur, prv), ipl)
    }

    /// PSL in effect after exception entry: kernel mode, previous mode taken
    /// from the interrupted PSL, IPL as given, everything else clear.
    #[must_use]
    pub const fn exception_entry(old: u32, ipl: u8) -> u32 {
        Self::compose(AccessMode::Kernel, Self::cur_mode(old), ipl, 0)
    }

    /// Replace the condition codes. C is only touched when `writes_carry`.
    #[must_use]
    pub fn set_cc(psl: u32, flags: Flags, writes_carry: bool) -> u32 {
        let mut result = psl & !(N | Z | V);
        result |= Self::bit(N, flags.n) | Self::bit(Z, flags.z) | Self::bit(V, flags.v);
        if writes_carry {
            result = (result & !C) | Self::bit(C, flags.c);
        }
        result
    }

    /// Set a flag if condition is true, clear if false.
    #[must_use]
    pub const fn set_if(psl: u32, flag: u32, condition: bool) -> u32 {
        if condition { psl | flag } else { psl & !flag }
    }

    const fn bit(flag: u32, set: bool) -> u32 {
        if set { flag } else { 0 }
    }

    /// Evaluate a branch condition.
    #[must_use]
    pub const fn condition(psl: u32, cond: Cond) -> bool {
        let n = psl & N != 0;
        let z = psl & Z != 0;
        let v = psl & V != 0;
        let c = psl & C != 0;
        match cond {
            Cond::Always => true,
            Cond::Neq => !z,
            Cond::Eql => z,
            Cond::Gtr => !(n || z),
            Cond::Leq => n || z,
            Cond::Geq => !n,
            Cond::Lss => n,
            Cond::Gtru => !(c || z),
            Cond::Lequ => c || z,
            Cond::Vc => !v,
            Cond::Vs => v,
            Cond::Cc => !c,
            Cond::Cs => c,
        }
    }
}
