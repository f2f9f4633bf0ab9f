//! Arithmetic and logic unit.
//!
//! A pure function from an operation and two operands to a result and the
//! four condition flags. Operands are taken at the operation width; byte
//! and word results come back zero-extended.
//!
//! Operand order follows the instruction semantics: `a` is the value being
//! operated on (minuend, dividend, shifted source), `b` is the modifier
//! (subtrahend, divisor, shift count).

use emu_core::Size;

/// Condition flags produced by an ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub n: bool,
    pub z: bool,
    pub v: bool,
    pub c: bool,
}

/// ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    /// `a + b`.
    Add,
    /// `a - b`.
    Sub,
    /// Signed `a * b`.
    Mul,
    /// Signed `a / b`, truncating toward zero.
    Div,
    /// `a & b`.
    And,
    /// `a | b`.
    Or,
    /// `a ^ b`.
    Xor,
    /// `a & !b`.
    Bic,
    /// Arithmetic shift of `a` by the signed byte count in `b`.
    Ash,
    /// Rotate `a` left by the signed byte count in `b`, modulo 32.
    Rot,
    /// Compare `a` with `b`; result is `a - b`, flags are the relation.
    Cmp,
    /// `a & b`, C and V cleared. Used by TST with `b` all ones.
    Test,
    /// Pass `a` through.
    Move,
}

impl AluOp {
    /// Whether this operation defines the C flag. Operations that do not
    /// leave the processor's C bit as it was.
    #[must_use]
    pub const fn writes_carry(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Ash | Self::Cmp | Self::Test
        )
    }
}

/// Apply a 32-bit ALU operation.
#[must_use]
pub fn apply(op: AluOp, a: u32, b: u32) -> (u32, Flags) {
    apply_sized(op, a, b, Size::Long)
}

/// Apply an ALU operation at the given width.
#[must_use]
pub fn apply_sized(op: AluOp, a: u32, b: u32, size: Size) -> (u32, Flags) {
    let mask = size.mask();
    let sign = size.sign_bit();
    let a = a & mask;
    let b = b & mask;
    let sa = i64::from(size.sign_extend(a) as i32);
    let sb = i64::from(size.sign_extend(b) as i32);

    let (result, v, c) = match op {
        AluOp::Add => {
            let wide = u64::from(a) + u64::from(b);
            let r = (wide as u32) & mask;
            let v = (a ^ r) & (b ^ r) & sign != 0;
            (r, v, wide > u64::from(mask))
        }
        AluOp::Sub => {
            let r = a.wrapping_sub(b) & mask;
            let v = (a ^ b) & (a ^ r) & sign != 0;
            (r, v, a < b)
        }
        AluOp::Mul => {
            let product = sa * sb;
            let r = (product as u32) & mask;
            (r, i64::from(size.sign_extend(r) as i32) != product, false)
        }
        AluOp::Div => {
            if b == 0 {
                (a, true, false)
            } else {
                let quotient = sa / sb;
                let r = (quotient as u32) & mask;
                (r, i64::from(size.sign_extend(r) as i32) != quotient, false)
            }
        }
        AluOp::And | AluOp::Test => (a & b, false, false),
        AluOp::Or => (a | b, false, false),
        AluOp::Xor => (a ^ b, false, false),
        AluOp::Bic => (a & !b, false, false),
        AluOp::Ash => shift(sa, b as u8 as i8, size),
        AluOp::Rot => {
            let count = i32::from(b as u8 as i8).rem_euclid(32) as u32;
            (a.rotate_left(count), false, false)
        }
        AluOp::Cmp => {
            let flags = Flags {
                n: sa < sb,
                z: a == b,
                v: false,
                c: a < b,
            };
            return (a.wrapping_sub(b) & mask, flags);
        }
        AluOp::Move => (a, false, false),
    };

    let flags = Flags {
        n: result & sign != 0,
        z: result == 0,
        v,
        c,
    };
    (result, flags)
}

/// Arithmetic shift. Positive counts shift left, negative right; counts at
/// or past the width saturate.
fn shift(value: i64, count: i8, size: Size) -> (u32, bool, bool) {
    let bits = size.bits() as i32;
    let mask = size.mask();
    let count = i32::from(count);
    if count >= 0 {
        if count >= bits {
            return (0, value != 0, false);
        }
        let wide = value << count;
        let r = (wide as u32) & mask;
        (r, i64::from(size.sign_extend(r) as i32) != wide, false)
    } else if -count >= bits {
        let r = if value < 0 { mask } else { 0 };
        (r, false, false)
    } else {
        ((value >> -count) as u32 & mask, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sets_overflow_on_same_sign_inputs() {
        let (r, f) = apply(AluOp::Add, 0x7FFF_FFFF, 1);
        assert_eq!(r, 0x8000_0000);
        assert!(f.v && f.n && !f.c && !f.z);
    }

    #[test]
    fn add_carry_out_to_zero() {
        let (r, f) = apply(AluOp::Add, 0xFFFF_FFFF, 1);
        assert_eq!(r, 0);
        assert!(f.z && f.c && !f.v);
    }

    #[test]
    fn byte_add_flags_at_byte_width() {
        let (r, f) = apply_sized(AluOp::Add, 0x7F, 1, Size::Byte);
        assert_eq!(r, 0x80);
        assert!(f.v && f.n);
        let (r, f) = apply_sized(AluOp::Add, 0x1FF, 1, Size::Byte);
        assert_eq!(r, 0);
        assert!(f.z && f.c);
    }

    #[test]
    fn sub_borrow_and_overflow() {
        let (r, f) = apply(AluOp::Sub, 0, 1);
        assert_eq!(r, 0xFFFF_FFFF);
        assert!(f.c && f.n && !f.v);
        let (_, f) = apply(AluOp::Sub, 0x8000_0000, 1);
        assert!(f.v);
    }

    #[test]
    fn multiply_overflow() {
        let (r, f) = apply(AluOp::Mul, 0x0001_0000, 0x0001_0000);
        assert_eq!(r, 0);
        assert!(f.v);
        let (r, f) = apply(AluOp::Mul, (-3i32) as u32, 7);
        assert_eq!(r as i32, -21);
        assert!(!f.v && f.n);
    }

    #[test]
    fn divide_by_zero_flags_overflow() {
        let (r, f) = apply(AluOp::Div, 100, 0);
        assert_eq!(r, 100);
        assert!(f.v);
        let (r, f) = apply(AluOp::Div, (-7i32) as u32, 2);
        assert_eq!(r as i32, -3);
        assert!(!f.v);
        let (_, f) = apply(AluOp::Div, 0x8000_0000, 0xFFFF_FFFF);
        assert!(f.v);
    }

    #[test]
    fn arithmetic_shift_saturates() {
        assert_eq!(apply(AluOp::Ash, 1, 4).0, 16);
        assert_eq!(apply(AluOp::Ash, 0x8000_0000, (-4i8) as u8 as u32).0, 0xF800_0000);
        assert_eq!(apply(AluOp::Ash, 5, 40).0, 0);
        assert_eq!(apply(AluOp::Ash, 0x8000_0000, (-40i8) as u8 as u32).0, 0xFFFF_FFFF);
        assert_eq!(apply(AluOp::Ash, 0x7000_0000, (-40i8) as u8 as u32).0, 0);
        let (_, f) = apply(AluOp::Ash, 0x4000_0000, 1);
        assert!(f.v);
    }

    #[test]
    fn rotate_left() {
        assert_eq!(apply(AluOp::Rot, 0x8000_0001, 1).0, 3);
        assert_eq!(apply(AluOp::Rot, 0x8000_0001, (-1i8) as u8 as u32).0, 0xC000_0000);
    }

    #[test]
    fn compare_is_signed_for_n_and_unsigned_for_c() {
        let (_, f) = apply(AluOp::Cmp, (-1i32) as u32, 1);
        assert!(f.n && !f.c && !f.z && !f.v);
        let (_, f) = apply(AluOp::Cmp, 1, 2);
        assert!(f.n && f.c);
        let (_, f) = apply(AluOp::Cmp, 5, 5);
        assert!(f.z && !f.n && !f.c);
    }

    #[test]
    fn logical_ops() {
        assert_eq!(apply(AluOp::Bic, 0xFF, 0x0F).0, 0xF0);
        assert_eq!(apply(AluOp::Xor, 0xFF, 0x0F).0, 0xF0);
        assert_eq!(apply(AluOp::Or, 0xF0, 0x0F).0, 0xFF);
        let (r, f) = apply(AluOp::Test, 0, 0xFFFF_FFFF);
        assert!(r == 0 && f.z);
    }
}
