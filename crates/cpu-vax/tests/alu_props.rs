//! ALU condition codes checked against a wide-integer reference.

use cpu_vax::{AluOp, apply, apply_sized};
use emu_core::Size;
use proptest::prelude::*;

fn signed(value: u32, size: Size) -> i64 {
    i64::from(size.sign_extend(value & size.mask()) as i32)
}

fn size_strategy() -> impl Strategy<Value = Size> {
    prop_oneof![Just(Size::Byte), Just(Size::Word), Just(Size::Long)]
}

proptest! {
    #[test]
    fn add_matches_reference(a in any::<u32>(), b in any::<u32>(), size in size_strategy()) {
        let mask = size.mask();
        let (r, f) = apply_sized(AluOp::Add, a, b, size);
        let unsigned = u64::from(a & mask) + u64::from(b & mask);
        let exact = signed(a, size) + signed(b, size);

        prop_assert_eq!(r, (unsigned as u32) & mask);
        prop_assert_eq!(f.n, signed(r, size) < 0);
        prop_assert_eq!(f.z, r == 0);
        prop_assert_eq!(f.v, signed(r, size) != exact);
        prop_assert_eq!(f.c, unsigned > u64::from(mask));
    }

    #[test]
    fn sub_matches_reference(a in any::<u32>(), b in any::<u32>(), size in size_strategy()) {
        let mask = size.mask();
        let (r, f) = apply_sized(AluOp::Sub, a, b, size);
        let exact = signed(a, size) - signed(b, size);

        prop_assert_eq!(r, a.wrapping_sub(b) & mask);
        prop_assert_eq!(f.n, signed(r, size) < 0);
        prop_assert_eq!(f.z, r == 0);
        prop_assert_eq!(f.v, signed(r, size) != exact);
        prop_assert_eq!(f.c, (a & mask) < (b & mask));
    }

    #[test]
    fn compare_orders_like_subtraction(a in any::<u32>(), b in any::<u32>()) {
        let (_, f) = apply(AluOp::Cmp, a, b);
        prop_assert_eq!(f.n, (a as i32) < (b as i32));
        prop_assert_eq!(f.z, a == b);
        prop_assert_eq!(f.c, a < b);
        prop_assert!(!f.v);
    }

    #[test]
    fn multiply_overflow_matches_reference(a in any::<i32>(), b in any::<i32>()) {
        let (r, f) = apply(AluOp::Mul, a as u32, b as u32);
        let exact = i64::from(a) * i64::from(b);
        prop_assert_eq!(r, exact as u32);
        prop_assert_eq!(f.v, i64::from(r as i32) != exact);
    }

    #[test]
    fn logic_ops_clear_v_and_keep_c_untouched(a in any::<u32>(), b in any::<u32>()) {
        for op in [AluOp::And, AluOp::Or, AluOp::Xor, AluOp::Bic] {
            let (r, f) = apply(op, a, b);
            prop_assert!(!f.v);
            prop_assert!(!op.writes_carry());
            prop_assert_eq!(f.z, r == 0);
            prop_assert_eq!(f.n, (r as i32) < 0);
        }
    }
}

#[test]
fn test_divide_by_zero_returns_dividend() {
    let (r, f) = apply(AluOp::Div, 1234, 0);
    assert_eq!(r, 1234);
    assert!(f.v);
}

#[test]
fn test_divide_most_negative_by_minus_one_overflows() {
    let (r, f) = apply(AluOp::Div, 0x8000_0000, u32::MAX);
    assert_eq!(r, 0x8000_0000);
    assert!(f.v);
}
