use core::cmp::Ordering;

use crate::domains::*;
use num_bigint::{BigInt, BigUint};

fn uint(lo: i64, hi: i64) -> UIntInterval {
    UIntInterval::new(lo, hi, 256)
}

fn int(lo: i64, hi: i64) -> IntInterval {
    IntInterval::new(lo, hi, 256)
}

fn u8_(lo: i64, hi: i64) -> UIntInterval {
    UIntInterval::new(lo, hi, 8)
}

fn i8_(lo: i64, hi: i64) -> IntInterval {
    IntInterval::new(lo, hi, 8)
}

fn addrs(ids: &[u32]) -> AddressSet {
    ids.iter().map(|&id| BigUint::from(id)).collect()
}

#[test]
fn interval_lattice_laws() {
    let w = BitWidth(256);
    let bottom = UIntInterval::bottom(&w);
    let top = UIntInterval::top(&w);
    let samples = [bottom.clone(), top.clone(), uint(0, 0), uint(3, 9), uint(5, 20), uint(100, 100)];

    for a in &samples {
        assert_eq!(a.join(a, &w), *a);
        assert_eq!(a.meet(a, &w), *a);
        assert_eq!(bottom.join(a, &w), *a);
        assert_eq!(top.meet(a, &w), *a);
        assert_eq!(top.join(a, &w), top);
        for b in &samples {
            let joined = a.join(b, &w);
            assert_eq!(joined, b.join(a, &w));
            assert!(*a <= joined);
            assert!(*b <= joined);
            let met = a.meet(b, &w);
            assert!(met <= *a);
            assert!(met <= *b);
            for c in &samples {
                assert_eq!(a.join(&b.join(c, &w), &w), a.join(b, &w).join(c, &w));
            }
        }
    }
}

#[test]
fn interval_bottom_is_canonical() {
    let w = BitWidth(256);
    assert_eq!(uint(1, 2).meet(&uint(5, 6), &w), UIntInterval::bottom(&w));
    assert_eq!(uint(7, 3), UIntInterval::bottom(&w));
    assert!(uint(7, 3).is_bottom());
    assert_eq!(UIntInterval::bottom(&w).to_string(), "⊥");
    assert_eq!(uint(1, 2).to_string(), "[1, 2]");
}

#[test]
fn interval_tops() {
    let top = UIntInterval::top(&BitWidth(256));
    assert_eq!(top.min(), Some(&BigInt::from(0)));
    assert_eq!(top.max(), Some(&((BigInt::from(1) << 256usize) - 1)));
    let top = IntInterval::top(&BitWidth(8));
    assert_eq!(top, i8_(-128, 127));
    assert!(top.is_top());
}

#[test]
fn interval_comparisons() {
    assert_eq!(int(5, 5).eq_(&int(5, 5)), BoolInterval::new(1, 1));
    assert_eq!(int(1, 3).lt_(&int(5, 9)), BoolInterval::new(1, 1));
    assert_eq!(int(1, 10).lt_(&int(5, 9)), BoolInterval::new(0, 1));
    assert_eq!(int(10, 12).lt_(&int(5, 9)), BoolInterval::FALSE);
    assert_eq!(int(1, 3).eq_(&int(4, 9)), BoolInterval::FALSE);
    assert_eq!(int(1, 3).ne_(&int(4, 9)), BoolInterval::TRUE);
    assert_eq!(int(1, 5).le_(&int(5, 9)), BoolInterval::TRUE);
    assert_eq!(int(5, 9).ge_(&int(1, 5)), BoolInterval::TRUE);
    assert_eq!(int(5, 9).gt_(&int(1, 5)), BoolInterval::TOP);
    let bottom = IntInterval::bottom(&BitWidth(256));
    assert_eq!(bottom.eq_(&int(1, 1)), BoolInterval::TOP);
}

#[test]
fn interval_arithmetic_wraps() {
    assert_eq!(u8_(250, 250) + u8_(10, 10), u8_(4, 4));
    assert_eq!(u8_(0, 0) - u8_(1, 1), u8_(255, 255));
    assert_eq!(i8_(127, 127) + i8_(1, 1), i8_(-128, -128));
    // The wrapped range is not contiguous any more.
    assert_eq!(u8_(250, 255) + u8_(0, 10), UIntInterval::top(&BitWidth(8)));
    assert_eq!(u8_(16, 16) * u8_(16, 16), u8_(0, 0));
    assert_eq!(uint(2, 3) * uint(4, 5), uint(8, 15));
    assert_eq!(int(-2, 3) * int(-4, 5), int(-12, 15));
    assert_eq!(-i8_(-128, -128), i8_(-128, -128));
    assert_eq!(-int(1, 5), int(-5, -1));
}

#[test]
fn interval_bottom_propagates() {
    let w = BitWidth(256);
    let bottom = UIntInterval::bottom(&w);
    assert!((&bottom + &uint(1, 1)).is_bottom());
    assert!((&uint(1, 1) - &bottom).is_bottom());
    assert!((&bottom * &uint(1, 1)).is_bottom());
    assert!((&bottom / &uint(1, 1)).is_bottom());
    assert!((&bottom % &uint(1, 1)).is_bottom());
    assert!(bottom.pow(&uint(1, 1)).is_bottom());
    assert!(uint(1, 1).shl(&bottom).is_bottom());
}

#[test]
fn interval_division() {
    assert_eq!(uint(10, 20) / uint(2, 5), uint(2, 10));
    assert_eq!(int(-7, -7) / int(2, 2), int(-3, -3));
    assert_eq!(int(-10, 10) / int(-2, 2), int(-10, 10));
    assert!((uint(10, 20) / uint(0, 0)).is_bottom());
    // Zero divisors revert, so they do not contribute.
    assert_eq!(uint(10, 20) / uint(0, 5), uint(2, 20));
    assert_eq!(i8_(-128, -128) / i8_(-1, -1), i8_(-128, -128));
}

#[test]
fn interval_modulo() {
    assert_eq!(uint(17, 17) % uint(5, 5), uint(2, 2));
    assert_eq!(int(-7, -7) % int(3, 3), int(-1, -1));
    assert_eq!(uint(0, 100) % uint(1, 10), uint(0, 9));
    assert_eq!(uint(0, 3) % uint(1, 10), uint(0, 3));
    assert_eq!(int(-50, 50) % int(7, 7), int(-6, 6));
    assert!((uint(3, 4) % uint(0, 0)).is_bottom());
}

#[test]
fn interval_power_and_shifts() {
    assert_eq!(uint(2, 2).pow(&uint(10, 10)), uint(1024, 1024));
    assert_eq!(uint(2, 3).pow(&uint(2, 3)), uint(4, 27));
    assert_eq!(int(-2, -2).pow(&uint(3, 3)), int(-8, -8));
    assert_eq!(int(-3, 2).pow(&uint(2, 2)), int(0, 9));
    assert_eq!(u8_(2, 2).pow(&uint(8, 8)), u8_(0, 0));
    assert_eq!(uint(2, 3).pow(&uint(0, 1000)), UIntInterval::top(&BitWidth(256)));

    assert_eq!(u8_(1, 1).shl(&uint(3, 3)), u8_(8, 8));
    assert_eq!(u8_(1, 1).shl(&uint(8, 300)), u8_(0, 0));
    assert_eq!(u8_(1, 3).shl(&uint(0, 1)), u8_(1, 6));
    assert_eq!(u8_(64, 128).shr(&uint(1, 2)), u8_(16, 64));
    assert_eq!(i8_(-8, -8).shr(&uint(1, 1)), i8_(-4, -4));
    assert_eq!(i8_(-1, -1).shr(&uint(100, 100)), i8_(-1, -1));
}

#[test]
fn interval_bitwise() {
    assert_eq!(&u8_(12, 12) & &u8_(10, 10), u8_(8, 8));
    assert_eq!(&u8_(12, 12) | &u8_(3, 3), u8_(15, 15));
    assert_eq!(&u8_(12, 12) ^ &u8_(10, 10), u8_(6, 6));
    assert_eq!(&u8_(0, 12) & &u8_(0, 200), u8_(0, 12));
    assert_eq!(&u8_(1, 2) | &u8_(0, 2), u8_(1, 3));
    assert_eq!(&i8_(-1, 3) & &i8_(0, 3), IntInterval::top(&BitWidth(8)));
    assert_eq!(!u8_(0, 0), u8_(255, 255));
    assert_eq!(!i8_(0, 5), i8_(-6, -1));
}

#[test]
fn interval_casts_saturate() {
    assert_eq!(uint(300, 400).cast::<Unsigned>(8), u8_(255, 255));
    assert_eq!(int(-5, 5).cast::<Unsigned>(256), uint(0, 5));
    assert_eq!(uint(100, 200).cast::<Signed>(8), i8_(100, 127));
    assert!(UIntInterval::bottom(&BitWidth(256)).cast::<Signed>(8).is_bottom());
}

#[test]
fn interval_widen_narrow() {
    let w = BitWidth(8);
    let widened = u8_(0, 2).widen(&u8_(0, 1), &w, 1);
    assert_eq!(widened, u8_(0, 255));
    assert_eq!(u8_(0, 1).widen(&u8_(0, 1), &w, 1), u8_(0, 1));
    assert_eq!(u8_(0, 10).narrow(&widened, &w, 1), u8_(0, 10));
    assert_eq!(u8_(0, 10).narrow(&u8_(0, 20), &w, 1), u8_(0, 20));
}

#[test]
fn interval_try_new_rejects_bad_ranges() {
    assert!(UIntInterval::try_new(-1, 3, 8).is_err());
    assert!(UIntInterval::try_new(3, 1, 8).is_err());
    assert!(UIntInterval::try_new(0, 255, 8).is_ok());
    assert_eq!(UIntInterval::new(-10, 1000, 8), u8_(0, 255));
}

#[test]
fn bool_interval_logic() {
    use BoolInterval as B;
    assert_eq!(B::TRUE.and(&B::TOP), B::TOP);
    assert_eq!(B::FALSE.and(&B::TOP), B::FALSE);
    assert_eq!(B::TRUE.or(&B::TOP), B::TRUE);
    assert_eq!(B::FALSE.or(&B::FALSE), B::FALSE);
    assert_eq!(B::TOP.not(), B::TOP);
    assert_eq!(B::TRUE.not(), B::FALSE);
    assert_eq!(B::BOTTOM.not(), B::BOTTOM);
    assert_eq!(B::TRUE.join_(&B::FALSE), B::TOP);
    assert_eq!(B::TRUE.meet_(&B::FALSE), B::BOTTOM);
    assert_eq!(B::BOTTOM.join_(&B::TRUE), B::TRUE);
    assert!(B::BOTTOM <= B::FALSE);
    assert!(B::FALSE <= B::TOP);
    assert!(!(B::FALSE <= B::TRUE));
    assert_eq!(B::new(1, 0), B::BOTTOM);
    assert_eq!(B::TOP.to_string(), "[0, 1]");
    assert_eq!(B::TRUE.equals(&B::TRUE), B::TRUE);
    assert_eq!(B::TRUE.equals(&B::TOP), B::TOP);
}

#[test]
fn bounded_set_join_and_cap() {
    let small = addrs(&[1, 2, 3]);
    let other = addrs(&[3, 4, 5]);
    assert_eq!(small.join_(&other), addrs(&[1, 2, 3, 4, 5]));

    let eight = addrs(&[1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(!eight.is_top());
    assert!(eight.join_(&addrs(&[9])).is_top());

    let top = AddressSet::top_();
    assert_eq!(top.join_(&small), top);
    assert_eq!(top.meet_(&small), small);
    assert_eq!(small.meet_(&other), addrs(&[3]));
    assert!(AddressSet::bottom_() <= small);
    assert!(small <= top);
    assert!(!(top <= small));
}

#[test]
fn bounded_set_equality() {
    assert_eq!(addrs(&[1]).equals(&addrs(&[1])), BoolInterval::TRUE);
    assert_eq!(addrs(&[1]).equals(&addrs(&[2])), BoolInterval::FALSE);
    assert_eq!(addrs(&[1, 2]).equals(&addrs(&[2])), BoolInterval::TOP);
    assert_eq!(AddressSet::top_().equals(&addrs(&[2])), BoolInterval::TOP);
    assert_eq!(addrs(&[1]).not_equals(&addrs(&[2])), BoolInterval::TRUE);
}

#[test]
fn bounded_set_display() {
    assert_eq!(AddressSet::top_().to_string(), "AddressSet(⊤)");
    assert_eq!(AddressSet::bottom_().to_string(), "AddressSet(⊥)");
    assert_eq!(addrs(&[2, 1]).to_string(), "AddressSet({1, 2})");
    assert_eq!(BytesSet::of(4, 7u8).to_string(), "BytesSet4({7})");
}

#[test]
fn bytes_set_resize() {
    let value = BytesSet::of(4, 0x1234_5678u32);
    assert_eq!(value.resize(2), BytesSet::of(2, 0x1234u32));
    assert_eq!(BytesSet::of(2, 0x1234u32).resize(4), BytesSet::of(4, 0x1234_0000u32));
    assert!(BytesSet::top_of(4).resize(2).is_top());
    assert!(BytesSet::of(32, 0u8).is_zero());
}

#[test]
fn bytes_set_width_survives_bottom() {
    let four = BytesSet::of(4, 7u8);
    assert_eq!(four.join_(&BytesSet::bottom_()), four);
    assert_eq!(BytesSet::bottom_().join_(&four), four);
    assert_eq!(four.meet_(&BytesSet::bottom_()).width(), 4);

    // Ordering agrees with equality across widths.
    let wide = BytesSet::of(32, 7u8);
    assert_ne!(four, wide);
    assert_eq!(four.partial_cmp(&wide), None);
    assert!(BytesSet::bottom_() < four);
    assert!(BytesSet::bottom_of(4) <= four);
    assert_eq!(four.partial_cmp(&four.clone()), Some(Ordering::Equal));
}
