use core::cmp::Ordering;
use core::fmt::{Debug, Display};
use core::hash::Hash;
use core::marker::PhantomData;
use core::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Sub};

use num_bigint::{BigInt, Sign};

use crate::domains::*;

/// Selects how a fixed-width integer interprets its bits.
pub trait Signedness: Copy + Clone + PartialEq + Eq + Hash + Debug + Default {
    const SIGNED: bool;

    fn type_min(bits: u16) -> BigInt;
    fn type_max(bits: u16) -> BigInt;
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Signed;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Unsigned;

impl Signedness for Signed {
    const SIGNED: bool = true;

    fn type_min(bits: u16) -> BigInt {
        -(BigInt::from(1u8) << (usize::from(bits) - 1))
    }

    fn type_max(bits: u16) -> BigInt {
        (BigInt::from(1u8) << (usize::from(bits) - 1)) - 1
    }
}

impl Signedness for Unsigned {
    const SIGNED: bool = false;

    fn type_min(_bits: u16) -> BigInt {
        BigInt::from(0u8)
    }

    fn type_max(bits: u16) -> BigInt {
        (BigInt::from(1u8) << usize::from(bits)) - 1
    }
}

/// Bit width of an integer type, the context needed to build Top and Bottom.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BitWidth(pub u16);

/// A closed range `[min, max]` of a fixed-width Solidity integer. Arithmetic
/// wraps modulo `2^bits`; explicit casts saturate.
///
/// Bottom has exactly one representation: no bounds at all.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Interval<S: Signedness> {
    bits: u16,
    bounds: Option<(BigInt, BigInt)>,
    _sign: PhantomData<S>,
}

pub type IntInterval = Interval<Signed>;
pub type UIntInterval = Interval<Unsigned>;

fn zero() -> BigInt {
    BigInt::from(0u8)
}

fn one() -> BigInt {
    BigInt::from(1u8)
}

fn min_max(values: impl IntoIterator<Item = BigInt>) -> Option<(BigInt, BigInt)> {
    let mut values = values.into_iter();
    let first = values.next()?;
    Some(values.fold((first.clone(), first), |(lo, hi), v| {
        if v < lo {
            (v, hi)
        } else if v > hi {
            (lo, v)
        } else {
            (lo, hi)
        }
    }))
}

impl<S: Signedness> Interval<S> {
    fn from_bounds(bits: u16, bounds: Option<(BigInt, BigInt)>) -> Self {
        Self {
            bits,
            bounds,
            _sign: PhantomData,
        }
    }

    /// Builds `[min, max]`, saturating both ends into the type's range. An
    /// inverted range is Bottom.
    pub fn new(min: impl Into<BigInt>, max: impl Into<BigInt>, bits: u16) -> Self {
        let (min, max) = (min.into(), max.into());
        if min > max {
            return Self::from_bounds(bits, None);
        }
        Self::from_bounds(bits, Some((Self::saturate(min, bits), Self::saturate(max, bits))))
    }

    /// Like [`Interval::new`], but rejects ranges that do not fit the type.
    pub fn try_new(min: impl Into<BigInt>, max: impl Into<BigInt>, bits: u16) -> Result<Self, DomainError> {
        let (min, max) = (min.into(), max.into());
        if bits == 0 {
            return Err(DomainError::ZeroWidth);
        }
        if min > max {
            return Err(DomainError::EmptyRange(min.to_string(), max.to_string()));
        }
        for bound in [&min, &max] {
            if *bound < S::type_min(bits) || *bound > S::type_max(bits) {
                return Err(DomainError::OutOfRange(bound.to_string(), bits));
            }
        }
        Ok(Self::from_bounds(bits, Some((min, max))))
    }

    pub fn singleton(value: impl Into<BigInt>, bits: u16) -> Self {
        let value = value.into();
        Self::new(value.clone(), value, bits)
    }

    /// Builds the abstraction of an exact range of mathematical integers,
    /// wrapping it into the type. If the wrapped range is not contiguous the
    /// result is Top.
    pub fn from_exact(min: BigInt, max: BigInt, bits: u16) -> Self {
        if min > max {
            return Self::from_bounds(bits, None);
        }
        let modulus = one() << usize::from(bits);
        if &max - &min + 1 >= modulus {
            return Self::top(&BitWidth(bits));
        }
        let (lo, hi) = (Self::wrap(&min, bits), Self::wrap(&max, bits));
        if lo <= hi {
            Self::from_bounds(bits, Some((lo, hi)))
        } else {
            Self::top(&BitWidth(bits))
        }
    }

    fn wrap(value: &BigInt, bits: u16) -> BigInt {
        let modulus = one() << usize::from(bits);
        let rem = ((value % &modulus) + &modulus) % &modulus;
        if S::SIGNED && rem > S::type_max(bits) {
            rem - modulus
        } else {
            rem
        }
    }

    fn saturate(value: BigInt, bits: u16) -> BigInt {
        let (lo, hi) = (S::type_min(bits), S::type_max(bits));
        if value < lo {
            lo
        } else if value > hi {
            hi
        } else {
            value
        }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn width(&self) -> BitWidth {
        BitWidth(self.bits)
    }

    pub fn bounds(&self) -> Option<(&BigInt, &BigInt)> {
        self.bounds.as_ref().map(|(lo, hi)| (lo, hi))
    }

    pub fn min(&self) -> Option<&BigInt> {
        self.bounds.as_ref().map(|(lo, _)| lo)
    }

    pub fn max(&self) -> Option<&BigInt> {
        self.bounds.as_ref().map(|(_, hi)| hi)
    }

    pub fn is_bottom(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn is_top(&self) -> bool {
        *self == Self::top(&self.width())
    }

    pub fn as_singleton(&self) -> Option<&BigInt> {
        match &self.bounds {
            Some((lo, hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    pub fn contains(&self, value: &BigInt) -> bool {
        self.bounds
            .as_ref()
            .is_some_and(|(lo, hi)| lo <= value && value <= hi)
    }

    /// Number of values in the range minus one, `None` for Bottom.
    pub fn span(&self) -> Option<BigInt> {
        self.bounds.as_ref().map(|(lo, hi)| hi - lo)
    }

    fn bottom_like(&self) -> Self {
        Self::from_bounds(self.bits, None)
    }

    fn both<'a>(&'a self, other: &'a Self) -> Option<((&'a BigInt, &'a BigInt), (&'a BigInt, &'a BigInt))> {
        Some((self.bounds()?, other.bounds()?))
    }

    /// Saturating conversion to another integer type.
    pub fn cast<T: Signedness>(&self, bits: u16) -> Interval<T> {
        match self.bounds() {
            None => Interval::from_bounds(bits, None),
            Some((lo, hi)) => Interval::<T>::new(lo.clone(), hi.clone(), bits),
        }
    }

    pub fn pow(&self, exponent: &UIntInterval) -> Self {
        let Some(((lo, hi), (e_lo, e_hi))) = self.bounds().zip(exponent.bounds()) else {
            return self.bottom_like();
        };
        let modulus = one() << usize::from(self.bits);
        if let (Some(base), Some(exp)) = (self.as_singleton(), exponent.as_singleton()) {
            let base = ((base % &modulus) + &modulus) % &modulus;
            let result = base.modpow(exp, &modulus);
            return Self::from_exact(result.clone(), result, self.bits);
        }
        // Any base with magnitude of at least 2 overflows the type after
        // `bits` multiplications.
        let large_base = *lo <= BigInt::from(-2) || *hi >= BigInt::from(2);
        if large_base && *e_hi > BigInt::from(self.bits) {
            return Self::top(&self.width());
        }
        let (Ok(e_lo), Ok(e_hi)) = (u32::try_from(e_lo), u32::try_from(e_hi)) else {
            return Self::top(&self.width());
        };
        let mut bases = vec![lo.clone(), hi.clone()];
        bases.extend(
            [-1, 0, 1]
                .into_iter()
                .map(BigInt::from)
                .filter(|b| self.contains(b)),
        );
        let mut exponents = vec![e_lo, e_hi];
        exponents.extend([e_lo.saturating_add(1), e_hi.saturating_sub(1)].into_iter().filter(|e| (e_lo..=e_hi).contains(e)));
        let candidates = bases
            .iter()
            .flat_map(|b| exponents.iter().map(move |&e| b.pow(e)));
        match min_max(candidates) {
            Some((min, max)) => Self::from_exact(min, max, self.bits),
            None => self.bottom_like(),
        }
    }

    pub fn shl(&self, amount: &UIntInterval) -> Self {
        let Some(((lo, hi), (s_lo, s_hi))) = self.bounds().zip(amount.bounds()) else {
            return self.bottom_like();
        };
        let bits = BigInt::from(self.bits);
        let first = if *s_lo > bits { bits.clone() } else { s_lo.clone() };
        let last = if *s_hi > bits { bits } else { s_hi.clone() };
        let (Ok(first), Ok(last)) = (usize::try_from(&first), usize::try_from(&last)) else {
            return Self::top(&self.width());
        };
        (first..=last).fold(self.bottom_like(), |acc, shift| {
            let shifted = Self::from_exact(lo << shift, hi << shift, self.bits);
            acc.join(&shifted, &self.width())
        })
    }

    /// Arithmetic shift for signed values, logical for unsigned ones. Both
    /// round towards negative infinity.
    pub fn shr(&self, amount: &UIntInterval) -> Self {
        let Some(((lo, hi), (s_lo, s_hi))) = self.bounds().zip(amount.bounds()) else {
            return self.bottom_like();
        };
        let bits = BigInt::from(self.bits);
        let clamp = |s: &BigInt| usize::try_from(if *s > bits { &bits } else { s }).unwrap_or(0);
        let shifts = [clamp(s_lo), clamp(s_hi)];
        let candidates = [lo, hi]
            .into_iter()
            .flat_map(|v| shifts.iter().map(move |&s| v >> s));
        match min_max(candidates) {
            Some((min, max)) => Self::from_exact(min, max, self.bits),
            None => self.bottom_like(),
        }
    }

    pub fn eq_(&self, other: &Self) -> BoolInterval {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(other) else {
            return BoolInterval::TOP;
        };
        if lo_a == hi_a && lo_b == hi_b && lo_a == lo_b {
            BoolInterval::TRUE
        } else if hi_a < lo_b || hi_b < lo_a {
            BoolInterval::FALSE
        } else {
            BoolInterval::TOP
        }
    }

    pub fn ne_(&self, other: &Self) -> BoolInterval {
        self.eq_(other).not()
    }

    pub fn lt_(&self, other: &Self) -> BoolInterval {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(other) else {
            return BoolInterval::TOP;
        };
        if hi_a < lo_b {
            BoolInterval::TRUE
        } else if lo_a >= hi_b {
            BoolInterval::FALSE
        } else {
            BoolInterval::TOP
        }
    }

    pub fn le_(&self, other: &Self) -> BoolInterval {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(other) else {
            return BoolInterval::TOP;
        };
        if hi_a <= lo_b {
            BoolInterval::TRUE
        } else if lo_a > hi_b {
            BoolInterval::FALSE
        } else {
            BoolInterval::TOP
        }
    }

    pub fn gt_(&self, other: &Self) -> BoolInterval {
        other.lt_(self)
    }

    pub fn ge_(&self, other: &Self) -> BoolInterval {
        other.le_(self)
    }

    fn add_impl(&self, rhs: &Self) -> Self {
        match self.both(rhs) {
            None => self.bottom_like(),
            Some(((lo_a, hi_a), (lo_b, hi_b))) => Self::from_exact(lo_a + lo_b, hi_a + hi_b, self.bits),
        }
    }

    fn sub_impl(&self, rhs: &Self) -> Self {
        match self.both(rhs) {
            None => self.bottom_like(),
            Some(((lo_a, hi_a), (lo_b, hi_b))) => Self::from_exact(lo_a - hi_b, hi_a - lo_b, self.bits),
        }
    }

    fn mul_impl(&self, rhs: &Self) -> Self {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(rhs) else {
            return self.bottom_like();
        };
        let products = [lo_a * lo_b, lo_a * hi_b, hi_a * lo_b, hi_a * hi_b];
        match min_max(products) {
            Some((min, max)) => Self::from_exact(min, max, self.bits),
            None => self.bottom_like(),
        }
    }

    /// Division truncates towards zero. A zero divisor reverts, so only the
    /// non-zero part of the divisor contributes.
    fn div_impl(&self, rhs: &Self) -> Self {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(rhs) else {
            return self.bottom_like();
        };
        let mut parts = Vec::new();
        if lo_b.sign() == Sign::Minus {
            parts.push((lo_b.clone(), if hi_b.sign() == Sign::Minus { hi_b.clone() } else { BigInt::from(-1) }));
        }
        if hi_b.sign() == Sign::Plus {
            parts.push((if lo_b.sign() == Sign::Plus { lo_b.clone() } else { one() }, hi_b.clone()));
        }
        let quotients = parts.iter().flat_map(|(d_lo, d_hi)| {
            [lo_a / d_lo, lo_a / d_hi, hi_a / d_lo, hi_a / d_hi]
        });
        match min_max(quotients) {
            Some((min, max)) => Self::from_exact(min, max, self.bits),
            None => self.bottom_like(),
        }
    }

    /// The remainder takes the sign of the dividend, like Solidity's `%`.
    fn rem_impl(&self, rhs: &Self) -> Self {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(rhs) else {
            return self.bottom_like();
        };
        if lo_b.sign() == Sign::NoSign && hi_b.sign() == Sign::NoSign {
            return self.bottom_like();
        }
        if let (Some(a), Some(d)) = (self.as_singleton(), rhs.as_singleton()) {
            let r = a % d;
            return Self::from_exact(r.clone(), r, self.bits);
        }
        let largest = lo_b.magnitude().max(hi_b.magnitude());
        let bound: BigInt = BigInt::from(largest.clone()) - 1;
        let neg_bound = -bound.clone();
        let lo = if lo_a.sign() == Sign::Minus {
            if *lo_a < neg_bound { neg_bound } else { lo_a.clone() }
        } else {
            zero()
        };
        let hi = if hi_a.sign() == Sign::Plus {
            if *hi_a > bound { bound } else { hi_a.clone() }
        } else {
            zero()
        };
        Self::from_exact(lo, hi, self.bits)
    }

    fn neg_impl(&self) -> Self {
        match self.bounds() {
            None => self.bottom_like(),
            Some((lo, hi)) => Self::from_exact(-hi, -lo, self.bits),
        }
    }

    fn not_impl(&self) -> Self {
        match self.bounds() {
            None => self.bottom_like(),
            Some((lo, hi)) if S::SIGNED => Self::from_exact(-hi - 1, -lo - 1, self.bits),
            Some((lo, hi)) => {
                let max = S::type_max(self.bits);
                Self::from_exact(&max - hi, &max - lo, self.bits)
            }
        }
    }

    fn bitwise(&self, rhs: &Self, op: impl Fn(&BigInt, &BigInt) -> BigInt, ranged: impl Fn(&BigInt, &BigInt, &BigInt, &BigInt) -> (BigInt, BigInt)) -> Self {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(rhs) else {
            return self.bottom_like();
        };
        if let (Some(a), Some(b)) = (self.as_singleton(), rhs.as_singleton()) {
            let r = op(a, b);
            return Self::from_exact(r.clone(), r, self.bits);
        }
        if lo_a.sign() == Sign::Minus || lo_b.sign() == Sign::Minus {
            return Self::top(&self.width());
        }
        let (lo, hi) = ranged(lo_a, hi_a, lo_b, hi_b);
        Self::from_exact(lo, hi, self.bits)
    }
}

/// Smallest `2^k - 1` that is at least `value`.
fn all_ones_above(value: &BigInt) -> BigInt {
    (one() << value.bits() as usize) - 1
}

impl<S: Signedness> Debug for Interval<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let prefix = if S::SIGNED { "int" } else { "uint" };
        write!(f, "{prefix}{}{self}", self.bits)
    }
}

impl<S: Signedness> Display for Interval<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.bounds {
            None => write!(f, "⊥"),
            Some((lo, hi)) => write!(f, "[{lo}, {hi}]"),
        }
    }
}

impl<S: Signedness> PartialOrd for Interval<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.bounds, &other.bounds) {
            (None, None) => Some(Ordering::Equal),
            (None, Some(_)) => Some(Ordering::Less),
            (Some(_), None) => Some(Ordering::Greater),
            (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => containment(lo_a, hi_a, lo_b, hi_b),
        }
    }
}

impl<S: Signedness> JoinSemiLattice for Interval<S> {
    type LatticeContext = BitWidth;

    fn bottom(ctx: &Self::LatticeContext) -> Self {
        Self::from_bounds(ctx.0, None)
    }

    fn join(&self, other: &Self, _: &Self::LatticeContext) -> Self {
        let bits = self.bits.max(other.bits);
        match (&self.bounds, &other.bounds) {
            (None, None) => Self::from_bounds(bits, None),
            (Some(b), None) | (None, Some(b)) => Self::from_bounds(bits, Some(b.clone())),
            (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => {
                Self::from_bounds(bits, Some((lo_a.min(lo_b).clone(), hi_a.max(hi_b).clone())))
            }
        }
    }

    fn widen(&self, previous: &Self, _: &Self::LatticeContext, _iteration: usize) -> Self {
        let (Some((lo, hi)), Some((prev_lo, prev_hi))) = (&self.bounds, &previous.bounds) else {
            return self.join(previous, &self.width());
        };
        let lo = if lo < prev_lo { S::type_min(self.bits) } else { prev_lo.clone() };
        let hi = if hi > prev_hi { S::type_max(self.bits) } else { prev_hi.clone() };
        Self::from_bounds(self.bits, Some((lo, hi)))
    }
}

impl<S: Signedness> Lattice for Interval<S> {
    fn top(ctx: &Self::LatticeContext) -> Self {
        Self::from_bounds(ctx.0, Some((S::type_min(ctx.0), S::type_max(ctx.0))))
    }

    fn meet(&self, other: &Self, _: &Self::LatticeContext) -> Self {
        let Some(((lo_a, hi_a), (lo_b, hi_b))) = self.both(other) else {
            return self.bottom_like();
        };
        let (lo, hi) = (lo_a.max(lo_b), hi_a.min(hi_b));
        // Only one representation for bottom.
        if lo > hi {
            self.bottom_like()
        } else {
            Self::from_bounds(self.bits, Some((lo.clone(), hi.clone())))
        }
    }

    fn narrow(&self, previous: &Self, _: &Self::LatticeContext, _iteration: usize) -> Self {
        let (Some((lo, hi)), Some((prev_lo, prev_hi))) = (&self.bounds, &previous.bounds) else {
            return self.bottom_like();
        };
        let lo = if *prev_lo == S::type_min(self.bits) { lo } else { prev_lo };
        let hi = if *prev_hi == S::type_max(self.bits) { hi } else { prev_hi };
        Self::new(lo.clone(), hi.clone(), self.bits)
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident, $imp:ident) => {
        impl<S: Signedness> $trait for Interval<S> {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                self.$imp(&rhs)
            }
        }

        impl<'a, S: Signedness> $trait<&'a Interval<S>> for &'a Interval<S> {
            type Output = Interval<S>;

            fn $method(self, rhs: &'a Interval<S>) -> Interval<S> {
                self.$imp(rhs)
            }
        }
    };
}

forward_binop!(Add, add, add_impl);
forward_binop!(Sub, sub, sub_impl);
forward_binop!(Mul, mul, mul_impl);
forward_binop!(Div, div, div_impl);
forward_binop!(Rem, rem, rem_impl);

impl<S: Signedness> Neg for Interval<S> {
    type Output = Self;

    fn neg(self) -> Self {
        self.neg_impl()
    }
}

impl<S: Signedness> Neg for &Interval<S> {
    type Output = Interval<S>;

    fn neg(self) -> Interval<S> {
        self.neg_impl()
    }
}

impl<S: Signedness> Not for &Interval<S> {
    type Output = Interval<S>;

    fn not(self) -> Interval<S> {
        self.not_impl()
    }
}

impl<S: Signedness> Not for Interval<S> {
    type Output = Self;

    fn not(self) -> Self {
        self.not_impl()
    }
}

impl<'a, S: Signedness> BitAnd<&'a Interval<S>> for &'a Interval<S> {
    type Output = Interval<S>;

    fn bitand(self, rhs: &'a Interval<S>) -> Interval<S> {
        self.bitwise(rhs, |a, b| a & b, |_, hi_a, _, hi_b| (zero(), hi_a.min(hi_b).clone()))
    }
}

impl<'a, S: Signedness> BitOr<&'a Interval<S>> for &'a Interval<S> {
    type Output = Interval<S>;

    fn bitor(self, rhs: &'a Interval<S>) -> Interval<S> {
        self.bitwise(rhs, |a, b| a | b, |lo_a, hi_a, lo_b, hi_b| {
            (lo_a.max(lo_b).clone(), all_ones_above(hi_a.max(hi_b)))
        })
    }
}

impl<'a, S: Signedness> BitXor<&'a Interval<S>> for &'a Interval<S> {
    type Output = Interval<S>;

    fn bitxor(self, rhs: &'a Interval<S>) -> Interval<S> {
        self.bitwise(rhs, |a, b| a ^ b, |_, hi_a, _, hi_b| (zero(), all_ones_above(hi_a.max(hi_b))))
    }
}
