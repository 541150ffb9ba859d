use core::fmt::Display;

use analysis::domains::*;
use itertools::Itertools;
use num_bigint::{BigInt, BigUint};

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::{Error, Result};
use crate::heap::Handle;
use crate::types::SolType;

/// The result of evaluating an expression.
///
/// Scalars carry their abstract value. Composite variables are never copied
/// into a value, they are referred to by their heap handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(IntInterval),
    UInt(UIntInterval),
    Bool(BoolInterval),
    Address(AddressSet),
    Bytes(BytesSet),
    /// Placeholder for values that are not abstracted (`bytes`, `string`,
    /// results of unmodeled calls).
    Symbolic(String),
    Object(Handle),
    Tuple(Vec<Value>),
    /// `block`, `msg`, `tx` or `abi` before the member is applied.
    Namespace(String),
    /// A type used as an expression: struct and enum names, `type(T)`.
    Type(SolType),
    Unit,
}

fn unknown() -> Value {
    Value::Symbolic("unknown".to_owned())
}

/// All values of a small range, `None` if the range is too wide for a set.
fn enumerate(bounds: Option<(&BigInt, &BigInt)>) -> Option<Vec<BigUint>> {
    let (lo, hi) = bounds?;
    if hi - lo >= BigInt::from(SET_CAP) {
        return None;
    }
    let mut values = Vec::new();
    let mut current = lo.clone();
    while current <= *hi {
        values.push(current.to_biguint()?);
        current += 1;
    }
    Some(values)
}

fn set_from_interval<S: Signedness>(interval: &Interval<S>) -> BoundedSet<BigUint> {
    if interval.is_bottom() {
        return BoundedSet::bottom(&());
    }
    match enumerate(interval.bounds()) {
        Some(values) => values.into_iter().collect(),
        None => BoundedSet::top(&()),
    }
}

fn interval_from_set<S: Signedness>(set: &BoundedSet<BigUint>, bits: u16) -> Interval<S> {
    if set.is_top() {
        return Interval::top(&BitWidth(bits));
    }
    let lo = set.iter().next().cloned().map(BigInt::from);
    let hi = set.iter().last().cloned().map(BigInt::from);
    match lo.zip(hi) {
        Some((lo, hi)) => Interval::new(lo, hi, bits),
        None => Interval::bottom(&BitWidth(bits)),
    }
}

fn uint_from_bool(b: &BoolInterval, bits: u16) -> UIntInterval {
    match b.min().zip(b.max()) {
        Some((lo, hi)) => UIntInterval::new(lo, hi, bits),
        None => UIntInterval::bottom(&BitWidth(bits)),
    }
}

fn bool_from_interval<S: Signedness>(interval: &Interval<S>) -> BoolInterval {
    let zero = BigInt::from(0u8);
    if interval.is_bottom() {
        BoolInterval::BOTTOM
    } else if interval.as_singleton() == Some(&zero) {
        BoolInterval::FALSE
    } else if interval.contains(&zero) {
        BoolInterval::TOP
    } else {
        BoolInterval::TRUE
    }
}

/// A singleton that fits into the other side's type adopts that type, the
/// way a literal does. Otherwise both sides widen to the larger type.
fn unify(lhs: &Value, rhs: &Value) -> Option<(Value, Value)> {
    fn fits<S: Signedness, T: Signedness>(value: &Interval<S>, target: &Interval<T>) -> bool {
        let bits = target.bits();
        value
            .as_singleton()
            .is_some_and(|v| *v >= T::type_min(bits) && *v <= T::type_max(bits))
    }
    match (lhs, rhs) {
        (Value::UInt(a), Value::UInt(b)) => {
            let bits = if fits(b, a) {
                a.bits()
            } else if fits(a, b) {
                b.bits()
            } else {
                a.bits().max(b.bits())
            };
            Some((Value::UInt(a.cast(bits)), Value::UInt(b.cast(bits))))
        }
        (Value::Int(a), Value::Int(b)) => {
            let bits = if fits(b, a) {
                a.bits()
            } else if fits(a, b) {
                b.bits()
            } else {
                a.bits().max(b.bits())
            };
            Some((Value::Int(a.cast(bits)), Value::Int(b.cast(bits))))
        }
        (Value::Int(a), Value::UInt(b)) => {
            let bits = if fits(b, a) { a.bits() } else { a.bits().max(b.bits()) };
            Some((Value::Int(a.cast(bits)), Value::Int(b.cast(bits))))
        }
        (Value::UInt(a), Value::Int(b)) => {
            let bits = if fits(a, b) { b.bits() } else { a.bits().max(b.bits()) };
            Some((Value::Int(a.cast(bits)), Value::Int(b.cast(bits))))
        }
        _ => None,
    }
}

/// Exponents and shift amounts are always unsigned. The negative part of a
/// signed amount is dropped, an amount that is negative for sure is Bottom.
fn amount(value: &Value) -> Option<UIntInterval> {
    let zero = BigInt::from(0u8);
    match value {
        Value::UInt(i) => Some(i.cast(256)),
        Value::Int(i) => Some(match i.bounds() {
            Some((lo, hi)) if *hi >= zero => UIntInterval::new(lo.max(&zero).clone(), hi.clone(), 256),
            _ => UIntInterval::bottom(&BitWidth(256)),
        }),
        _ => None,
    }
}

impl Value {
    pub fn uint(value: impl Into<BigInt>, bits: u16) -> Self {
        Value::UInt(UIntInterval::singleton(value, bits))
    }

    pub fn int(value: impl Into<BigInt>, bits: u16) -> Self {
        Value::Int(IntInterval::singleton(value, bits))
    }

    pub fn uint_range(lo: impl Into<BigInt>, hi: impl Into<BigInt>, bits: u16) -> Self {
        Value::UInt(UIntInterval::new(lo, hi, bits))
    }

    pub fn int_range(lo: impl Into<BigInt>, hi: impl Into<BigInt>, bits: u16) -> Self {
        Value::Int(IntInterval::new(lo, hi, bits))
    }

    pub fn address(id: u64) -> Self {
        Value::Address(AddressSet::of(id))
    }

    /// The least precise value of an elementary type.
    pub fn top_of(ty: &SolType, name: &str) -> Option<Self> {
        Some(match ty {
            SolType::UInt(bits) => Value::UInt(UIntInterval::top(&BitWidth(*bits))),
            SolType::Int(bits) => Value::Int(IntInterval::top(&BitWidth(*bits))),
            SolType::Bool => Value::Bool(BoolInterval::TOP),
            SolType::Address => Value::Address(AddressSet::top_()),
            SolType::FixedBytes(width) => Value::Bytes(BytesSet::top_of(*width)),
            SolType::Bytes | SolType::String => Value::Symbolic(format!("symbol_{name}")),
            _ => return None,
        })
    }

    /// The "not yet known" value of an elementary type.
    pub fn bottom_of(ty: &SolType, name: &str) -> Option<Self> {
        Some(match ty {
            SolType::UInt(bits) => Value::UInt(UIntInterval::bottom(&BitWidth(*bits))),
            SolType::Int(bits) => Value::Int(IntInterval::bottom(&BitWidth(*bits))),
            SolType::Bool => Value::Bool(BoolInterval::BOTTOM),
            SolType::Address => Value::Address(AddressSet::bottom_()),
            SolType::FixedBytes(width) => Value::Bytes(BytesSet::bottom_of(*width)),
            SolType::Bytes | SolType::String => Value::Symbolic(format!("symbol_{name}")),
            _ => return None,
        })
    }

    /// The value storage holds before the first write.
    pub fn zero_of(ty: &SolType, name: &str) -> Option<Self> {
        Some(match ty {
            SolType::UInt(bits) => Value::uint(0, *bits),
            SolType::Int(bits) => Value::int(0, *bits),
            SolType::Bool => Value::Bool(BoolInterval::FALSE),
            SolType::Address => Value::address(0),
            SolType::FixedBytes(width) => Value::Bytes(BytesSet::of(*width, 0u8)),
            SolType::Bytes | SolType::String => Value::Symbolic(format!("symbol_{name}")),
            _ => return None,
        })
    }

    pub fn is_bottom(&self) -> bool {
        match self {
            Value::Int(i) => i.is_bottom(),
            Value::UInt(i) => i.is_bottom(),
            Value::Bool(b) => b.is_bottom(),
            Value::Address(s) => s.is_bottom(),
            Value::Bytes(s) => s.is_bottom(),
            _ => false,
        }
    }

    pub fn is_top(&self) -> bool {
        match self {
            Value::Int(i) => i.is_top(),
            Value::UInt(i) => i.is_top(),
            Value::Bool(b) => b.is_top(),
            Value::Address(s) => s.is_top(),
            Value::Bytes(s) => s.is_top(),
            Value::Symbolic(_) => true,
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<Handle> {
        match self {
            Value::Object(h) => Some(*h),
            _ => None,
        }
    }

    /// The definite truth value of a condition, if there is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => b.as_bool(),
            _ => None,
        }
    }

    /// The type a freshly allocated variable holding this value would have.
    pub fn type_of(&self) -> Option<SolType> {
        Some(match self {
            Value::UInt(i) => SolType::UInt(i.bits()),
            Value::Int(i) => SolType::Int(i.bits()),
            Value::Bool(_) => SolType::Bool,
            Value::Address(_) => SolType::Address,
            Value::Bytes(b) => SolType::FixedBytes(b.width()),
            Value::Symbolic(_) => SolType::String,
            _ => return None,
        })
    }

    /// Text used as a mapping key, available for definite values only.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::UInt(i) => i.as_singleton().map(ToString::to_string),
            Value::Int(i) => i.as_singleton().map(ToString::to_string),
            Value::Bool(b) => b.as_bool().map(|b| b.to_string()),
            Value::Address(s) => s.singleton().map(ToString::to_string),
            Value::Bytes(s) => s.singleton().map(ToString::to_string),
            Value::Symbolic(s) if s.starts_with('"') => Some(s.clone()),
            _ => None,
        }
    }

    /// Least upper bound of two scalar values. Values of unrelated kinds
    /// join to an unknown placeholder.
    pub fn join(&self, other: &Value) -> Value {
        if let Some((lhs, rhs)) = unify(self, other) {
            return match (lhs, rhs) {
                (Value::UInt(a), Value::UInt(b)) => Value::UInt(a.join(&b, &a.width())),
                (Value::Int(a), Value::Int(b)) => Value::Int(a.join(&b, &a.width())),
                _ => unknown(),
            };
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(a.join_(b)),
            (Value::Address(a), Value::Address(b)) => Value::Address(a.join_(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Value::Bytes(a.join_(b)),
            (Value::Tuple(a), Value::Tuple(b)) if a.len() == b.len() => {
                Value::Tuple(a.iter().zip(b).map(|(x, y)| x.join(y)).collect())
            }
            (a, b) if a == b => a.clone(),
            _ => unknown(),
        }
    }

    /// Explicit conversion `ty(value)`. Integers saturate into the target
    /// range instead of wrapping.
    pub fn convert(&self, ty: &SolType) -> Value {
        match (ty, self) {
            (SolType::UInt(bits), Value::UInt(i)) => Value::UInt(i.cast(*bits)),
            (SolType::UInt(bits), Value::Int(i)) => Value::UInt(i.cast(*bits)),
            (SolType::Int(bits), Value::UInt(i)) => Value::Int(i.cast(*bits)),
            (SolType::Int(bits), Value::Int(i)) => Value::Int(i.cast(*bits)),
            (SolType::UInt(bits), Value::Bool(b)) => Value::UInt(uint_from_bool(b, *bits)),
            (SolType::Int(bits), Value::Bool(b)) => Value::Int(uint_from_bool(b, *bits).cast(*bits)),
            (SolType::UInt(bits), Value::Address(s)) => Value::UInt(interval_from_set(s, *bits)),
            (SolType::Int(bits), Value::Address(s)) => Value::Int(interval_from_set(s, *bits)),
            (SolType::UInt(bits), Value::Bytes(s)) => Value::UInt(interval_from_set(s, *bits)),
            (SolType::Int(bits), Value::Bytes(s)) => Value::Int(interval_from_set(s, *bits)),
            (SolType::Bool, Value::Bool(b)) => Value::Bool(*b),
            (SolType::Bool, Value::UInt(i)) => Value::Bool(bool_from_interval(i)),
            (SolType::Bool, Value::Int(i)) => Value::Bool(bool_from_interval(i)),
            (SolType::Address, Value::Address(s)) => Value::Address(s.clone()),
            (SolType::Address, Value::UInt(i)) => Value::Address(AddressSet(set_from_interval(i))),
            (SolType::Address, Value::Int(i)) => Value::Address(AddressSet(set_from_interval(i))),
            (SolType::Address, Value::Bytes(s)) => Value::Address(AddressSet((**s).clone())),
            (SolType::FixedBytes(width), Value::Bytes(s)) => Value::Bytes(s.resize(*width)),
            (SolType::FixedBytes(width), Value::UInt(i)) => {
                let set = set_from_interval(i);
                if set.is_top() {
                    Value::Bytes(BytesSet::top_of(*width))
                } else {
                    Value::Bytes(BytesSet::new(*width, set.iter().cloned()))
                }
            }
            (SolType::Bytes | SolType::String, Value::Symbolic(s)) => Value::Symbolic(s.clone()),
            (SolType::Bytes | SolType::String, value) => Value::Symbolic(format!("{ty}({value})")),
            (SolType::Named(_) | SolType::Array { .. } | SolType::Mapping { .. }, value) => value.clone(),
            (ty, _) => Value::top_of(ty, "conversion").unwrap_or_else(unknown),
        }
    }

    pub fn unary(&self, op: UnaryOp) -> Result<Value> {
        Ok(match (op, self) {
            (UnaryOp::Neg, Value::Int(i)) => Value::Int(-i),
            // Negating an unsigned value only happens to literals.
            (UnaryOp::Neg, Value::UInt(i)) => Value::Int(-i.cast::<Signed>(256)),
            (UnaryOp::Not, Value::Bool(b)) => Value::Bool(b.not()),
            (UnaryOp::BitNot, Value::Int(i)) => Value::Int(!i),
            (UnaryOp::BitNot, Value::UInt(i)) => Value::UInt(!i),
            (UnaryOp::BitNot, Value::Bytes(b)) => Value::Bytes(BytesSet::top_of(b.width())),
            (_, Value::Symbolic(_)) => unknown(),
            (op, value) => {
                return Err(Error::UnsupportedOperator {
                    op: format!("{op:?}"),
                    operands: value.kind_name().to_owned(),
                });
            }
        })
    }

    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> Result<Value> {
        use BinaryOp as B;
        match op {
            B::Exp | B::Shl | B::Shr => return self.shift_like(op, rhs),
            B::And | B::Or => {
                return match (self, rhs) {
                    (Value::Bool(a), Value::Bool(b)) if op == B::And => Ok(Value::Bool(a.and(b))),
                    (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a.or(b))),
                    _ => Ok(Value::Bool(BoolInterval::TOP)),
                };
            }
            _ => {}
        }
        if op.is_comparison() {
            return Ok(Value::Bool(self.compare(op, rhs)));
        }
        if let Some((lhs, rhs)) = unify(self, rhs) {
            return Ok(match (lhs, rhs) {
                (Value::UInt(a), Value::UInt(b)) => Value::UInt(Self::arith(op, &a, &b)),
                (Value::Int(a), Value::Int(b)) => Value::Int(Self::arith(op, &a, &b)),
                _ => unknown(),
            });
        }
        match (self, rhs) {
            (Value::Bytes(a), Value::Bytes(b)) if matches!(op, B::BitAnd | B::BitOr | B::BitXor) => {
                let width = a.width().max(b.width());
                Ok(Value::Bytes(match (a.singleton(), b.singleton()) {
                    (Some(x), Some(y)) => BytesSet::of(
                        width,
                        match op {
                            B::BitAnd => x & y,
                            B::BitOr => x | y,
                            _ => x ^ y,
                        },
                    ),
                    _ if a.is_bottom() || b.is_bottom() => BytesSet::bottom_of(width),
                    _ => BytesSet::top_of(width),
                }))
            }
            // Arithmetic with a placeholder is unknown, with the type of the
            // known side.
            (Value::UInt(i), Value::Symbolic(_)) | (Value::Symbolic(_), Value::UInt(i)) => {
                Ok(Value::UInt(UIntInterval::top(&i.width())))
            }
            (Value::Int(i), Value::Symbolic(_)) | (Value::Symbolic(_), Value::Int(i)) => {
                Ok(Value::Int(IntInterval::top(&i.width())))
            }
            (Value::Symbolic(_), _) | (_, Value::Symbolic(_)) => Ok(unknown()),
            (lhs, rhs) => Err(Error::UnsupportedOperator {
                op: op.to_string(),
                operands: format!("{} and {}", lhs.kind_name(), rhs.kind_name()),
            }),
        }
    }

    fn arith<S: Signedness>(op: BinaryOp, a: &Interval<S>, b: &Interval<S>) -> Interval<S> {
        match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            BinaryOp::BitXor => a ^ b,
            _ => Interval::top(&a.width()),
        }
    }

    fn shift_like(&self, op: BinaryOp, rhs: &Value) -> Result<Value> {
        let Some(amount) = amount(rhs) else {
            return match self {
                Value::Symbolic(_) => Ok(unknown()),
                value => Ok(Value::top_of(&value.type_of().unwrap_or(SolType::uint256()), "").unwrap_or_else(unknown)),
            };
        };
        Ok(match (op, self) {
            (BinaryOp::Exp, Value::UInt(i)) => Value::UInt(i.pow(&amount)),
            (BinaryOp::Exp, Value::Int(i)) => Value::Int(i.pow(&amount)),
            (BinaryOp::Shl, Value::UInt(i)) => Value::UInt(i.shl(&amount)),
            (BinaryOp::Shl, Value::Int(i)) => Value::Int(i.shl(&amount)),
            (BinaryOp::Shr, Value::UInt(i)) => Value::UInt(i.shr(&amount)),
            (BinaryOp::Shr, Value::Int(i)) => Value::Int(i.shr(&amount)),
            (_, Value::Bytes(b)) if amount.is_bottom() || b.is_bottom() => Value::Bytes(BytesSet::bottom_of(b.width())),
            (_, Value::Bytes(b)) => Value::Bytes(BytesSet::top_of(b.width())),
            (_, Value::Symbolic(_)) => unknown(),
            (op, value) => {
                return Err(Error::UnsupportedOperator {
                    op: op.to_string(),
                    operands: value.kind_name().to_owned(),
                });
            }
        })
    }

    fn compare(&self, op: BinaryOp, rhs: &Value) -> BoolInterval {
        if let Some((lhs, rhs)) = unify(self, rhs) {
            return match (lhs, rhs) {
                (Value::UInt(a), Value::UInt(b)) => Self::compare_intervals(op, &a, &b),
                (Value::Int(a), Value::Int(b)) => Self::compare_intervals(op, &a, &b),
                _ => BoolInterval::TOP,
            };
        }
        let equal = match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => a.equals(b),
            (Value::Address(a), Value::Address(b)) => a.equals(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.equals(b),
            _ => return BoolInterval::TOP,
        };
        match op {
            BinaryOp::Eq => equal,
            BinaryOp::Ne => equal.not(),
            _ => BoolInterval::TOP,
        }
    }

    fn compare_intervals<S: Signedness>(op: BinaryOp, a: &Interval<S>, b: &Interval<S>) -> BoolInterval {
        match op {
            BinaryOp::Eq => a.eq_(b),
            BinaryOp::Ne => a.ne_(b),
            BinaryOp::Lt => a.lt_(b),
            BinaryOp::Le => a.le_(b),
            BinaryOp::Gt => a.gt_(b),
            BinaryOp::Ge => a.ge_(b),
            _ => BoolInterval::TOP,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Bool(_) => "bool",
            Value::Address(_) => "address",
            Value::Bytes(_) => "bytes",
            Value::Symbolic(_) => "symbolic value",
            Value::Object(_) => "object",
            Value::Tuple(_) => "tuple",
            Value::Namespace(_) => "namespace",
            Value::Type(_) => "type",
            Value::Unit => "unit",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Address(s) => write!(f, "{s}"),
            Value::Bytes(s) => write!(f, "{s}"),
            Value::Symbolic(s) => write!(f, "{s}"),
            Value::Object(h) => write!(f, "{h}"),
            Value::Tuple(items) => write!(f, "({})", items.iter().join(", ")),
            Value::Namespace(name) => write!(f, "{name}"),
            Value::Type(ty) => write!(f, "{ty}"),
            Value::Unit => write!(f, "()"),
        }
    }
}
