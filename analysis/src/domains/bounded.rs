use core::cmp::Ordering;
use core::fmt::{Debug, Display};
use core::ops::{Deref, DerefMut};
use std::collections::BTreeSet;

use itertools::Itertools;
use num_bigint::BigUint;

use crate::domains::*;

/// Largest number of distinct elements a bounded set tracks before it gives
/// up and becomes Top.
pub const SET_CAP: usize = 8;

/// A powerset that collapses to Top once it holds more than [`SET_CAP`]
/// elements. The empty set is Bottom. Top never keeps elements.
#[derive(PartialEq, Eq, Clone, Hash, Default)]
pub struct BoundedSet<T: Ord> {
    elements: BTreeSet<T>,
    top: bool,
}

impl<T: Ord + Clone + Debug> BoundedSet<T> {
    pub fn is_top(&self) -> bool {
        self.top
    }

    pub fn is_bottom(&self) -> bool {
        !self.top && self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_bottom()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.top || self.elements.contains(value)
    }

    pub fn is_singleton(&self) -> bool {
        !self.top && self.elements.len() == 1
    }

    pub fn singleton(&self) -> Option<&T> {
        if self.is_singleton() {
            self.elements.first()
        } else {
            None
        }
    }

    /// Adds one element, collapsing to Top when the cap is exceeded.
    pub fn insert(&mut self, value: T) {
        if self.top {
            return;
        }
        self.elements.insert(value);
        self.collapse();
    }

    fn collapse(&mut self) {
        if self.elements.len() > SET_CAP {
            self.elements.clear();
            self.top = true;
        }
    }

    /// `Top` against anything and comparisons involving Bottom are unknown,
    /// disjoint sets are never equal, identical singletons always are.
    pub fn equals(&self, other: &Self) -> BoolInterval {
        if self.top || other.top || self.is_bottom() || other.is_bottom() {
            return BoolInterval::TOP;
        }
        if self.elements.is_disjoint(&other.elements) {
            return BoolInterval::FALSE;
        }
        if self.is_singleton() && self.elements == other.elements {
            return BoolInterval::TRUE;
        }
        BoolInterval::TOP
    }

    pub fn not_equals(&self, other: &Self) -> BoolInterval {
        self.equals(other).not()
    }
}

impl<T: Ord + Clone + Debug> FromIterator<T> for BoundedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut result = Self {
            elements: iter.into_iter().collect(),
            top: false,
        };
        result.collapse();
        result
    }
}

impl<T: Ord + Debug> Debug for BoundedSet<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.top {
            return write!(f, "⊤");
        }
        if self.elements.is_empty() {
            return write!(f, "⊥");
        }
        write!(f, "{{{}}}", self.elements.iter().map(|e| format!("{e:?}")).join(", "))
    }
}

impl<T: Ord + Clone + Debug> PartialOrd for BoundedSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.top, other.top) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (false, false) => match (
                self.elements.is_superset(&other.elements),
                other.elements.is_superset(&self.elements),
            ) {
                (true, true) => Some(Ordering::Equal),
                (true, false) => Some(Ordering::Greater),
                (false, true) => Some(Ordering::Less),
                (false, false) => None,
            },
        }
    }
}

impl<T: Ord + Clone + Debug> JoinSemiLattice for BoundedSet<T> {
    type LatticeContext = ();

    fn bottom(_: &Self::LatticeContext) -> Self {
        Self {
            elements: BTreeSet::new(),
            top: false,
        }
    }

    fn join(&self, other: &Self, _: &Self::LatticeContext) -> Self {
        if self.top || other.top {
            return Self::top(&());
        }
        self.elements.union(&other.elements).cloned().collect()
    }
}

impl<T: Ord + Clone + Debug> Lattice for BoundedSet<T> {
    fn top(_: &Self::LatticeContext) -> Self {
        Self {
            elements: BTreeSet::new(),
            top: true,
        }
    }

    fn meet(&self, other: &Self, _: &Self::LatticeContext) -> Self {
        match (self.top, other.top) {
            (true, _) => other.clone(),
            (_, true) => self.clone(),
            _ => self.elements.intersection(&other.elements).cloned().collect(),
        }
    }

    /// Only a Top from an earlier widening is refined.
    fn narrow(&self, previous: &Self, _: &Self::LatticeContext, _iteration: usize) -> Self {
        if previous.top {
            self.clone()
        } else {
            previous.clone()
        }
    }
}

/// Abstract addresses: symbolic identities (or literal address values) an
/// `address` variable may hold.
#[derive(PartialEq, Eq, Clone, Hash, Default)]
pub struct AddressSet(pub BoundedSet<BigUint>);

impl AddressSet {
    pub fn of(id: impl Into<BigUint>) -> Self {
        Self([id.into()].into_iter().collect())
    }

    pub fn is_zero(&self) -> bool {
        self.singleton().is_some_and(|id| *id == BigUint::from(0u8))
    }

    pub fn equals(&self, other: &Self) -> BoolInterval {
        self.0.equals(&other.0)
    }

    pub fn not_equals(&self, other: &Self) -> BoolInterval {
        self.0.not_equals(&other.0)
    }
}

impl Deref for AddressSet {
    type Target = BoundedSet<BigUint>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for AddressSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<BigUint> for AddressSet {
    fn from_iter<I: IntoIterator<Item = BigUint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn fmt_set(name: &str, set: &BoundedSet<BigUint>, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    if set.is_top() {
        write!(f, "{name}(⊤)")
    } else if set.is_bottom() {
        write!(f, "{name}(⊥)")
    } else {
        write!(f, "{name}({{{}}})", set.iter().join(", "))
    }
}

impl Display for AddressSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_set("AddressSet", &self.0, f)
    }
}

impl Debug for AddressSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self}")
    }
}

impl PartialOrd for AddressSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl JoinSemiLattice for AddressSet {
    type LatticeContext = ();

    fn bottom(ctx: &Self::LatticeContext) -> Self {
        Self(BoundedSet::bottom(ctx))
    }

    fn join(&self, other: &Self, ctx: &Self::LatticeContext) -> Self {
        Self(self.0.join(&other.0, ctx))
    }
}

impl Lattice for AddressSet {
    fn top(ctx: &Self::LatticeContext) -> Self {
        Self(BoundedSet::top(ctx))
    }

    fn meet(&self, other: &Self, ctx: &Self::LatticeContext) -> Self {
        Self(self.0.meet(&other.0, ctx))
    }

    fn narrow(&self, previous: &Self, ctx: &Self::LatticeContext, iteration: usize) -> Self {
        Self(self.0.narrow(&previous.0, ctx, iteration))
    }
}

pub const DEFAULT_BYTES_WIDTH: u8 = 32;

/// Abstract values of a fixed-size `bytesN` type.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct BytesSet {
    width: u8,
    values: BoundedSet<BigUint>,
}

impl BytesSet {
    pub fn new(width: u8, values: impl IntoIterator<Item = BigUint>) -> Self {
        Self {
            width,
            values: values.into_iter().collect(),
        }
    }

    pub fn of(width: u8, value: impl Into<BigUint>) -> Self {
        Self::new(width, [value.into()])
    }

    pub fn top_of(width: u8) -> Self {
        Self {
            width,
            values: BoundedSet::top(&()),
        }
    }

    pub fn bottom_of(width: u8) -> Self {
        Self {
            width,
            values: BoundedSet::bottom(&()),
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    /// Reinterprets the values at another width. Shrinking keeps the high
    /// order bytes, growing pads on the right, like a `bytesN` conversion.
    pub fn resize(&self, width: u8) -> Self {
        if self.values.is_top() {
            return Self::top_of(width);
        }
        let values = self.values.iter().map(|v| {
            if width >= self.width {
                v << (8 * usize::from(width - self.width))
            } else {
                v >> (8 * usize::from(self.width - width))
            }
        });
        Self::new(width, values)
    }

    pub fn is_zero(&self) -> bool {
        self.values.singleton().is_some_and(|v| *v == BigUint::from(0u8))
    }

    pub fn equals(&self, other: &Self) -> BoolInterval {
        self.values.equals(&other.values)
    }

    pub fn not_equals(&self, other: &Self) -> BoolInterval {
        self.values.not_equals(&other.values)
    }
}

impl Default for BytesSet {
    fn default() -> Self {
        Self::bottom_of(DEFAULT_BYTES_WIDTH)
    }
}

impl Deref for BytesSet {
    type Target = BoundedSet<BigUint>;

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

impl DerefMut for BytesSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.values
    }
}

impl Display for BytesSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        fmt_set(&format!("BytesSet{}", self.width), &self.values, f)
    }
}

impl Debug for BytesSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self}")
    }
}

/// Values of different widths are only ordered when one side is Bottom.
impl PartialOrd for BytesSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.width == other.width {
            return self.values.partial_cmp(&other.values);
        }
        match (self.values.is_bottom(), other.values.is_bottom()) {
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            _ => None,
        }
    }
}

impl JoinSemiLattice for BytesSet {
    type LatticeContext = ();

    fn bottom(_: &Self::LatticeContext) -> Self {
        Self::default()
    }

    fn join(&self, other: &Self, ctx: &Self::LatticeContext) -> Self {
        if self.values.is_bottom() {
            return other.clone();
        }
        if other.values.is_bottom() {
            return self.clone();
        }
        Self {
            width: self.width.max(other.width),
            values: self.values.join(&other.values, ctx),
        }
    }
}

impl Lattice for BytesSet {
    fn top(_: &Self::LatticeContext) -> Self {
        Self::top_of(DEFAULT_BYTES_WIDTH)
    }

    fn meet(&self, other: &Self, ctx: &Self::LatticeContext) -> Self {
        let width = match (self.values.is_bottom(), other.values.is_bottom()) {
            (true, false) => other.width,
            (false, true) => self.width,
            _ => self.width.min(other.width),
        };
        Self {
            width,
            values: self.values.meet(&other.values, ctx),
        }
    }

    fn narrow(&self, previous: &Self, ctx: &Self::LatticeContext, iteration: usize) -> Self {
        Self {
            width: self.width,
            values: self.values.narrow(&previous.values, ctx, iteration),
        }
    }
}
