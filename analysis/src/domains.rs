use core::cmp::Ordering;
use core::fmt::{Debug, Display};

/////////////////////////
// Traits for domains. //
/////////////////////////

/// A join semi-lattice orders abstract values by precision: `a <= b` means
/// `b` is a safe over-approximation of `a`. Top is the least precise value
/// ("could be anything"), Bottom the most precise one ("no information yet").
pub trait JoinSemiLattice: Eq + PartialOrd + Clone + Debug {
    /// Side information needed to build some of the values. Intervals need
    /// their bit width to know what Top means, most other domains use unit.
    type LatticeContext;

    /// The unit of the join. Bottom is the smallest element of the order.
    fn bottom(ctx: &Self::LatticeContext) -> Self;

    /// Least upper bound of two values.
    ///
    /// Requirements:
    /// * Idempotent: a.join(a, ctx) == a
    /// * Commutative: a.join(b, ctx) == b.join(a, ctx)
    /// * Associative: a.join(b.join(c)) == a.join(b).join(c)
    /// * Bottom is unit: bottom.join(b, ctx) == b
    /// * Upper bound: a.join(b, ctx) >= a and a.join(b, ctx) >= b
    fn join(&self, other: &Self, ctx: &Self::LatticeContext) -> Self;

    /// Extrapolates unstable bounds so that ascending chains terminate.
    /// `previous` is the value from the last iteration at the same point.
    ///
    /// Requirements:
    /// * a.widen(a, ctx, i) == a
    /// * a.widen(b, ctx, i) >= a.join(b, ctx)
    fn widen(&self, _previous: &Self, _ctx: &Self::LatticeContext, _iteration: usize) -> Self {
        self.clone()
    }
}

pub trait JoinSemiLatticeNoContext: JoinSemiLattice {
    /// See [JoinSemiLattice::bottom].
    fn bottom_() -> Self;

    /// See [JoinSemiLattice::join].
    fn join_(&self, other: &Self) -> Self;

    /// See [JoinSemiLattice::widen].
    fn widen_(&self, previous: &Self, iteration: usize) -> Self;
}

impl<L: JoinSemiLattice<LatticeContext = ()>> JoinSemiLatticeNoContext for L {
    fn bottom_() -> Self {
        <L as JoinSemiLattice>::bottom(&())
    }

    fn join_(&self, other: &Self) -> Self {
        self.join(other, &())
    }

    fn widen_(&self, previous: &Self, iteration: usize) -> Self {
        self.widen(previous, &(), iteration)
    }
}

/// A lattice also has a greatest lower bound for every pair of values. The
/// meet is what branch refinement uses to cut infeasible values away.
pub trait Lattice: JoinSemiLattice {
    /// The largest element, the unit of the meet.
    fn top(ctx: &Self::LatticeContext) -> Self;

    /// Greatest lower bound of two values.
    ///
    /// * Idempotent: a.meet(a, ctx) == a
    /// * Commutative: a.meet(b, ctx) == b.meet(a, ctx)
    /// * Top is unit: top.meet(b, ctx) == b
    /// * Lower bound: a.meet(b, ctx) <= a and a.meet(b, ctx) <= b
    fn meet(&self, other: &Self, ctx: &Self::LatticeContext) -> Self;

    /// The dual of widening: recovers precision lost by an earlier widening
    /// without breaking termination.
    fn narrow(&self, _previous: &Self, _ctx: &Self::LatticeContext, _iteration: usize) -> Self {
        self.clone()
    }
}

pub trait LatticeNoContext: Lattice {
    /// See [Lattice::top].
    fn top_() -> Self;

    /// See [Lattice::meet].
    fn meet_(&self, other: &Self) -> Self;

    /// See [Lattice::narrow].
    fn narrow_(&self, previous: &Self, iteration: usize) -> Self;
}

impl<L: Lattice<LatticeContext = ()>> LatticeNoContext for L {
    fn top_() -> Self {
        <L as Lattice>::top(&())
    }

    fn meet_(&self, other: &Self) -> Self {
        self.meet(other, &())
    }

    fn narrow_(&self, previous: &Self, iteration: usize) -> Self {
        self.narrow(previous, &(), iteration)
    }
}

/// Errors reported when a domain value cannot be built from raw parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    EmptyRange(String, String),
    OutOfRange(String, u16),
    ZeroWidth,
}

impl Display for DomainError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for DomainError {}

fn containment<T: PartialOrd>(lo_a: &T, hi_a: &T, lo_b: &T, hi_b: &T) -> Option<Ordering> {
    match (lo_a <= lo_b && hi_b <= hi_a, lo_b <= lo_a && hi_a <= hi_b) {
        (true, true) => Some(Ordering::Equal),
        (true, false) => Some(Ordering::Greater),
        (false, true) => Some(Ordering::Less),
        (false, false) => None,
    }
}

mod boolean;
pub use boolean::*;

mod interval;
pub use interval::*;

mod bounded;
pub use bounded::*;

#[cfg(test)]
mod domains_tests;
