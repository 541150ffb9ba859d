use core::cmp::Ordering;
use core::fmt::Display;

use crate::domains::*;

/// Booleans abstracted as an interval over `{0, 1}`.
///
/// ```txt
///    [0, 1]
///   /      \
/// [0, 0]  [1, 1]
///   \      /
///      ⊥
/// ```
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub struct BoolInterval {
    range: Option<(bool, bool)>,
}

impl BoolInterval {
    pub const BOTTOM: BoolInterval = BoolInterval { range: None };
    pub const FALSE: BoolInterval = BoolInterval {
        range: Some((false, false)),
    };
    pub const TRUE: BoolInterval = BoolInterval {
        range: Some((true, true)),
    };
    pub const TOP: BoolInterval = BoolInterval {
        range: Some((false, true)),
    };

    /// Builds the interval `[min, max]`, where any non-zero bound counts as 1.
    pub fn new(min: u8, max: u8) -> Self {
        let (min, max) = (min != 0, max != 0);
        if min && !max {
            return Self::BOTTOM;
        }
        Self {
            range: Some((min, max)),
        }
    }

    pub fn min(&self) -> Option<u8> {
        self.range.map(|(lo, _)| u8::from(lo))
    }

    pub fn max(&self) -> Option<u8> {
        self.range.map(|(_, hi)| u8::from(hi))
    }

    pub fn is_bottom(&self) -> bool {
        self.range.is_none()
    }

    pub fn is_top(&self) -> bool {
        *self == Self::TOP
    }

    pub fn is_true(&self) -> bool {
        *self == Self::TRUE
    }

    pub fn is_false(&self) -> bool {
        *self == Self::FALSE
    }

    /// The concrete value if it is known.
    pub fn as_bool(&self) -> Option<bool> {
        match self.range {
            Some((lo, hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    pub fn and(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::BOTTOM;
        }
        if self.is_false() || other.is_false() {
            return Self::FALSE;
        }
        if self.is_true() && other.is_true() {
            return Self::TRUE;
        }
        Self::TOP
    }

    pub fn or(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::BOTTOM;
        }
        if self.is_true() || other.is_true() {
            return Self::TRUE;
        }
        if self.is_false() && other.is_false() {
            return Self::FALSE;
        }
        Self::TOP
    }

    pub fn not(&self) -> Self {
        match self.range {
            None => Self::BOTTOM,
            Some((lo, hi)) => Self {
                range: Some((!hi, !lo)),
            },
        }
    }

    /// Equality of two abstract booleans. Unknown unless both are known.
    pub fn equals(&self, other: &Self) -> Self {
        match (self.as_bool(), other.as_bool()) {
            (Some(a), Some(b)) => Self::from(a == b),
            _ => Self::TOP,
        }
    }

    pub fn not_equals(&self, other: &Self) -> Self {
        self.equals(other).not()
    }
}

impl From<bool> for BoolInterval {
    fn from(val: bool) -> Self {
        Self {
            range: Some((val, val)),
        }
    }
}

impl Display for BoolInterval {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.range {
            None => write!(f, "⊥"),
            Some((lo, hi)) => write!(f, "[{}, {}]", u8::from(lo), u8::from(hi)),
        }
    }
}

impl PartialOrd for BoolInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.range, other.range) {
            (None, None) => Some(Ordering::Equal),
            (None, Some(_)) => Some(Ordering::Less),
            (Some(_), None) => Some(Ordering::Greater),
            (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => containment(&lo_a, &hi_a, &lo_b, &hi_b),
        }
    }
}

impl JoinSemiLattice for BoolInterval {
    type LatticeContext = ();

    fn bottom(_: &Self::LatticeContext) -> Self {
        Self::BOTTOM
    }

    fn join(&self, other: &Self, _: &Self::LatticeContext) -> Self {
        match (self.range, other.range) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => Self {
                range: Some((lo_a && lo_b, hi_a || hi_b)),
            },
        }
    }
}

impl Lattice for BoolInterval {
    fn top(_: &Self::LatticeContext) -> Self {
        Self::TOP
    }

    fn meet(&self, other: &Self, _: &Self::LatticeContext) -> Self {
        match (self.range, other.range) {
            (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => {
                let (lo, hi) = (lo_a || lo_b, hi_a && hi_b);
                // Only one representation for bottom.
                if lo && !hi {
                    Self::BOTTOM
                } else {
                    Self {
                        range: Some((lo, hi)),
                    }
                }
            }
            _ => Self::BOTTOM,
        }
    }
}
