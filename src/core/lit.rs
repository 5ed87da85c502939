use crate::core::*;
use std::cmp::Ordering;

/// A literal is a lightweight statement about the bound of a variable, e.g. `(x <= 5)` or `(x >= 2)`.
///
/// Internally, a `Lit` packs a [SignedVar] together with an [UpperBound] value: `(svar <= value)`.
/// Expressing both lower and upper bound constraints as an upper bound on a (possibly negated)
/// [SignedVar] allows most of the solver's internals (entailment, explanation, watches) to treat
/// the two symmetrically.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Lit {
    svar: SignedVar,
    value: UpperBound,
}

impl Lit {
    /// A literal that is always true: `(0 <= 0)`.
    pub const TRUE: Lit = Lit {
        svar: SignedVar::from_raw((VarRef::ZERO.to_u32() << 1) + 1),
        value: UpperBound::ub(0),
    };

    /// A literal that is always false: the negation of [Lit::TRUE].
    pub const FALSE: Lit = Lit {
        svar: SignedVar::from_raw(VarRef::ZERO.to_u32() << 1),
        value: UpperBound::ub(-1),
    };

    #[inline]
    pub const fn from_parts(svar: SignedVar, value: UpperBound) -> Self {
        Lit { svar, value }
    }

    #[inline]
    pub fn leq(svar: impl Into<SignedVar>, ub: IntCst) -> Lit {
        Lit::from_parts(svar.into(), UpperBound::ub(ub))
    }

    #[inline]
    pub fn lt(svar: impl Into<SignedVar>, ub: IntCst) -> Lit {
        Lit::leq(svar, ub - 1)
    }

    #[inline]
    pub fn geq(svar: impl Into<SignedVar>, lb: IntCst) -> Lit {
        Lit::leq(svar.into().neg(), -lb)
    }

    #[inline]
    pub fn gt(svar: impl Into<SignedVar>, lb: IntCst) -> Lit {
        Lit::geq(svar, lb + 1)
    }

    #[inline]
    pub const fn svar(self) -> SignedVar {
        self.svar
    }

    #[inline]
    pub const fn bound_value(self) -> UpperBound {
        self.value
    }

    #[inline]
    pub const fn ub_value(self) -> IntCst {
        self.value.as_int()
    }

    #[inline]
    pub fn variable(self) -> VarRef {
        self.svar.variable()
    }

    /// Returns true if `self` being true implies that `other` is also true.
    #[inline]
    pub fn entails(self, other: Lit) -> bool {
        self.svar == other.svar && self.value.stronger(other.value)
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;

    #[inline]
    fn not(self) -> Self::Output {
        // (svar <= v)  negates to  (-svar <= -v - 1)
        let neg_value = UpperBound::ub(-self.value.as_int() - 1);
        Lit::from_parts(self.svar.neg(), neg_value)
    }
}

impl PartialOrd for Lit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Lit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.svar.cmp(&other.svar).then(self.value.cmp(&other.value))
    }
}

impl std::fmt::Debug for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} <= {}", self.svar, self.value.as_int())
    }
}

impl From<bool> for Lit {
    fn from(value: bool) -> Self {
        if value {
            Lit::TRUE
        } else {
            Lit::FALSE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let x = VarRef::from(2u32);
        let l = x.geq(5);
        assert!(!(!l).entails(l));
        assert_eq!(!!l, l);
    }

    #[test]
    fn test_entailment() {
        let x = VarRef::from(2u32);
        assert!(x.geq(5).entails(x.geq(3)));
        assert!(!x.geq(3).entails(x.geq(5)));
        assert!(x.leq(3).entails(x.leq(5)));
    }

    #[test]
    fn test_true_false() {
        assert!(Lit::TRUE != Lit::FALSE);
        assert_eq!(!Lit::TRUE, Lit::FALSE);
    }
}
