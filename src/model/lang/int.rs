use crate::core::state::Dom;
use crate::core::views::VarView;
use crate::core::*;

/// A variable with an integer domain.
///
/// This is a thin wrapper around a [VarRef] used to tag the variable as
/// carrying an integer (rather than purely Boolean) interpretation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct IVar(VarRef);

impl IVar {
    pub const ZERO: IVar = IVar(VarRef::ZERO);
    pub const ONE: IVar = IVar(VarRef::ONE);

    pub fn new(v: VarRef) -> Self {
        IVar(v)
    }
}

impl std::fmt::Debug for IVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<IVar> for VarRef {
    fn from(v: IVar) -> Self {
        v.0
    }
}
impl From<VarRef> for IVar {
    fn from(v: VarRef) -> Self {
        IVar(v)
    }
}

/// An affine expression over a single integer variable: `var + shift`.
///
/// This is the representation used throughout the scheduling propagators for
/// task starts/ends/sizes, allowing e.g. `end = start + duration` to be built
/// without introducing an intermediate variable when `duration` is constant.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct IAtom {
    pub var: IVar,
    pub shift: IntCst,
}

impl IAtom {
    pub fn new(var: IVar, shift: IntCst) -> Self {
        IAtom { var, shift }
    }

    /// Literal asserting that this atom's value is greater than or equal to `lb`.
    pub fn ge_lit(self, lb: IntCst) -> Lit {
        self.var.0.geq(lb - self.shift)
    }
    /// Literal asserting that this atom's value is less than or equal to `ub`.
    pub fn le_lit(self, ub: IntCst) -> Lit {
        self.var.0.leq(ub - self.shift)
    }
    pub fn gt_lit(self, lb: IntCst) -> Lit {
        self.ge_lit(lb + 1)
    }
    pub fn lt_lit(self, ub: IntCst) -> Lit {
        self.le_lit(ub - 1)
    }
}

impl std::fmt::Debug for IAtom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.shift == 0 {
            write!(f, "{:?}", self.var)
        } else {
            write!(f, "{:?}+{}", self.var, self.shift)
        }
    }
}

impl From<IVar> for IAtom {
    fn from(v: IVar) -> Self {
        IAtom::new(v, 0)
    }
}
impl From<VarRef> for IAtom {
    fn from(v: VarRef) -> Self {
        IAtom::new(IVar::new(v), 0)
    }
}
impl From<IntCst> for IAtom {
    fn from(cst: IntCst) -> Self {
        IAtom::new(IVar::ZERO, cst)
    }
}

impl VarView for IAtom {
    type Value = IntCst;

    fn upper_bound(&self, dom: impl Dom) -> IntCst {
        VarView::upper_bound(&VarRef::from(self.var), dom) + self.shift
    }
    fn lower_bound(&self, dom: impl Dom) -> IntCst {
        VarView::lower_bound(&VarRef::from(self.var), dom) + self.shift
    }
}

impl VarView for VarRef {
    type Value = IntCst;

    fn upper_bound(&self, dom: impl Dom) -> IntCst {
        dom.upper_bound(SignedVar::plus(*self))
    }
    fn lower_bound(&self, dom: impl Dom) -> IntCst {
        dom.lower_bound(SignedVar::plus(*self))
    }
}

impl std::ops::Add<IntCst> for IAtom {
    type Output = IAtom;
    fn add(self, rhs: IntCst) -> IAtom {
        IAtom::new(self.var, self.shift + rhs)
    }
}
impl std::ops::Sub<IntCst> for IAtom {
    type Output = IAtom;
    fn sub(self, rhs: IntCst) -> IAtom {
        IAtom::new(self.var, self.shift - rhs)
    }
}
impl std::ops::Add<IntCst> for IVar {
    type Output = IAtom;
    fn add(self, rhs: IntCst) -> IAtom {
        IAtom::from(self) + rhs
    }
}
impl std::ops::Sub<IntCst> for IVar {
    type Output = IAtom;
    fn sub(self, rhs: IntCst) -> IAtom {
        IAtom::from(self) - rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Domains;

    #[test]
    fn test_atom_literals() {
        let mut m = Domains::new();
        let v = IVar::new(m.new_var(0, 10));
        let atom = IAtom::from(v) + 3;
        assert!(!m.entails(atom.ge_lit(5)));
        m.set_lb(VarRef::from(v), 2, Cause::Decision).unwrap();
        assert!(m.entails(atom.ge_lit(5)));
        assert!(!m.entails(atom.ge_lit(6)));
    }
}
