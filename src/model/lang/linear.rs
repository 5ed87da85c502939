use crate::core::IntCst;
use crate::model::lang::IVar;
use std::cmp::min;

/// A linear term of the form `(a * X)` where `a` is a constant and `X` is a variable.
#[derive(Copy, Clone, Debug)]
pub struct LinearTerm {
    pub factor: IntCst,
    pub var: IVar,
}

impl LinearTerm {
    pub const fn new(factor: IntCst, var: IVar) -> LinearTerm {
        LinearTerm { factor, var }
    }

    pub fn var(&self) -> IVar {
        self.var
    }
    pub fn factor(&self) -> IntCst {
        self.factor
    }
}

impl From<IVar> for LinearTerm {
    fn from(var: IVar) -> Self {
        LinearTerm::new(1, var)
    }
}

impl std::ops::Neg for LinearTerm {
    type Output = LinearTerm;

    fn neg(self) -> Self::Output {
        LinearTerm::new(-self.factor, self.var)
    }
}

/// A sum of linear terms plus a constant, used to represent the resource demand
/// of a task in a cumulative constraint ([crate::model::lang::linear::LinearSum]
/// of demand variables) or, more generally, any affine combination of integer
/// variables.
#[derive(Clone, Debug, Default)]
pub struct LinearSum {
    terms: Vec<LinearTerm>,
    constant: IntCst,
}

/// Returns the greatest common divisor, used to keep bound-tightening on [LinearSum]s exact.
fn gcd(a: IntCst, b: IntCst) -> IntCst {
    if a == 0 {
        return b;
    }
    if b == 0 {
        return a;
    }
    let mut u = a.abs();
    let mut v = b.abs();
    let i = u.trailing_zeros();
    u >>= i;
    let j = v.trailing_zeros();
    v >>= j;
    let k = min(i, j);
    loop {
        if u > v {
            std::mem::swap(&mut u, &mut v);
        }
        v -= u;
        if v == 0 {
            return u << k;
        }
        v >>= v.trailing_zeros();
    }
}

impl LinearSum {
    pub fn zero() -> LinearSum {
        LinearSum {
            terms: Vec::new(),
            constant: 0,
        }
    }

    pub fn constant(n: IntCst) -> LinearSum {
        LinearSum {
            terms: Vec::new(),
            constant: n,
        }
    }

    pub fn of<T: Into<LinearTerm>>(elements: Vec<T>) -> LinearSum {
        LinearSum {
            terms: elements.into_iter().map(Into::into).collect(),
            constant: 0,
        }
    }

    pub fn terms(&self) -> &[LinearTerm] {
        &self.terms
    }

    pub fn get_constant(&self) -> IntCst {
        self.constant
    }

    /// Greatest common divisor of all non-zero factors in the sum, useful for tightening
    /// a derived upper bound on the sum back to an integer bound on the underlying variables.
    pub fn factors_gcd(&self) -> IntCst {
        self.terms.iter().fold(0, |acc, t| gcd(acc, t.factor))
    }
}

impl From<LinearTerm> for LinearSum {
    fn from(term: LinearTerm) -> Self {
        LinearSum {
            terms: vec![term],
            constant: 0,
        }
    }
}
impl From<IVar> for LinearSum {
    fn from(v: IVar) -> Self {
        LinearTerm::from(v).into()
    }
}
impl From<IntCst> for LinearSum {
    fn from(constant: IntCst) -> Self {
        LinearSum {
            terms: Vec::new(),
            constant,
        }
    }
}

impl<T: Into<LinearSum>> std::ops::Add<T> for LinearSum {
    type Output = LinearSum;
    fn add(mut self, rhs: T) -> Self::Output {
        let rhs = rhs.into();
        self.terms.extend_from_slice(&rhs.terms);
        self.constant += rhs.constant;
        self
    }
}
impl<T: Into<LinearSum>> std::ops::Sub<T> for LinearSum {
    type Output = LinearSum;
    fn sub(mut self, rhs: T) -> Self::Output {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms.iter().map(|t| -*t));
        self.constant -= rhs.constant;
        self
    }
}
impl<T: Into<LinearTerm>> std::ops::AddAssign<T> for LinearSum {
    fn add_assign(&mut self, rhs: T) {
        self.terms.push(rhs.into());
    }
}
impl<T: Into<LinearTerm>> std::ops::SubAssign<T> for LinearSum {
    fn sub_assign(&mut self, rhs: T) {
        self.terms.push(-rhs.into());
    }
}
impl std::ops::Neg for LinearSum {
    type Output = LinearSum;
    fn neg(mut self) -> Self::Output {
        for t in &mut self.terms {
            *t = -*t;
        }
        self.constant = -self.constant;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VarRef;

    fn v(i: u32) -> IVar {
        IVar::new(VarRef::from(i))
    }

    #[test]
    fn test_sum_add() {
        let s1 = LinearSum::of(vec![v(2)]);
        let s2 = LinearSum::of(vec![v(3)]);
        let s = s1 + s2;
        assert_eq!(s.terms().len(), 2);
        assert_eq!(s.get_constant(), 0);
    }

    #[test]
    fn test_sum_constant() {
        let s = LinearSum::of(vec![v(2)]) + 5;
        assert_eq!(s.get_constant(), 5);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(6209, 4435), 887);
    }
}
