use crate::collections::ref_store::RefMap;
use crate::core::state::*;
use crate::core::*;
use crate::model::lang::{IAtom, IVar, Type};

/// Trait bound satisfied by anything usable as a variable label (name) in a [Model].
pub trait Label: Default + Clone + Eq + std::hash::Hash + std::fmt::Debug {}
impl<T: Default + Clone + Eq + std::hash::Hash + std::fmt::Debug> Label for T {}

/// Structure of a model: variable types and labels.
///
/// Kept separate from the [Domains] (the variables' current state) so that
/// a [Model] can be cheaply cloned for search without duplicating labels/types.
#[derive(Clone, Default)]
pub struct ModelShape<Lbl> {
    pub types: RefMap<VarRef, Type>,
    labels: RefMap<VarRef, Lbl>,
}

impl<Lbl: Label> ModelShape<Lbl> {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_label(&mut self, var: VarRef, label: impl Into<Lbl>) {
        self.labels.insert(var, label.into());
    }

    pub fn get_label(&self, var: VarRef) -> Option<&Lbl> {
        self.labels.get(var)
    }

    pub fn get_type(&self, var: VarRef) -> Option<Type> {
        self.types.get(var).copied()
    }

    fn set_type(&mut self, var: VarRef, typ: Type) {
        self.types.insert(var, typ);
    }
}

/// A scheduling problem: a set of integer/Boolean variables together with their current
/// (possibly partial) domains.
///
/// Unlike a general constraint-modeling `Model`, this type does not carry a reified-expression
/// layer: constraints are built directly as propagators (see [crate::reasoners::cp]) and attached
/// to a [crate::solver::Solver].
#[derive(Clone)]
pub struct Model<Lbl> {
    pub shape: ModelShape<Lbl>,
    pub state: Domains,
}

impl<Lbl: Label> Model<Lbl> {
    pub fn new() -> Self {
        Model {
            shape: ModelShape::new(),
            state: Domains::new(),
        }
    }

    pub fn with_domains(mut self, domains: Domains) -> Model<Lbl> {
        self.state = domains;
        self
    }

    /// Creates a new, always-present integer variable with the given bounds.
    pub fn new_ivar(&mut self, lb: IntCst, ub: IntCst, label: impl Into<Lbl>) -> IVar {
        self.create_ivar(lb, ub, None, label)
    }

    /// Creates a new integer variable whose presence is conditioned on `presence`.
    /// When `presence` is false, the variable's value is irrelevant to the problem.
    pub fn new_optional_ivar(&mut self, lb: IntCst, ub: IntCst, presence: Lit, label: impl Into<Lbl>) -> IVar {
        self.create_ivar(lb, ub, Some(presence), label)
    }

    fn create_ivar(&mut self, lb: IntCst, ub: IntCst, presence: Option<Lit>, label: impl Into<Lbl>) -> IVar {
        let dvar = match presence {
            Some(presence) => self.state.new_optional_var(lb, ub, presence),
            None => self.state.new_var(lb, ub),
        };
        self.shape.set_label(dvar, label);
        self.shape.set_type(dvar, Type::Int { lb, ub });
        IVar::new(dvar)
    }

    /// Creates a new Boolean variable, represented as a `[0,1]` integer variable together
    /// with its `(var >= 1)` literal.
    pub fn new_bvar(&mut self, label: impl Into<Lbl>) -> Lit {
        self.create_bvar(None, label)
    }

    pub fn new_optional_bvar(&mut self, presence: Lit, label: impl Into<Lbl>) -> Lit {
        self.create_bvar(Some(presence), label)
    }

    fn create_bvar(&mut self, presence: Option<Lit>, label: impl Into<Lbl>) -> Lit {
        let dvar = match presence {
            Some(presence) => self.state.new_optional_var(0, 1, presence),
            None => self.state.new_var(0, 1),
        };
        self.shape.set_label(dvar, label);
        self.shape.set_type(dvar, Type::Bool);
        dvar.geq(1)
    }

    /// Creates the three variables of a task: `start`, `size` (duration) and `end`, bound by the
    /// relation `start + size = end` (implemented here as `end := start + size` for a fixed
    /// `size`, or as two linked variables otherwise), together with a presence literal.
    pub fn new_optional_task(
        &mut self,
        start_lb: IntCst,
        start_ub: IntCst,
        size_lb: IntCst,
        size_ub: IntCst,
        presence: Lit,
        label: impl Into<Lbl> + Clone,
    ) -> (IVar, IVar, IVar) {
        let start = self.new_optional_ivar(start_lb, start_ub, presence, label.clone());
        let size = self.new_optional_ivar(size_lb, size_ub, presence, label.clone());
        let end = self.new_optional_ivar(start_lb + size_lb, start_ub + size_ub, presence, label);
        (start, size, end)
    }

    pub fn int_bounds(&self, atom: impl Into<IAtom>) -> (IntCst, IntCst) {
        let atom = atom.into();
        (self.state.lb(atom), self.state.ub(atom))
    }
}

impl<Lbl: Label> Default for Model<Lbl> {
    fn default() -> Self {
        Self::new()
    }
}
