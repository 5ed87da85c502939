//! A scheduling-constraint propagation engine: the filtering algorithms that reason about tasks
//! competing for time and a shared cumulative resource.
//!
//! The crate is organised bottom-up:
//!  - [core]: variables, literals and the backtrackable integer trail ([core::state::Domains]).
//!  - [model]: a thin layer for declaring integer/boolean/task variables over a [core::state::Domains].
//!  - [reasoners]: the propagators themselves, registered with a [reasoners::cp::Cp] theory and run
//!    to a fixpoint by the [solver::Solver].
//!
//! See [prelude] for the commonly-used re-exports.

pub mod backtrack;
pub mod collections;
pub mod core;
pub mod model;
pub mod prelude;
pub mod reasoners;
pub mod solver;
pub mod utils;
