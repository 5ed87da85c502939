//! This module contains extension traits to [Domains](crate::core::state::Domains) that,
//! when imported, provide convenience methods for querying task/variable state.

mod domains_ext;

pub use domains_ext::*;
