mod model_impl;

pub use model_impl::*;

pub mod extensions;
pub mod lang;
