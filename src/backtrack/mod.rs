mod backtrack_trait;
mod queues;
mod trail;

pub use backtrack_trait::*;
pub use queues::*;
pub use trail::Trail;
