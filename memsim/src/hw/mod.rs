//! Host IR: the design database the lowering reads from and writes back into.

mod design;
mod module;

pub use design::*;
pub use module::*;
