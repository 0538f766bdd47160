//! Verilog IR: the behavioral model a memory is lowered into.

mod builder;
mod ir;
mod logic;

pub use builder::*;
pub use ir::*;
pub use logic::*;
