//! Memory generator lowering: replaces declarative memories with behavioral models.
//!
//! A memory module is described only by its port counts, geometry and latencies. Lowering
//! allocates one storage array, delays each port's inputs through pipeline registers and emits
//! the per-cycle read and write rules of every port.

mod descriptor;
mod error;
mod lower;
mod pass;
mod ports;
mod stage;

pub use descriptor::*;
pub use error::*;
pub use lower::*;
pub use pass::*;
pub use ports::*;
pub use stage::*;
