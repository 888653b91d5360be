mod bit_reversal;
mod descriptor;
mod exclusion;
mod generator;
mod pool;
mod source;

pub use bit_reversal::*;
pub use descriptor::*;
pub use exclusion::*;
pub use generator::*;
pub use pool::*;
pub use source::*;
