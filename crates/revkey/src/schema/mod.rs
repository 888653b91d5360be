mod existing;
mod graph;
mod resolver;
mod table;

pub use existing::*;
pub use graph::*;
pub use resolver::*;
pub use table::*;
