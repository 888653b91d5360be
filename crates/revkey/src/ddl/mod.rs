mod batch;
mod exporter;
mod statements;
#[cfg(test)]
mod tests;

pub use batch::*;
pub use exporter::*;
pub use statements::*;
