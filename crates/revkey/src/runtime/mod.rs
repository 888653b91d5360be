mod source;
mod tokio;

pub use self::source::*;
pub use self::tokio::*;
