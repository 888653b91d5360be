#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod ddl;
mod dialect;
mod error;
mod mutex;
#[cfg(feature = "async-tokio")]
mod runtime;
mod schema;
mod sequence;

pub use crate::ddl::*;
pub use crate::dialect::*;
pub use crate::error::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use crate::runtime::*;
pub use crate::schema::*;
pub use crate::sequence::*;
