mod config;
mod core;
mod field;
mod formatting;
mod keys;
mod link;
mod list;
mod marks;
mod normalize;
pub mod ops;
mod plugin;
pub mod query;
mod schema;
mod transforms;
mod value;

pub use crate::config::*;
pub use crate::core::*;
pub use crate::field::*;
pub use crate::formatting::*;
pub use crate::keys::*;
pub use crate::link::*;
pub use crate::list::*;
pub use crate::marks::*;
pub use crate::ops::{Affinity, Op, Path, Transaction, TransactionMeta};
pub use crate::plugin::*;
pub use crate::schema::*;
pub use crate::value::*;
