//! Fine-grained reactive state cells.
//!
//! A [`Source`] holds a value that application code writes. A [`Derived`]
//! node recomputes its value from the nodes it reads. Writes are collected
//! and flushed once the current synchronous turn ends; every touched node
//! then notifies its subscribers exactly once per flush.

pub mod macros;

mod addr;
mod derived;
mod error;
mod microtask;
mod node;
mod payload;
mod propagation;
mod scheduler;
mod source;
mod sources;
mod state;
mod subscribers;
mod tracking;
mod value;

pub use derived::Derived;
pub use error::{Error, Result};
pub use microtask::tick;
pub use node::{NodeKind, Subscription};
pub use payload::Payload;
pub use scheduler::{batch, in_batch, is_flush_armed};
pub use source::Source;
pub use state::{create, Read, Subscribe, Write};
pub use subscribers::SubscriptionId;
pub use tracking::is_tracking;
pub use value::Value;
