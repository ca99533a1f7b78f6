//! Compute module - Oracle invocation, parallel evaluation and the optimizer.

mod dispatch;
mod oracle;

pub mod evolution;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::*;
pub use oracle::*;
