//! Array cache
//!
//! Content-addressed storage of encoded arrays so repeated runs over the
//! same genome skip parsing and encoding entirely.

mod store;

pub use store::*;
