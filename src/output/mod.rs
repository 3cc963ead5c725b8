//! Output writers
//!
//! NumPy `.npy` files for one-hot tensors, and TSV/CSV/JSON tables for
//! region listings and variant metadata.

mod npy;
mod table;

pub use npy::*;
pub use table::*;
