//! Sequence encoding
//!
//! Converts residues into alphabet indices, sliding k-mer indices and
//! finally one-hot tensors. Unknown letters and padding are carried as
//! negative indices and become all-zero rows in the one-hot output.

mod alphabet;
mod kmer;
mod onehot;

pub use alphabet::*;
pub use kmer::*;
pub use onehot::*;
