//! Variant effect inputs
//!
//! Streams single nucleotide variants from a VCF file and produces paired
//! reference/alternative one-hot contexts for each of them.

mod streamer;

pub use streamer::*;
