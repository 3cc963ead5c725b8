//! Genomic file formats
//!
//! Readers for the inputs a sequence model consumes: FASTA sequences,
//! BED region annotations and VCF variant calls, plus the interval type
//! shared between them.

mod bed;
mod fasta;
mod interval;
mod vcf;

pub use bed::*;
pub use fasta::*;
pub use interval::*;
pub use vcf::*;
