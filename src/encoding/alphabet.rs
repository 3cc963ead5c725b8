//! Sequence alphabets and letter indexing

use crate::config::SeqType;

/// Index assigned to letters outside of the alphabet (e.g. `N`)
pub const UNKNOWN_LETTER: i32 = -1024;

/// Index used to pad positions outside of a contig
pub const NO_LETTER: i32 = -100_000_000;

const DNA_LETTERS: &[u8] = b"ACGT";
const PROTEIN_LETTERS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// A sorted set of residue letters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    seqtype: SeqType,
    letters: &'static [u8],
    lookup: [i32; 256],
}

impl Alphabet {
    /// Alphabet for the given sequence type
    pub fn for_seqtype(seqtype: SeqType) -> Self {
        let letters = match seqtype {
            SeqType::Dna => DNA_LETTERS,
            SeqType::Protein => PROTEIN_LETTERS,
        };

        let mut lookup = [UNKNOWN_LETTER; 256];
        for (i, &letter) in letters.iter().enumerate() {
            lookup[letter as usize] = i as i32;
            lookup[letter.to_ascii_lowercase() as usize] = i as i32;
        }

        Self {
            seqtype,
            letters,
            lookup,
        }
    }

    /// Nucleotide alphabet
    pub fn dna() -> Self {
        Self::for_seqtype(SeqType::Dna)
    }

    /// Amino acid alphabet
    pub fn protein() -> Self {
        Self::for_seqtype(SeqType::Protein)
    }

    /// Sequence type of this alphabet
    pub fn seqtype(&self) -> SeqType {
        self.seqtype
    }

    /// Letters in index order
    pub fn letters(&self) -> &'static [u8] {
        self.letters
    }

    /// Number of letters
    pub fn size(&self) -> usize {
        self.letters.len()
    }

    /// Index of a letter, or [`UNKNOWN_LETTER`]
    #[inline]
    pub fn index(&self, letter: u8) -> i32 {
        self.lookup[letter as usize]
    }

    /// Whether the letter belongs to the alphabet
    pub fn contains(&self, letter: u8) -> bool {
        self.index(letter) >= 0
    }

    /// Whether reverse complements are defined
    pub fn has_complement(&self) -> bool {
        self.seqtype == SeqType::Dna
    }
}

/// Map residues to alphabet indices
pub fn seq2ind(seq: &[u8], alphabet: &Alphabet) -> Vec<i32> {
    seq.iter().map(|&b| alphabet.index(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dna_indices() {
        let dna = Alphabet::dna();
        assert_eq!(seq2ind(b"ACGTNacgt", &dna), vec![0, 1, 2, 3, UNKNOWN_LETTER, 0, 1, 2, 3]);
        assert!(dna.has_complement());
    }

    #[test]
    fn test_protein_alphabet_is_sorted() {
        let protein = Alphabet::protein();
        assert_eq!(protein.size(), 20);
        let mut sorted = protein.letters().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, protein.letters());
        assert_eq!(protein.index(b'X'), UNKNOWN_LETTER);
        assert!(!protein.has_complement());
    }
}
