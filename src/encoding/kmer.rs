//! Higher-order (k-mer) index encoding
//!
//! A k-mer starting at position `i` is encoded as a base-`A` number whose
//! most significant digit is the letter at `i`. For DNA and order 2 this
//! gives `AA=0, AC=1, ..., TT=15`.

use super::alphabet::{Alphabet, UNKNOWN_LETTER};

/// Encode sliding windows of `order` letters.
///
/// The output has `indices.len() - order + 1` entries (none when the input
/// is shorter than `order`). Windows containing a negative letter index
/// encode as [`UNKNOWN_LETTER`].
pub fn kmer_indices(indices: &[i32], order: usize, alphabet_size: usize) -> Vec<i32> {
    if order <= 1 {
        return indices.to_vec();
    }
    if indices.len() < order {
        return Vec::new();
    }

    let base = alphabet_size as i32;
    indices
        .windows(order)
        .map(|window| {
            let mut value = 0i32;
            for &digit in window {
                if digit < 0 {
                    return UNKNOWN_LETTER;
                }
                value = value * base + digit;
            }
            value
        })
        .collect()
}

/// Encode residues directly into k-mer indices
pub fn encode_sequence(seq: &[u8], alphabet: &Alphabet, order: usize) -> Vec<i32> {
    let indices = super::alphabet::seq2ind(seq, alphabet);
    kmer_indices(&indices, order, alphabet.size())
}

/// Index of the reverse complement of a DNA k-mer
pub fn complement_index(idx: i32, order: usize) -> i32 {
    let mut rest = idx;
    let mut rc = 0i32;
    for iord in 0..order {
        let nuc = rest % 4;
        rest /= 4;
        rc += (3 - nuc) * 4i32.pow((order - iord - 1) as u32);
    }
    rc
}

/// Names of all k-mers in index order (`AA`, `AC`, ...)
pub fn kmer_labels(alphabet: &Alphabet, order: usize) -> Vec<String> {
    let letters = alphabet.letters();
    let n = alphabet.size().pow(order as u32);

    (0..n)
        .map(|mut idx| {
            let mut label = vec![0u8; order];
            for slot in label.iter_mut().rev() {
                *slot = letters[idx % letters.len()];
                idx /= letters.len();
            }
            String::from_utf8_lossy(&label).into_owned()
        })
        .collect()
}
