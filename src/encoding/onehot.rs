//! One-hot tensors

use serde::Serialize;

/// Dense 4-D `u8` tensor in C order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneHot {
    shape: [usize; 4],
    data: Vec<u8>,
}

impl OneHot {
    /// Zero-filled tensor
    pub fn zeros(shape: [usize; 4]) -> Self {
        Self {
            shape,
            data: vec![0; shape.iter().product()],
        }
    }

    /// Tensor shape
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Raw data in C order
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of samples (first dimension)
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    /// Whether the tensor has no samples
    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    #[inline]
    fn offset(&self, idx: [usize; 4]) -> usize {
        let [_, b, c, d] = self.shape;
        ((idx[0] * b + idx[1]) * c + idx[2]) * d + idx[3]
    }

    /// Element at the given position
    pub fn get(&self, idx: [usize; 4]) -> u8 {
        self.data[self.offset(idx)]
    }

    fn set(&mut self, idx: [usize; 4], value: u8) {
        let offset = self.offset(idx);
        self.data[offset] = value;
    }

    /// Permute `(n, L, 1, C)` into `(n, C, L, 1)`
    pub fn to_channel_first(&self) -> Self {
        let [n, l, w, c] = self.shape;
        let mut out = Self::zeros([n, c, l, w]);
        for i in 0..n {
            for j in 0..l {
                for k in 0..w {
                    for m in 0..c {
                        out.set([i, m, j, k], self.get([i, j, k, m]));
                    }
                }
            }
        }
        out
    }
}

/// One-hot encode rows of k-mer indices into `(n, L, 1, A^order)`.
///
/// Negative indices (unknown letters, padding) produce all-zero rows.
pub fn as_onehot(rows: &[Vec<i32>], order: usize, alphabet_size: usize) -> OneHot {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let channels = alphabet_size.pow(order as u32);
    let mut out = OneHot::zeros([rows.len(), width, 1, channels]);

    for (i, row) in rows.iter().enumerate() {
        for (j, &idx) in row.iter().take(width).enumerate() {
            if idx >= 0 && (idx as usize) < channels {
                out.set([i, j, 0, idx as usize], 1);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{NO_LETTER, UNKNOWN_LETTER};

    #[test]
    fn test_as_onehot() {
        let rows = vec![vec![0, 3, UNKNOWN_LETTER], vec![2, NO_LETTER, 1]];
        let oh = as_onehot(&rows, 1, 4);
        assert_eq!(oh.shape(), [2, 3, 1, 4]);
        assert_eq!(oh.get([0, 0, 0, 0]), 1);
        assert_eq!(oh.get([0, 1, 0, 3]), 1);
        assert_eq!((0..4).map(|c| oh.get([0, 2, 0, c])).sum::<u8>(), 0);
        assert_eq!((0..4).map(|c| oh.get([1, 1, 0, c])).sum::<u8>(), 0);
        assert_eq!(oh.get([1, 2, 0, 1]), 1);
    }

    #[test]
    fn test_channel_first() {
        let oh = as_onehot(&[vec![1, 2]], 1, 4);
        let cf = oh.to_channel_first();
        assert_eq!(cf.shape(), [1, 4, 2, 1]);
        assert_eq!(cf.get([0, 1, 0, 0]), 1);
        assert_eq!(cf.get([0, 2, 1, 0]), 1);
        assert_eq!(cf.get([0, 0, 0, 0]), 0);
    }
}
