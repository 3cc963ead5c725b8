//! NumPy array files
//!
//! Writes version 1.0 `.npy` files of unsigned bytes (`|u1`, C order),
//! either in one go or streamed batch by batch.

use crate::encoding::OneHot;
use crate::error::{BelugaError, IoResultExt, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const MAGIC: &[u8] = b"\x93NUMPY";

/// Header of a `|u1` array, padded so the data starts on a 64-byte boundary
pub fn npy_header(shape: &[usize]) -> Vec<u8> {
    let dims = match shape {
        [single] => format!("{},", single),
        dims => dims.iter().map(usize::to_string).collect::<Vec<_>>().join(", "),
    };
    let mut dict = format!("{{'descr': '|u1', 'fortran_order': False, 'shape': ({}), }}", dims);

    // magic + version + u16 length + dict + newline
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    dict.extend(std::iter::repeat(' ').take(padding));
    dict.push('\n');

    let mut header = Vec::with_capacity(unpadded + padding);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&[1, 0]);
    header.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    header.extend_from_slice(dict.as_bytes());
    header
}

/// Streams samples of a fixed-shape tensor into a `.npy` file.
///
/// The file is written under a temporary name and moved into place by
/// [`NpyWriter::finish`] once exactly `shape[0]` samples were written.
/// Dropping an unfinished writer removes the temporary file.
pub struct NpyWriter {
    path: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    shape: [usize; 4],
    written: usize,
    finished: bool,
}

impl NpyWriter {
    /// Create a writer for a tensor of `shape`
    pub fn create(path: &Path, shape: [usize; 4]) -> Result<Self> {
        let temp_path = path.with_extension("npy.tmp");
        let file = File::create(&temp_path).with_path(&temp_path)?;
        let mut writer = Self {
            path: path.to_path_buf(),
            temp_path,
            writer: Some(BufWriter::new(file)),
            shape,
            written: 0,
            finished: false,
        };
        writer.write_bytes(&npy_header(&shape))?;
        Ok(writer)
    }

    /// Append the samples of `onehot`
    pub fn write(&mut self, onehot: &OneHot) -> Result<()> {
        let shape = onehot.shape();
        if shape[1..] != self.shape[1..] {
            return Err(BelugaError::invalid(format!(
                "Cannot append tensor of shape {:?} to array of shape {:?}",
                shape, self.shape
            )));
        }
        if self.written + shape[0] > self.shape[0] {
            return Err(BelugaError::invalid(format!(
                "Array {:?} holds {} samples, got {}",
                self.path,
                self.shape[0],
                self.written + shape[0]
            )));
        }

        self.write_bytes(onehot.as_bytes())?;
        self.written += shape[0];
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write_all(bytes).with_path(&self.temp_path),
            None => Err(BelugaError::invalid(format!("Array {:?} is already finished", self.path))),
        }
    }

    /// Flush and move the file into place
    pub fn finish(mut self) -> Result<PathBuf> {
        if self.written != self.shape[0] {
            return Err(BelugaError::invalid(format!(
                "Array {:?} expects {} samples, only {} were written",
                self.path, self.shape[0], self.written
            )));
        }
        if let Some(mut writer) = self.writer.take() {
            writer.flush().with_path(&self.temp_path)?;
        }
        std::fs::rename(&self.temp_path, &self.path).with_path(&self.path)?;
        self.finished = true;
        tracing::debug!("Wrote {:?} with shape {:?}", self.path, self.shape);
        Ok(self.path.clone())
    }
}

impl Drop for NpyWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.writer.take());
        if self.temp_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                tracing::debug!("Could not remove {:?}: {}", self.temp_path, e);
            }
        }
    }
}

/// Write a complete tensor to `path`
pub fn write_npy(path: &Path, onehot: &OneHot) -> Result<()> {
    let mut writer = NpyWriter::create(path, onehot.shape())?;
    writer.write(onehot)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::as_onehot;
    use tempfile::TempDir;

    #[test]
    fn test_header_alignment() {
        for shape in [vec![3], vec![2, 100, 1, 4], vec![0, 1, 1, 1024]] {
            let header = npy_header(&shape);
            assert_eq!(header.len() % 64, 0);
            assert_eq!(&header[..6], MAGIC);
            assert_eq!(*header.last().unwrap(), b'\n');
        }
        let header = npy_header(&[7]);
        let text = String::from_utf8_lossy(&header[10..]);
        assert!(text.contains("'shape': (7,)"));
    }

    #[test]
    fn test_write_npy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.npy");
        let onehot = as_onehot(&[vec![0, 3], vec![1, 2]], 1, 4);
        write_npy(&path, &onehot).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let header = npy_header(&[2, 2, 1, 4]);
        assert!(String::from_utf8_lossy(&header).contains("'shape': (2, 2, 1, 4)"));
        assert_eq!(&bytes[..header.len()], header.as_slice());
        assert_eq!(&bytes[header.len()..], onehot.as_bytes());
        assert!(!dir.path().join("x.npy.tmp").exists());
    }

    #[test]
    fn test_streaming_requires_exact_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("y.npy");
        let batch = as_onehot(&[vec![0, 1]], 1, 4);

        let mut writer = NpyWriter::create(&path, [2, 2, 1, 4]).unwrap();
        writer.write(&batch).unwrap();
        assert!(writer.write(&as_onehot(&[vec![0, 1, 2]], 1, 4)).is_err());
        assert!(writer.finish().is_err());
        assert!(!path.exists());
        assert!(!dir.path().join("y.npy.tmp").exists());

        let mut writer = NpyWriter::create(&path, [2, 2, 1, 4]).unwrap();
        writer.write(&batch).unwrap();
        writer.write(&batch).unwrap();
        assert!(writer.write(&batch).is_err());
        assert_eq!(writer.finish().unwrap(), path);
    }

    #[test]
    fn test_abandoned_writer_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("z.npy");
        let temp = dir.path().join("z.npy.tmp");

        let mut writer = NpyWriter::create(&path, [3, 2, 1, 4]).unwrap();
        writer.write(&as_onehot(&[vec![0, 1]], 1, 4)).unwrap();
        assert!(temp.exists());
        drop(writer);

        assert!(!temp.exists());
        assert!(!path.exists());
    }
}
