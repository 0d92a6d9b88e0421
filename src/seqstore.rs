//! Sequence stores : read only collections of allele profiles of fixed length.
//!
//! A profile is a row of `schema_length` allele codes stored as u8. Rows are identified by their rank
//! in the store. The on disk format is the raw row major matrix of nb_seqs x schema_length bytes,
//! with no header, so that a file can be mapped and addressed directly.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::errors::{CgError, CgResult};

/// The access the index and the verifiers need on a collection of profiles.
pub trait SeqStore: Sync {
    /// returns the profile of rank id. id must be less than len()
    fn get(&self, id: usize) -> &[u8];

    /// number of profiles stored
    fn len(&self) -> usize;

    /// length of each profile
    fn schema_length(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
} // end of trait SeqStore

//=====================================================================================

/// An in memory row major matrix of profiles.
#[derive(Clone, Debug)]
pub struct SeqMatrix {
    schema_length: usize,
    nb_seqs: usize,
    data: Vec<u8>,
}

impl SeqMatrix {
    pub fn new(schema_length: usize) -> Self {
        SeqMatrix {
            schema_length,
            nb_seqs: 0,
            data: Vec::new(),
        }
    }

    pub fn with_capacity(schema_length: usize, nb_seqs: usize) -> Self {
        SeqMatrix {
            schema_length,
            nb_seqs: 0,
            data: Vec::with_capacity(schema_length * nb_seqs),
        }
    }

    /// builds a matrix from rows, all rows must have length schema_length
    pub fn from_rows<R: AsRef<[u8]>>(schema_length: usize, rows: &[R]) -> CgResult<Self> {
        let mut matrix = SeqMatrix::with_capacity(schema_length, rows.len());
        for row in rows {
            matrix.push(row.as_ref())?;
        }
        Ok(matrix)
    }

    /// appends a profile, returns its rank
    pub fn push(&mut self, seq: &[u8]) -> CgResult<usize> {
        if seq.len() != self.schema_length {
            return Err(CgError::InvalidInput {
                expected: self.schema_length,
                got: seq.len(),
            });
        }
        self.data.extend_from_slice(seq);
        self.nb_seqs += 1;
        Ok(self.nb_seqs - 1)
    }

    /// dumps the raw matrix in file path. The file can be reloaded by MmapSeqMatrix::open
    pub fn dump(&self, path: &Path) -> CgResult<()> {
        log::info!(
            "dumping {} sequences of length {} in {:?}",
            self.len(),
            self.schema_length,
            path
        );
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                log::error!("SeqMatrix dump : could not open file {:?}", path.as_os_str());
                e
            })?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&self.data)?;
        writer.flush()?;
        Ok(())
    } // end of dump
} // end of impl SeqMatrix

impl SeqStore for SeqMatrix {
    #[inline]
    fn get(&self, id: usize) -> &[u8] {
        let start = id * self.schema_length;
        &self.data[start..start + self.schema_length]
    }

    fn len(&self) -> usize {
        self.nb_seqs
    }

    fn schema_length(&self) -> usize {
        self.schema_length
    }
}

//=====================================================================================

/// A read only memory mapped matrix of profiles, as dumped by SeqMatrix::dump.
#[derive(Debug)]
pub struct MmapSeqMatrix {
    nb_seqs: usize,
    schema_length: usize,
    mmap: Mmap,
}

impl MmapSeqMatrix {
    /// maps file path. The file size must be nb_seqs * schema_length.
    pub fn open(path: &Path, nb_seqs: usize, schema_length: usize) -> CgResult<Self> {
        let file = File::open(path).map_err(|e| {
            log::error!("MmapSeqMatrix : could not open file {:?}", path.as_os_str());
            e
        })?;
        // the file is never written while mapped, we only read it
        let mmap = unsafe { Mmap::map(&file)? };
        let expected = nb_seqs * schema_length;
        if mmap.len() != expected {
            log::error!(
                "MmapSeqMatrix : file {:?} has size {}, expected {} x {}",
                path,
                mmap.len(),
                nb_seqs,
                schema_length
            );
            return Err(CgError::InvalidInput {
                expected,
                got: mmap.len(),
            });
        }
        log::info!(
            "mapped {} sequences of length {} from {:?}",
            nb_seqs,
            schema_length,
            path
        );
        Ok(MmapSeqMatrix {
            nb_seqs,
            schema_length,
            mmap,
        })
    } // end of open
}

impl SeqStore for MmapSeqMatrix {
    #[inline]
    fn get(&self, id: usize) -> &[u8] {
        let start = id * self.schema_length;
        &self.mmap[start..start + self.schema_length]
    }

    fn len(&self) -> usize {
        self.nb_seqs
    }

    fn schema_length(&self) -> usize {
        self.schema_length
    }
}

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn matrix_push_and_get() {
        let mut matrix = SeqMatrix::new(4);
        assert!(matrix.is_empty());
        assert_eq!(matrix.push(&[1, 2, 3, 4]).unwrap(), 0);
        assert_eq!(matrix.push(&[5, 6, 7, 8]).unwrap(), 1);
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.get(1), &[5, 6, 7, 8]);
        //
        let res = matrix.push(&[1, 2, 3]);
        assert!(matches!(
            res,
            Err(CgError::InvalidInput {
                expected: 4,
                got: 3
            })
        ));
        assert_eq!(matrix.len(), 2);
    }

    #[test]
    fn empty_schema_counts_profiles() {
        let mut matrix = SeqMatrix::new(0);
        assert_eq!(matrix.push(&[]).unwrap(), 0);
        assert_eq!(matrix.push(&[]).unwrap(), 1);
        assert_eq!(matrix.len(), 2);
        assert!(matrix.get(1).is_empty());
        assert!(matrix.push(&[1]).is_err());
    }

    #[test]
    fn dump_then_map() {
        let rows = vec![vec![1u8, 1, 2], vec![3u8, 1, 4], vec![0u8, 0, 9]];
        let matrix = SeqMatrix::from_rows(3, &rows).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seqs.bin");
        matrix.dump(&path).unwrap();
        //
        let mapped = MmapSeqMatrix::open(&path, 3, 3).unwrap();
        assert_eq!(mapped.len(), 3);
        assert_eq!(mapped.schema_length(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(mapped.get(i), row.as_slice());
        }
        // wrong shape is refused
        assert!(MmapSeqMatrix::open(&path, 4, 3).is_err());
    }
} // end of mod tests
