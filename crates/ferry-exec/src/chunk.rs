//! Chunk planning.

use std::ops::Range;

use ferry_common::error::{FerryError, FerryResult};

/// A contiguous row range processed as one unit of parallel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Position of the chunk in the plan.
    pub index: usize,
    /// First row of the chunk.
    pub offset: usize,
    /// Number of rows in the chunk.
    pub len: usize,
}

impl Chunk {
    /// One past the last row of the chunk.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Row range covered by the chunk.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Splits `total_rows` rows into chunks of at most `chunk_size` rows.
///
/// Produces `ceil(total_rows / chunk_size)` chunks in offset order; only the
/// last may be shorter. Zero rows yield zero chunks.
///
/// # Errors
///
/// Returns [`FerryError::InvalidArgument`] if `chunk_size` is zero.
pub fn plan_chunks(total_rows: usize, chunk_size: usize) -> FerryResult<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(FerryError::invalid_argument("chunk_size must be at least 1"));
    }

    let chunks = (0..total_rows)
        .step_by(chunk_size)
        .enumerate()
        .map(|(index, offset)| Chunk {
            index,
            offset,
            len: chunk_size.min(total_rows - offset),
        })
        .collect();
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(chunks: &[Chunk], total: usize) {
        let mut next = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.offset, next);
            assert!(chunk.len > 0);
            next = chunk.end();
        }
        assert_eq!(next, total);
    }

    #[test]
    fn test_plan_exact_multiple() {
        let chunks = plan_chunks(6, 2).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len == 2));
        assert_covers(&chunks, 6);
    }

    #[test]
    fn test_plan_with_remainder() {
        let chunks = plan_chunks(5, 2).unwrap();
        let ranges: Vec<_> = chunks.iter().map(Chunk::range).collect();
        assert_eq!(ranges, vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn test_plan_chunk_larger_than_total() {
        let chunks = plan_chunks(7, 100).unwrap();
        assert_eq!(chunks, vec![Chunk { index: 0, offset: 0, len: 7 }]);
    }

    #[test]
    fn test_plan_empty() {
        assert!(plan_chunks(0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_plan_zero_chunk_size() {
        assert!(matches!(
            plan_chunks(10, 0),
            Err(FerryError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_plan_coverage_sweep() {
        for total in 0..40 {
            for size in 1..12 {
                let chunks = plan_chunks(total, size).unwrap();
                assert_eq!(chunks.len(), total.div_ceil(size));
                assert_covers(&chunks, total);
            }
        }
    }
}
