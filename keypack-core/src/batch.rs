//! Batching of ordered record streams

use crate::{Batch, PackError, Record, Result};

/// Lazily slices a record iterator into batches of up to `batch_size`
/// consecutive records
///
/// Only the batch being assembled is buffered. The final batch may be
/// shorter, and an empty source yields no batches. Input order is not
/// validated.
#[derive(Debug, Clone)]
pub struct Batcher<I> {
    source: I,
    batch_size: usize,
}

impl<I> Batcher<I>
where
    I: Iterator<Item = Record>,
{
    /// Create a new batcher
    pub fn new(source: I, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PackError::Config("batch size must be positive".into()));
        }
        Ok(Self { source, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl<I> Iterator for Batcher<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let batch: Batch = self.source.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.source.size_hint();
        (
            lower.div_ceil(self.batch_size),
            upper.map(|u| u.div_ceil(self.batch_size)),
        )
    }
}

/// Batch any record source
pub fn batches<S>(source: S, batch_size: usize) -> Result<Batcher<S::IntoIter>>
where
    S: IntoIterator<Item = Record>,
{
    Batcher::new(source.into_iter(), batch_size)
}
