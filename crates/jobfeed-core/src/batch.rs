use crate::models::Job;

/// Split `jobs` into ordered batches of at most `max_batch_size` records.
///
/// An empty input yields no batches. A size of zero is treated as one.
pub fn batch(jobs: &[Job], max_batch_size: usize) -> Vec<&[Job]> {
    jobs.chunks(max_batch_size.max(1)).collect()
}
