use std::future::Future;

use crate::error::AppError;
use crate::models::{Destination, Job};

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Turns one source's raw markup into job records, in document order.
///
/// "Nothing matched" is an empty vector, not an error.
pub trait JobExtractor: Send + Sync {
    /// Return at most `limit` jobs: the first ones in document order.
    fn extract(&self, html: &str, limit: usize) -> Vec<Job>;
}

/// Outbound messaging collaborator.
pub trait Messenger: Send + Sync + Clone {
    /// Largest job batch a single `send_jobs` call accepts.
    fn max_batch_size(&self) -> usize {
        10
    }

    fn send_text(
        &self,
        destination: &Destination,
        text: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn send_jobs(
        &self,
        destination: &Destination,
        jobs: &[Job],
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Looks up a destination handle by id at the moment it is needed.
pub trait DestinationResolver: Send + Sync {
    fn resolve(&self, destination_id: &str) -> Option<Destination>;
}
