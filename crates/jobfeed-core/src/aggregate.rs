use futures::future::join_all;

use crate::error::AppError;
use crate::models::Job;
use crate::sources::SourceSelector;
use crate::traits::{Fetcher, JobExtractor};

/// A fetchable page paired with the extractor that understands it.
pub struct Source<E> {
    pub name: String,
    pub url: String,
    pub extractor: E,
}

impl<E: JobExtractor> Source<E> {
    pub fn new(name: impl Into<String>, url: impl Into<String>, extractor: E) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            extractor,
        }
    }
}

/// Fans a request out to several sources and concatenates their results.
///
/// Sources are held in priority order. Each selected source gets the same
/// per-source `limit`; a failing source contributes nothing and never
/// affects the others.
pub struct Aggregator<F, E>
where
    F: Fetcher,
    E: JobExtractor,
{
    fetcher: F,
    sources: Vec<Source<E>>,
}

impl<F, E> Aggregator<F, E>
where
    F: Fetcher,
    E: JobExtractor,
{
    pub fn new(fetcher: F, sources: Vec<Source<E>>) -> Self {
        Self { fetcher, sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Fetch and extract a single source. Fetch failures carry the source name.
    pub async fn fetch_source(&self, source: &Source<E>, limit: usize) -> Result<Vec<Job>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let html = self
            .fetcher
            .fetch(&source.url)
            .await
            .map_err(|e| AppError::fetch(&source.name, e))?;
        tracing::debug!(source = %source.name, bytes = html.len(), "Fetched source page");

        let jobs = source.extractor.extract(&html, limit);
        tracing::info!(source = %source.name, count = jobs.len(), "Extracted jobs");
        Ok(jobs)
    }

    /// Collect up to `limit` jobs from every selected source, in priority order.
    ///
    /// Only an unknown source name is an error; fetch failures are logged and
    /// the source is treated as empty.
    pub async fn aggregate(
        &self,
        selector: &SourceSelector,
        limit: usize,
    ) -> Result<Vec<Job>, AppError> {
        let picked = selector.resolve(&self.source_names())?;

        let runs = picked.iter().map(|&idx| {
            let source = &self.sources[idx];
            async move { (source, self.fetch_source(source, limit).await) }
        });

        let mut jobs = Vec::new();
        for (source, result) in join_all(runs).await {
            match result {
                Ok(found) => jobs.extend(found),
                Err(e) => {
                    tracing::warn!(source = %source.name, error = %e, "Source failed, skipping");
                }
            }
        }
        Ok(jobs)
    }
}
