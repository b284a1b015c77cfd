use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::batch::batch;
use crate::error::AppError;
use crate::models::{PipelineOutcome, links_of};
use crate::scheduler::{Trigger, TriggerHandler};
use crate::seen::SeenStore;
use crate::sources::SourceSelector;
use crate::traits::{DestinationResolver, Fetcher, JobExtractor, Messenger};

pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 50;

pub const NO_JOBS_TEXT: &str = "No jobs found right now. Please try again later.";
pub const NO_NEW_JOBS_TEXT: &str = "No new jobs since last post.";

const SCHEDULED_HEADER: &str = "Scheduled Refresh - Latest Fresher Jobs";

/// Clamp a requested per-source limit into `MIN_LIMIT..=MAX_LIMIT`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_LIMIT, MAX_LIMIT)
}

/// Parameters bound to one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Per-source cap.
    pub limit: usize,
    /// Skip links already delivered to the destination.
    pub only_new: bool,
    pub sources: SourceSelector,
    /// Text sent ahead of the first batch.
    pub header: Option<String>,
}

impl RunRequest {
    pub fn new(limit: usize, only_new: bool) -> Self {
        Self {
            limit: clamp_limit(limit),
            only_new,
            sources: SourceSelector::All,
            header: None,
        }
    }

    /// Defaults of the on-demand listing command.
    pub fn listing() -> Self {
        Self::new(10, false).with_header("Latest Fresher Jobs")
    }

    /// Defaults of the manual refresh command.
    pub fn manual_refresh() -> Self {
        Self::new(30, true).with_header("Manual Refresh - Latest Fresher Jobs")
    }

    /// Defaults of a scheduled refresh.
    pub fn scheduled() -> Self {
        Self::new(10, true).with_header(SCHEDULED_HEADER)
    }

    /// A scheduled refresh whose header names the schedule's timezone.
    pub fn scheduled_in(timezone: &str) -> Self {
        Self::scheduled().with_header(format!("{SCHEDULED_HEADER} ({timezone})"))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = clamp_limit(limit);
        self
    }

    pub fn with_only_new(mut self, only_new: bool) -> Self {
        self.only_new = only_new;
        self
    }

    pub fn with_sources(mut self, sources: SourceSelector) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn without_header(mut self) -> Self {
        self.header = None;
        self
    }
}

/// Everything a pipeline run needs, owned in one place.
///
/// Flow: aggregate → filter against the seen set → batch → send → commit.
pub struct PipelineContext<F, E, M, R>
where
    F: Fetcher,
    E: JobExtractor,
    M: Messenger,
    R: DestinationResolver,
{
    aggregator: Aggregator<F, E>,
    store: Arc<SeenStore>,
    messenger: M,
    resolver: Arc<R>,
    max_batch_size: usize,
}

impl<F, E, M, R> PipelineContext<F, E, M, R>
where
    F: Fetcher,
    E: JobExtractor,
    M: Messenger,
    R: DestinationResolver,
{
    pub fn new(aggregator: Aggregator<F, E>, store: Arc<SeenStore>, messenger: M, resolver: Arc<R>) -> Self {
        let max_batch_size = messenger.max_batch_size();
        Self {
            aggregator,
            store,
            messenger,
            resolver,
            max_batch_size,
        }
    }

    /// Lower the batch size below the messenger's own maximum.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.clamp(1, self.messenger.max_batch_size().max(1));
        self
    }

    pub fn aggregator(&self) -> &Aggregator<F, E> {
        &self.aggregator
    }

    pub fn store(&self) -> &Arc<SeenStore> {
        &self.store
    }

    /// Fetch, filter and deliver jobs to one destination.
    ///
    /// The destination is resolved at call time. Delivery errors propagate
    /// and leave the seen set untouched, so the next run delivers again.
    pub async fn run_pipeline(
        &self,
        destination_id: &str,
        request: &RunRequest,
    ) -> Result<PipelineOutcome, AppError> {
        let destination = self
            .resolver
            .resolve(destination_id)
            .ok_or_else(|| AppError::UnknownDestination(destination_id.to_string()))?;

        let jobs = self
            .aggregator
            .aggregate(&request.sources, request.limit)
            .await?;
        tracing::info!(
            destination = %destination_id,
            sources = %request.sources,
            found = jobs.len(),
            "Collected jobs"
        );

        if jobs.is_empty() {
            self.messenger.send_text(&destination, NO_JOBS_TEXT).await?;
            return Ok(PipelineOutcome::NoJobsFound);
        }

        let seen = self.store.lock(destination_id).await;
        let (jobs, links) = if request.only_new {
            let filtered = seen.filter_new(&jobs).await;
            if filtered.fresh.is_empty() {
                self.messenger.send_text(&destination, NO_NEW_JOBS_TEXT).await?;
                return Ok(PipelineOutcome::NoNewJobs);
            }
            (filtered.fresh, filtered.links)
        } else {
            let links = links_of(&jobs);
            (jobs, links)
        };

        if let Some(header) = &request.header {
            self.messenger.send_text(&destination, header).await?;
        }
        for chunk in batch(&jobs, self.max_batch_size) {
            self.messenger.send_jobs(&destination, chunk).await?;
        }

        // Delivered already: a failed save only means a repeat next time.
        if let Err(e) = seen.commit(&links).await {
            tracing::error!(destination = %destination_id, error = %e, "Failed to persist seen links");
        }

        tracing::info!(destination = %destination_id, delivered = jobs.len(), "Delivered jobs");
        Ok(PipelineOutcome::Delivered {
            count: jobs.len(),
            header: request.header.clone(),
        })
    }
}

impl<F, E, M, R> TriggerHandler for PipelineContext<F, E, M, R>
where
    F: Fetcher,
    E: JobExtractor,
    M: Messenger,
    R: DestinationResolver,
{
    async fn fire(&self, trigger: &Trigger) -> Result<PipelineOutcome, AppError> {
        self.run_pipeline(&trigger.destination_id, &trigger.request)
            .await
    }
}
