pub mod aggregate;
pub mod batch;
pub mod destinations;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod seen;
pub mod sources;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use aggregate::{Aggregator, Source};
pub use destinations::DestinationDirectory;
pub use error::AppError;
pub use models::{Destination, Job, PipelineOutcome};
pub use pipeline::{PipelineContext, RunRequest};
pub use scheduler::{Scheduler, TracingSchedulerReporter};
pub use seen::SeenStore;
pub use sources::{SourceProfile, SourceSelector, builtin_sources};
pub use traits::{DestinationResolver, Fetcher, JobExtractor, Messenger};
