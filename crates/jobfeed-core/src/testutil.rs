//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{Destination, Job};
use crate::traits::{DestinationResolver, Fetcher, JobExtractor, Messenger};

/// `n` jobs with links `https://example.com/{prefix}/{i}`.
pub fn numbered_jobs(prefix: &str, n: usize) -> Vec<Job> {
    (0..n)
        .map(|i| {
            Job::new(
                format!("{prefix} job {i}"),
                format!("https://example.com/{prefix}/{i}"),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher returning the same HTML for every URL, except those
/// configured to fail.
#[derive(Clone)]
pub struct MockFetcher {
    html: String,
    errors: Arc<Mutex<HashMap<String, AppError>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            errors: Arc::new(Mutex::new(HashMap::new())),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every fetch of `url` with `error`.
    pub fn with_url_error(self, url: &str, error: AppError) -> Self {
        self.errors.lock().unwrap().insert(url.to_string(), error);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.errors.lock().unwrap().get(url) {
            Some(e) => Err(AppError::Generic(e.to_string())),
            None => Ok(self.html.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor that ignores the markup and returns a prefix of fixed jobs.
pub struct MockExtractor {
    jobs: Vec<Job>,
}

impl MockExtractor {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }
}

impl JobExtractor for MockExtractor {
    fn extract(&self, _html: &str, limit: usize) -> Vec<Job> {
        self.jobs.iter().take(limit).cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// MockMessenger
// ---------------------------------------------------------------------------

/// One recorded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(String),
    /// Links of the delivered batch.
    Jobs(Vec<String>),
}

/// Mock messenger recording every send, optionally failing job batches.
#[derive(Clone)]
pub struct MockMessenger {
    sent: Arc<Mutex<Vec<Sent>>>,
    jobs_error: Arc<Mutex<Option<AppError>>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            jobs_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The first `send_jobs` call fails with `error`.
    pub fn failing_jobs(error: AppError) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            jobs_error: Arc::new(Mutex::new(Some(error))),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

impl Messenger for MockMessenger {
    async fn send_text(&self, _destination: &Destination, text: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_jobs(&self, _destination: &Destination, jobs: &[Job]) -> Result<(), AppError> {
        if let Some(e) = self.jobs_error.lock().unwrap().take() {
            return Err(e);
        }
        let links = jobs.iter().map(|j| j.link.clone()).collect();
        self.sent.lock().unwrap().push(Sent::Jobs(links));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticResolver
// ---------------------------------------------------------------------------

/// Resolves a fixed set of destination ids.
pub struct StaticResolver {
    ids: Vec<String>,
}

impl StaticResolver {
    pub fn with(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DestinationResolver for StaticResolver {
    fn resolve(&self, destination_id: &str) -> Option<Destination> {
        self.ids
            .iter()
            .find(|id| id.as_str() == destination_id)
            .map(|id| Destination {
                id: id.clone(),
                endpoint: format!("mock://{id}"),
            })
    }
}
