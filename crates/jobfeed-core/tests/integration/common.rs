use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobfeed_core::error::AppError;
use jobfeed_core::models::{Destination, Job};
use jobfeed_core::traits::{DestinationResolver, Fetcher, JobExtractor, Messenger};

/// Jobs with links `https://jobs.test/{name}` for each name.
pub fn jobs_named(names: &[&str]) -> Vec<Job> {
    names
        .iter()
        .map(|n| Job::new(format!("Role {n}"), format!("https://jobs.test/{n}")))
        .collect()
}

pub fn links(jobs: &[Job]) -> Vec<String> {
    jobs.iter().map(|j| j.link.clone()).collect()
}

/// Serves a canned page per URL; unknown URLs stall past the fetch timeout.
#[derive(Clone)]
pub struct PageFetcher {
    pages: Arc<HashMap<String, String>>,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            ),
            timeout: Duration::from_millis(50),
        }
    }
}

impl Fetcher for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        match self.pages.get(url) {
            Some(body) => Ok(body.clone()),
            None => {
                tokio::time::sleep(self.timeout).await;
                Err(AppError::Timeout(0))
            }
        }
    }
}

/// Reads one job per line as `title|link`.
pub struct LineExtractor;

impl JobExtractor for LineExtractor {
    fn extract(&self, html: &str, limit: usize) -> Vec<Job> {
        html.lines()
            .filter_map(|line| line.split_once('|'))
            .map(|(title, link)| Job::new(title.trim(), link.trim()))
            .take(limit)
            .collect()
    }
}

pub fn page_of(jobs: &[Job]) -> String {
    jobs.iter()
        .map(|j| format!("{}|{}", j.title, j.link))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Text(String, String),
    Batch(String, Vec<String>),
}

/// Records every send, keyed by destination id.
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    log: Arc<Mutex<Vec<Delivered>>>,
}

impl RecordingMessenger {
    pub fn log(&self) -> Vec<Delivered> {
        self.log.lock().unwrap().clone()
    }

    pub fn batches_for(&self, destination: &str) -> Vec<Vec<String>> {
        self.log()
            .into_iter()
            .filter_map(|d| match d {
                Delivered::Batch(id, links) if id == destination => Some(links),
                _ => None,
            })
            .collect()
    }
}

impl Messenger for RecordingMessenger {
    async fn send_text(&self, destination: &Destination, text: &str) -> Result<(), AppError> {
        self.log
            .lock()
            .unwrap()
            .push(Delivered::Text(destination.id.clone(), text.to_string()));
        Ok(())
    }

    async fn send_jobs(&self, destination: &Destination, jobs: &[Job]) -> Result<(), AppError> {
        self.log
            .lock()
            .unwrap()
            .push(Delivered::Batch(destination.id.clone(), links(jobs)));
        Ok(())
    }
}

/// Every id resolves.
pub struct AnyDestination;

impl DestinationResolver for AnyDestination {
    fn resolve(&self, destination_id: &str) -> Option<Destination> {
        Some(Destination {
            id: destination_id.to_string(),
            endpoint: format!("test://{destination_id}"),
        })
    }
}
