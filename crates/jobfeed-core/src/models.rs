use serde::{Deserialize, Serialize};

/// One job posting extracted from a source page.
///
/// `link` is the identity key: two postings with the same link are the same
/// posting, whatever the other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    /// Absolute apply/detail URL.
    pub link: String,
    pub company: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

impl Job {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            company: None,
            qualification: None,
            experience: None,
            location: None,
            image_url: None,
        }
    }

    pub fn with_company(mut self, company: Option<String>) -> Self {
        self.company = company;
        self
    }

    pub fn with_qualification(mut self, qualification: Option<String>) -> Self {
        self.qualification = qualification;
        self
    }

    pub fn with_experience(mut self, experience: Option<String>) -> Self {
        self.experience = experience;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

/// Collect the identity keys of a job list, in order.
pub fn links_of(jobs: &[Job]) -> Vec<String> {
    jobs.iter().map(|j| j.link.clone()).collect()
}

/// A resolved delivery target (e.g. a chat channel reachable through a webhook).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    /// Transport-specific address, e.g. a webhook URL.
    pub endpoint: String,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Every source came back empty.
    NoJobsFound,
    /// Jobs were found but all of them were already delivered.
    NoNewJobs,
    Delivered {
        count: usize,
        header: Option<String>,
    },
}

impl PipelineOutcome {
    pub fn emitted(&self) -> usize {
        match self {
            PipelineOutcome::Delivered { count, .. } => *count,
            _ => 0,
        }
    }
}
