//! HTML job extraction driven by [`SourceProfile`] strategy lists.

mod containers;
mod dom;
mod image;
mod links;
mod table;

use jobfeed_core::error::AppError;
use jobfeed_core::models::Job;
use jobfeed_core::sources::{SourceProfile, Strategy};
use jobfeed_core::traits::JobExtractor;
use scraper::Html;
use url::Url;

use containers::ContainersStrategy;
use links::LinksStrategy;
use table::TableStrategy;

enum CompiledStrategy {
    Table(TableStrategy),
    Containers(ContainersStrategy),
    Links(LinksStrategy),
}

impl CompiledStrategy {
    fn compile(strategy: &Strategy) -> Result<Self, AppError> {
        Ok(match strategy {
            Strategy::Table(spec) => Self::Table(TableStrategy::new(spec.clone())?),
            Strategy::Containers(spec) => Self::Containers(ContainersStrategy::new(spec)?),
            Strategy::Links(spec) => Self::Links(LinksStrategy::new(spec)?),
        })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Containers(_) => "containers",
            Self::Links(_) => "links",
        }
    }

    fn extract(&self, doc: &Html, base: &Url, limit: usize) -> Vec<Job> {
        match self {
            Self::Table(s) => s.extract(doc, base, limit),
            Self::Containers(s) => s.extract(doc, base, limit),
            Self::Links(s) => s.extract(doc, base, limit),
        }
    }
}

/// Extractor for one source page.
///
/// Selectors are compiled once up front. Each call parses the document
/// once and tries the profile's strategies in order; the first one that
/// yields anything wins, so later strategies only run when earlier ones
/// found nothing at all.
pub struct HtmlExtractor {
    source: String,
    page_url: Url,
    strategies: Vec<CompiledStrategy>,
}

impl HtmlExtractor {
    pub fn new(profile: &SourceProfile) -> Result<Self, AppError> {
        let page_url = Url::parse(&profile.url).map_err(|e| {
            AppError::Generic(format!("invalid URL for source '{}': {e}", profile.name))
        })?;
        let strategies = profile
            .strategies
            .iter()
            .map(CompiledStrategy::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: profile.name.clone(),
            page_url,
            strategies,
        })
    }

    /// Names of the compiled strategies in cascade order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(CompiledStrategy::name).collect()
    }
}

impl JobExtractor for HtmlExtractor {
    fn extract(&self, html: &str, limit: usize) -> Vec<Job> {
        if limit == 0 {
            return Vec::new();
        }
        let doc = Html::parse_document(html);
        for strategy in &self.strategies {
            let jobs = strategy.extract(&doc, &self.page_url, limit);
            if !jobs.is_empty() {
                tracing::debug!(
                    source = %self.source,
                    strategy = strategy.name(),
                    count = jobs.len(),
                    "Extracted jobs"
                );
                return jobs;
            }
            tracing::debug!(source = %self.source, strategy = strategy.name(), "Strategy found nothing");
        }
        tracing::info!(source = %self.source, "No extraction strategy matched the page");
        Vec::new()
    }
}
