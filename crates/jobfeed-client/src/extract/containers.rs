//! Heuristic scan over post-like containers.

use std::collections::HashSet;

use jobfeed_core::error::AppError;
use jobfeed_core::models::Job;
use jobfeed_core::sources::ContainerSpec;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dom::{absolute, href, non_empty, selector, text_of};

pub(crate) struct ContainersStrategy {
    candidates: Vec<Selector>,
    catch_all: Selector,
    catch_all_cap: usize,
    prefer_heading: bool,
    anchor: Selector,
    heading_anchor: Selector,
}

impl ContainersStrategy {
    pub(crate) fn new(spec: &ContainerSpec) -> Result<Self, AppError> {
        let candidates = spec
            .candidates
            .iter()
            .map(|css| selector(css))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            candidates,
            catch_all: selector(&spec.catch_all)?,
            catch_all_cap: spec.catch_all_cap,
            prefer_heading: spec.prefer_heading,
            anchor: selector("a[href]")?,
            heading_anchor: selector("h2 a[href], h3 a[href]")?,
        })
    }

    pub(crate) fn extract(&self, doc: &Html, base: &Url, limit: usize) -> Vec<Job> {
        let mut jobs = Vec::new();
        let mut emitted = HashSet::new();
        for item in self.items(doc) {
            if jobs.len() >= limit {
                break;
            }
            let Some((title, link)) = self.first_link(item, base) else {
                continue;
            };
            if emitted.insert(link.clone()) {
                jobs.push(Job::new(title, link));
            }
        }
        jobs
    }

    /// Elements of the first candidate selector that matches anything,
    /// else a capped slice of the catch-all.
    fn items<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        for candidate in &self.candidates {
            let found: Vec<_> = doc.select(candidate).collect();
            if !found.is_empty() {
                return found;
            }
        }
        doc.select(&self.catch_all).take(self.catch_all_cap).collect()
    }

    fn first_link(&self, item: ElementRef<'_>, base: &Url) -> Option<(String, String)> {
        let bare = item.select(&self.anchor).next();
        let heading = item.select(&self.heading_anchor).next();
        let order = if self.prefer_heading {
            [heading, bare]
        } else {
            [bare, heading]
        };
        order.into_iter().flatten().find_map(|a| {
            let title = non_empty(text_of(a))?;
            let link = absolute(base, href(a)?)?;
            Some((title, link))
        })
    }
}
