//! Anchor scan inside content areas.

use std::collections::HashSet;

use jobfeed_core::error::AppError;
use jobfeed_core::models::Job;
use jobfeed_core::sources::LinkScanSpec;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dom::{absolute, href, selector, text_of};
use super::image::ImageFinder;

pub(crate) struct LinksStrategy {
    containers: Selector,
    anchor: Selector,
    href_prefix: Option<String>,
    min_text_len: usize,
    denylist: Vec<String>,
    company_separators: Vec<String>,
    images: Option<ImageFinder>,
}

impl LinksStrategy {
    pub(crate) fn new(spec: &LinkScanSpec) -> Result<Self, AppError> {
        let images = if spec.resolve_images {
            Some(ImageFinder::new()?)
        } else {
            None
        };
        Ok(Self {
            containers: selector(&spec.containers)?,
            anchor: selector("a[href]")?,
            href_prefix: spec.href_prefix.clone(),
            min_text_len: spec.min_text_len,
            denylist: spec.denylist.iter().map(|k| k.to_lowercase()).collect(),
            company_separators: spec.company_separators.clone(),
            images,
        })
    }

    pub(crate) fn extract(&self, doc: &Html, base: &Url, limit: usize) -> Vec<Job> {
        let mut areas: Vec<ElementRef<'_>> = doc.select(&self.containers).collect();
        if areas.is_empty() {
            areas.push(doc.root_element());
        }

        let mut jobs = Vec::new();
        let mut emitted = HashSet::new();
        // Nested areas revisit the same anchors; `emitted` keeps them unique.
        for anchor in areas.iter().flat_map(|area| area.select(&self.anchor)) {
            if jobs.len() >= limit {
                break;
            }
            let Some(link) = href(anchor).and_then(|raw| absolute(base, raw)) else {
                continue;
            };
            if !self.accepts_link(&link) {
                continue;
            }
            let title = text_of(anchor);
            if !self.accepts_text(&title) || !emitted.insert(link.clone()) {
                continue;
            }

            let company = self.company_of(&title);
            let image = self
                .images
                .as_ref()
                .and_then(|finder| finder.find(anchor, base));
            jobs.push(
                Job::new(title, link)
                    .with_company(company)
                    .with_image_url(image),
            );
        }
        jobs
    }

    fn accepts_link(&self, link: &str) -> bool {
        self.href_prefix
            .as_deref()
            .is_none_or(|prefix| link.starts_with(prefix))
    }

    fn accepts_text(&self, text: &str) -> bool {
        if text.chars().count() < self.min_text_len {
            return false;
        }
        let lower = text.to_lowercase();
        !self.denylist.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Text before the first separator that occurs in the title.
    fn company_of(&self, title: &str) -> Option<String> {
        self.company_separators
            .iter()
            .find_map(|sep| title.split_once(sep.as_str()))
            .map(|(company, _)| company.trim())
            .filter(|company| !company.is_empty())
            .map(str::to_string)
    }
}
