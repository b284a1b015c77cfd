//! Table-driven description of every job source.
//!
//! A [`SourceProfile`] names a page and the ordered list of extraction
//! strategies to try on it. Adding a source means adding a profile here;
//! the extractor itself never branches on source names.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

pub const FRESHERSNOW: &str = "freshersnow";
pub const TNPOFFICER: &str = "tnpofficer";

/// A normalized job field that a table column can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Company,
    Title,
    Qualification,
    Experience,
    Location,
    Link,
}

/// Structured scan: find a table whose header cells match a label vocabulary.
#[derive(Debug, Clone)]
pub struct TableSpec {
    /// Field and the lowercase substring that identifies its header cell.
    pub columns: Vec<(Field, String)>,
    /// A table qualifies once this many labels are found among its headers.
    pub min_header_matches: usize,
    /// Data rows with fewer cells are skipped.
    pub min_row_cells: usize,
}

/// Heuristic scan over generic post containers.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Tried in order; the first selector matching anything wins.
    pub candidates: Vec<String>,
    /// Used when no candidate matches.
    pub catch_all: String,
    pub catch_all_cap: usize,
    /// Look for an `h2 a` / `h3 a` before the first bare anchor.
    pub prefer_heading: bool,
}

/// Anchor scan inside content areas, filtered by origin and keywords.
#[derive(Debug, Clone)]
pub struct LinkScanSpec {
    /// Selector for content areas; the whole document is used when none match.
    pub containers: String,
    /// Only hrefs starting with this prefix are kept.
    pub href_prefix: Option<String>,
    pub min_text_len: usize,
    /// Lowercase substrings that mark navigation or ad links.
    pub denylist: Vec<String>,
    /// The company name is the title text before the first separator found.
    pub company_separators: Vec<String>,
    pub resolve_images: bool,
}

/// One step of an extraction cascade.
#[derive(Debug, Clone)]
pub enum Strategy {
    Table(TableSpec),
    Containers(ContainerSpec),
    Links(LinkScanSpec),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Table(_) => "table",
            Strategy::Containers(_) => "containers",
            Strategy::Links(_) => "links",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceProfile {
    /// Stable lowercase key used on the command line and in logs.
    pub name: String,
    pub url: String,
    /// Tried in order until one yields at least one job.
    pub strategies: Vec<Strategy>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SourceProfile {
    pub fn freshersnow() -> Self {
        Self {
            name: FRESHERSNOW.to_string(),
            url: "https://www.freshersnow.com/freshers-jobs/".to_string(),
            strategies: vec![
                Strategy::Table(TableSpec {
                    columns: vec![
                        (Field::Company, "company".into()),
                        (Field::Title, "job role".into()),
                        (Field::Qualification, "qualification".into()),
                        (Field::Experience, "experience".into()),
                        (Field::Location, "location".into()),
                        (Field::Link, "apply".into()),
                    ],
                    min_header_matches: 4,
                    min_row_cells: 4,
                }),
                Strategy::Containers(ContainerSpec {
                    candidates: strings(&[
                        "article.type-post",
                        "div.job-list",
                        "li.job-item",
                        "div.post",
                    ]),
                    catch_all: "article, .post, .entry, .blog-post, li".to_string(),
                    catch_all_cap: 100,
                    prefer_heading: false,
                }),
            ],
        }
    }

    pub fn tnpofficer() -> Self {
        Self {
            name: TNPOFFICER.to_string(),
            url: "https://tnpofficer.com/2025-batch/".to_string(),
            strategies: vec![Strategy::Links(LinkScanSpec {
                containers: "article, .entry-content, .post-content, .site-content, #content"
                    .to_string(),
                href_prefix: Some("https://tnpofficer.com/".to_string()),
                min_text_len: 6,
                denylist: strings(&[
                    "mock",
                    "course",
                    "certification",
                    "resources",
                    "quick links",
                    "privacy",
                ]),
                company_separators: strings(&[" off campus", " Off Campus", " | "]),
                resolve_images: true,
            })],
        }
    }
}

/// Built-in sources in delivery priority order.
pub fn builtin_sources() -> Vec<SourceProfile> {
    vec![SourceProfile::freshersnow(), SourceProfile::tnpofficer()]
}

/// Which sources a pipeline run should pull from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceSelector {
    #[default]
    All,
    /// Explicit names, matched case-insensitively.
    Named(Vec<String>),
}

impl SourceSelector {
    pub fn one(name: impl Into<String>) -> Self {
        SourceSelector::Named(vec![name.into()])
    }

    /// Resolve to indices into `known` (priority order), without duplicates.
    ///
    /// Named selections are re-ordered into priority order.
    pub fn resolve(&self, known: &[&str]) -> Result<Vec<usize>, AppError> {
        match self {
            SourceSelector::All => Ok((0..known.len()).collect()),
            SourceSelector::Named(names) => {
                let mut picked = Vec::with_capacity(names.len());
                for name in names {
                    let idx = known
                        .iter()
                        .position(|k| k.eq_ignore_ascii_case(name.trim()))
                        .ok_or_else(|| AppError::UnknownSource(name.clone()))?;
                    if !picked.contains(&idx) {
                        picked.push(idx);
                    }
                }
                picked.sort_unstable();
                Ok(picked)
            }
        }
    }
}

impl FromStr for SourceSelector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(SourceSelector::All);
        }
        let names: Vec<String> = trimmed
            .split(',')
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(AppError::UnknownSource(s.to_string()));
        }
        Ok(SourceSelector::Named(names))
    }
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelector::All => write!(f, "all"),
            SourceSelector::Named(names) => write!(f, "{}", names.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &[FRESHERSNOW, TNPOFFICER];

    #[test]
    fn test_builtin_priority_order() {
        let names: Vec<_> = builtin_sources().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![FRESHERSNOW, TNPOFFICER]);
    }

    #[test]
    fn test_table_first_then_containers() {
        let profile = SourceProfile::freshersnow();
        let kinds: Vec<_> = profile.strategies.iter().map(Strategy::name).collect();
        assert_eq!(kinds, vec!["table", "containers"]);
    }

    #[test]
    fn test_selector_all() {
        let sel: SourceSelector = "all".parse().unwrap();
        assert_eq!(sel, SourceSelector::All);
        assert_eq!(sel.resolve(KNOWN).unwrap(), vec![0, 1]);
        assert_eq!("".parse::<SourceSelector>().unwrap(), SourceSelector::All);
    }

    #[test]
    fn test_selector_reorders_into_priority_and_dedups() {
        let sel: SourceSelector = "TNPOfficer, freshersnow,tnpofficer".parse().unwrap();
        assert_eq!(sel.resolve(KNOWN).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_selector_unknown_source() {
        let sel = SourceSelector::one("linkedin");
        let err = sel.resolve(KNOWN).unwrap_err();
        assert!(matches!(err, AppError::UnknownSource(name) if name == "linkedin"));
    }
}
