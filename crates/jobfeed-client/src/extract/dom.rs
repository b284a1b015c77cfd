//! Small DOM helpers shared by the extraction strategies.

use jobfeed_core::error::AppError;
use scraper::{ElementRef, Selector};
use url::Url;

pub(crate) fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::Generic(format!("invalid selector '{css}': {e}")))
}

/// Visible text with every text node trimmed and joined by single spaces.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

pub(crate) fn href(el: ElementRef<'_>) -> Option<&str> {
    el.value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
}

/// Resolve `raw` against `base`, keeping only http(s) results.
///
/// Handles protocol-relative (`//host/x`) and root-relative (`/x`) forms.
pub(crate) fn absolute(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let url = base.join(raw).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.into()),
        _ => None,
    }
}
