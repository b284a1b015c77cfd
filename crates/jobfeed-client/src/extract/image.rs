//! Best-effort thumbnail lookup around a job anchor.

use jobfeed_core::error::AppError;
use scraper::{ElementRef, Selector};
use url::Url;

use super::dom::{absolute, selector};

/// How many enclosing elements may supply a background image.
const ANCESTOR_DEPTH: usize = 3;

const IMG_SOURCE_ATTRS: [&str; 3] = ["src", "data-src", "data-lazy-src"];

pub(crate) struct ImageFinder {
    img: Selector,
    styled: Selector,
}

impl ImageFinder {
    pub(crate) fn new() -> Result<Self, AppError> {
        Ok(Self {
            img: selector("img")?,
            styled: selector("[style]")?,
        })
    }

    /// Look on the anchor itself, then up its ancestors for a background,
    /// then back through the anchor's preceding siblings and finally the
    /// element just before its parent.
    pub(crate) fn find(&self, anchor: ElementRef<'_>, base: &Url) -> Option<String> {
        if let Some(raw) = self.image_in(anchor) {
            return absolute(base, raw);
        }

        let ancestors: Vec<ElementRef<'_>> = anchor
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(ANCESTOR_DEPTH)
            .collect();
        for ancestor in &ancestors {
            if let Some(raw) = ancestor.value().attr("style").and_then(background_url) {
                return absolute(base, raw);
            }
        }

        let parent_prev = ancestors
            .first()
            .and_then(|parent| parent.prev_siblings().find_map(ElementRef::wrap));
        anchor
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .chain(parent_prev)
            .find_map(|sibling| self.image_in(sibling))
            .and_then(|raw| absolute(base, raw))
    }

    /// The element's own background or image, else the first inside it.
    fn image_in<'a>(&self, el: ElementRef<'a>) -> Option<&'a str> {
        if el.value().name() == "img" {
            if let Some(src) = img_source(el) {
                return Some(src);
            }
        }
        if let Some(url) = el.value().attr("style").and_then(background_url) {
            return Some(url);
        }
        el.select(&self.img)
            .find_map(img_source)
            .or_else(|| {
                el.select(&self.styled)
                    .find_map(|s| s.value().attr("style").and_then(background_url))
            })
    }
}

fn img_source(img: ElementRef<'_>) -> Option<&str> {
    IMG_SOURCE_ATTRS
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|src| usable(src))
}

/// The `url(...)` of a `background` / `background-image` declaration.
pub(crate) fn background_url(style: &str) -> Option<&str> {
    let lower = style.to_ascii_lowercase();
    let decl = lower.find("background")?;
    let open = decl + lower[decl..].find("url(")? + "url(".len();
    let close = open + style[open..].find(')')?;
    let raw = style[open..close]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    usable(raw).then_some(raw)
}

fn usable(src: &str) -> bool {
    !src.is_empty() && !src.starts_with("data:")
}
