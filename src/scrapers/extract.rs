use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Image reference found in a page
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub url: String,
    pub alt: String,
}

const LAZY_ATTRS: [&str; 3] = ["data-src", "data-lazy-src", "data-original"];

/// Collect every `<img>` source in document order, resolved against `page_url`.
///
/// An inline `data:` `src` counts as a placeholder: lazy-loading attributes
/// come next, then the first `srcset` candidate. The placeholder itself is
/// only reported when nothing else is present.
pub fn image_sources(html: &str, page_url: &str) -> Vec<ImageSource> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };
    let base = Url::parse(page_url).ok();

    document
        .select(&selector)
        .filter_map(|element| {
            let raw = pick_source(&element)?;
            let alt = element.value().attr("alt").unwrap_or("").trim().to_string();
            Some(ImageSource {
                url: absolutize(raw, base.as_ref()),
                alt,
            })
        })
        .collect()
}

fn pick_source<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    let attrs = element.value();
    let src = attrs.attr("src").map(str::trim).filter(|s| !s.is_empty());
    let real_src = src.filter(|s| !s.starts_with("data:"));
    let lazy = LAZY_ATTRS
        .iter()
        .filter_map(|name| attrs.attr(name))
        .map(str::trim)
        .find(|s| !s.is_empty());

    real_src
        .or(lazy)
        .or_else(|| attrs.attr("srcset").and_then(first_srcset_url))
        .or(src)
}

/// URL of the first `srcset` candidate.
///
/// Candidates are separated by commas followed by descriptors, but the URL
/// itself may contain commas (`w_300,h_200`), so only whitespace ends it.
fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split_whitespace()
        .next()
        .map(|token| token.trim_end_matches(','))
        .filter(|url| !url.is_empty())
}

fn absolutize(raw: &str, base: Option<&Url>) -> String {
    if raw.starts_with("data:") {
        return raw.to_string();
    }
    match base.and_then(|base| base.join(raw).ok()) {
        Some(url) => url.to_string(),
        None if raw.starts_with("//") => format!("https:{}", raw),
        None => raw.to_string(),
    }
}
