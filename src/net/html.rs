//! HTML parsing utilities for scraping providers.
//!
//! Uses the `scraper` crate for CSS selector-based parsing and `rayon` for
//! parallel processing of repeated result cards.
//!
//! ```rust
//! use eizo::net::html;
//!
//! let document = html::parse(r#"<div class="card"><a href="/a/1">Frieren</a></div>"#);
//! let titles = html::parse_items(&document, ".card", |card| html::element_text(card, "a"));
//! assert_eq!(titles, vec!["Frieren".to_string()]);
//! ```

use rayon::prelude::*;
use scraper::{ElementRef, Html, Selector};

/// Parses an HTML document from a string.
pub fn parse(html: &str) -> Html {
    Html::parse_document(html)
}

/// Trimmed text of the first descendant of `element` matching `selector`.
///
/// `None` when nothing matches or the selector is invalid.
pub fn element_text(element: ElementRef, selector: &str) -> Option<String> {
    Selector::parse(selector).ok().and_then(|sel| {
        element
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    })
}

/// `attr` of the first descendant of `element` matching `selector`.
pub fn element_attr(element: ElementRef, selector: &str, attr: &str) -> Option<String> {
    Selector::parse(selector).ok().and_then(|sel| {
        element
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr).map(String::from))
    })
}

/// Parses every element matching `selector` into `T`, in parallel.
///
/// Elements are serialized back to HTML strings first so each rayon worker
/// owns its fragment; items the parser rejects are dropped. Document order
/// is preserved.
///
/// ```rust
/// use eizo::net::html;
///
/// let document = html::parse(r#"
///     <ul>
///         <li class="ep"><a href="/ep/1">Episode 1</a></li>
///         <li class="ep"><a href="/ep/2">Episode 2</a></li>
///     </ul>
/// "#);
///
/// let links = html::parse_items(&document, "li.ep", |el| html::element_attr(el, "a", "href"));
/// assert_eq!(links, vec!["/ep/1", "/ep/2"]);
/// ```
pub fn parse_items<T, F>(html: &Html, selector: &str, parser: F) -> Vec<T>
where
    T: Send,
    F: Fn(ElementRef) -> Option<T> + Sync,
{
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            let elements: Vec<String> = html.select(&sel).map(|el| el.html()).collect();

            elements
                .into_par_iter()
                .filter_map(|html_str| {
                    let doc = Html::parse_fragment(&html_str);
                    // parse_fragment wraps content in an <html> root
                    let element = doc
                        .root_element()
                        .first_child()
                        .and_then(ElementRef::wrap)
                        .unwrap_or_else(|| doc.root_element());
                    parser(element)
                })
                .collect()
        })
        .unwrap_or_default()
}
