//! Stage parsers and crawlers for the three-step crawl: events listing,
//! per-tournament rosters, per-player team lists. Each stage consumes the
//! previous stage's records and isolates failures to the smallest unit
//! (one row, one card block, one fetch).

pub mod listing;
pub mod standings;
pub mod teams;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

// Selectors shared across the stage parsers, compiled once.
pub(crate) static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
pub(crate) static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
pub(crate) static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
pub(crate) static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// Trimmed text content of an element, inner whitespace collapsed.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
