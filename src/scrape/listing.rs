//! Stage 1: the events listing page.
//!
//! One fetch, one table. Each qualifying `<tr>` becomes a [`Tournament`];
//! rows that are too short are logged and skipped without aborting the rest
//! of the table, and rows whose date text cannot be parsed are kept with
//! null dates.

use crate::config::SiteConfig;
use crate::error::RowError;
use crate::ids;
use crate::model::Tournament;
use crate::scrape::{element_text, ANCHOR_SELECTOR, CELL_SELECTOR, IMG_SELECTOR, ROW_SELECTOR};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::warn;

/// Visible anchor text marking the video-game division link.
const DIVISION_LABEL: &str = "VG";

pub struct ParsedListing {
    pub tournaments: Vec<Tournament>,
    pub skipped_rows: usize,
}

pub fn parse_listing(html: &str, site: &SiteConfig) -> ParsedListing {
    let document = Html::parse_document(html);

    let mut tournaments = Vec::new();
    let mut skipped_rows = 0;

    for row in document.select(&ROW_SELECTOR) {
        let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
        match parse_listing_row(&cells, site) {
            Ok(tournament) => tournaments.push(tournament),
            Err(e) => {
                warn!(error = %e, "skipping listing row");
                skipped_rows += 1;
            }
        }
    }

    ParsedListing {
        tournaments,
        skipped_rows,
    }
}

/// Cell layout: 0 date range, 1 logo, 2 name, 3 location, 4 division links.
fn parse_listing_row(cells: &[ElementRef], site: &SiteConfig) -> Result<Tournament, RowError> {
    if cells.len() < 5 {
        return Err(RowError::TooFewCells(cells.len()));
    }

    let date_text = element_text(&cells[0]);
    let tournament_name = element_text(&cells[2]);
    let location = element_text(&cells[3]);

    let (start_date, end_date) = match parse_date_range(&date_text) {
        Some((start, end)) => (Some(start), Some(end)),
        None => {
            warn!(%date_text, %tournament_name, "invalid date range, keeping row with null dates");
            (None, None)
        }
    };

    let logo_url = cells[1]
        .select(&IMG_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| site.absolute_url(src));

    let external_ref = cells[4]
        .select(&ANCHOR_SELECTOR)
        .find(|a| element_text(a) == DIVISION_LABEL)
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.replace("/tournament/", ""));

    let tournament_id = ids::tournament_id(&tournament_name, &location, start_date);

    Ok(Tournament {
        tournament_id,
        tournament_name,
        location,
        external_ref,
        start_date,
        end_date,
        logo_url,
    })
}

#[derive(Default)]
struct DateParts {
    month: Option<u32>,
    day: Option<u32>,
    year: Option<i32>,
}

fn month_number(token: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let token = token.to_ascii_lowercase();
    if token.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&token))
        .map(|i| i as u32 + 1)
}

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());
static NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

fn extract_parts(side: &str) -> DateParts {
    let mut parts = DateParts::default();
    for word in WORD_RE.find_iter(side) {
        if let Some(month) = month_number(word.as_str()) {
            parts.month = Some(month);
            break;
        }
    }
    for num in NUM_RE.find_iter(side) {
        let value: i64 = match num.as_str().parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if value >= 1000 {
            parts.year.get_or_insert(value as i32);
        } else if (1..=31).contains(&value) {
            parts.day.get_or_insert(value as u32);
        }
    }
    parts
}

/// Parses the listing's date-range text into (start, end).
///
/// The site mixes formats: "June 7-9, 2024", "May 31-June 2, 2024",
/// "November 17, 2023 - November 19, 2023", and uses a plain hyphen or an
/// en-dash interchangeably. A side missing its month or year borrows it
/// from the other side.
pub(crate) fn parse_date_range(raw: &str) -> Option<(NaiveDate, NaiveDate)> {
    let text = raw.replace('–', "-");
    let (left, right) = match text.split_once('-') {
        Some((l, r)) => (l, r),
        None => (text.as_str(), text.as_str()),
    };

    let left_parts = extract_parts(left);
    let right_parts = extract_parts(right);

    let end_year = right_parts.year.or(left_parts.year)?;
    let start_year = left_parts.year.unwrap_or(end_year);
    let start_month = left_parts.month.or(right_parts.month)?;
    let end_month = right_parts.month.or(left_parts.month)?;

    let start = NaiveDate::from_ymd_opt(start_year, start_month, left_parts.day?)?;
    let end = NaiveDate::from_ymd_opt(end_year, end_month, right_parts.day?)?;
    Some((start, end))
}
