//! Stage 2: per-tournament roster pages.
//!
//! The roster table's layout is conditional: some tournaments publish a
//! country column, others do not. Rows are classified by cell count and the
//! field offsets shift accordingly; a row that fits neither shape is logged
//! and skipped on its own.

use crate::config::SiteConfig;
use crate::error::RowError;
use crate::fetch::Fetcher;
use crate::ids;
use crate::model::{Standing, Tournament, TEAM_LIST_SENTINEL};
use crate::scrape::{element_text, ANCHOR_SELECTOR, CELL_SELECTOR, ROW_SELECTOR};
use scraper::{ElementRef, Html};
use tracing::{info, warn};

pub struct StandingsOutcome {
    pub standings: Vec<Standing>,
    /// Roster pages fetched successfully.
    pub fetched: usize,
    /// Tournaments whose roster fetch failed; their standings (and teams)
    /// are forfeited, the rest of the run continues.
    pub failed_fetches: usize,
    pub skipped_rows: usize,
}

/// Which roster layout a row follows, decided by its cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowShape {
    /// ordinal, first, last, country, division, trainer, team list, rank
    WithCountry,
    /// ordinal, first, last, division, trainer, team list, rank
    WithoutCountry,
}

impl RowShape {
    fn classify(cell_count: usize) -> Result<Self, RowError> {
        match cell_count {
            n if n >= 8 => Ok(Self::WithCountry),
            7 => Ok(Self::WithoutCountry),
            n => Err(RowError::ShapeMismatch(n)),
        }
    }
}

pub async fn crawl_standings(
    fetcher: &dyn Fetcher,
    site: &SiteConfig,
    tournaments: &[Tournament],
) -> StandingsOutcome {
    let mut outcome = StandingsOutcome {
        standings: Vec::new(),
        fetched: 0,
        failed_fetches: 0,
        skipped_rows: 0,
    };

    for tournament in tournaments {
        let Some(external_ref) = tournament.external_ref.as_deref() else {
            continue;
        };
        let url = site.roster_url(external_ref);
        let html = match fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(
                    tournament = %tournament.tournament_name,
                    %url,
                    error = %e,
                    "roster fetch failed, forfeiting this tournament's standings"
                );
                outcome.failed_fetches += 1;
                continue;
            }
        };
        outcome.fetched += 1;

        let page = parse_roster(&html, &tournament.tournament_id);
        info!(
            tournament = %tournament.tournament_name,
            rows = page.standings.len(),
            skipped = page.skipped_rows,
            "parsed roster page"
        );
        outcome.standings.extend(page.standings);
        outcome.skipped_rows += page.skipped_rows;
    }

    outcome
}

pub struct RosterPage {
    pub standings: Vec<Standing>,
    pub skipped_rows: usize,
}

pub fn parse_roster(html: &str, tournament_id: &str) -> RosterPage {
    let document = Html::parse_document(html);

    let mut standings = Vec::new();
    let mut skipped_rows = 0;

    for row in document.select(&ROW_SELECTOR) {
        let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
        // Header rows carry no <td> cells at all.
        if cells.is_empty() {
            continue;
        }
        match parse_roster_row(&cells, tournament_id) {
            Ok(standing) => standings.push(standing),
            Err(e) => {
                warn!(tournament_id, error = %e, "skipping roster row");
                skipped_rows += 1;
            }
        }
    }

    RosterPage {
        standings,
        skipped_rows,
    }
}

fn parse_roster_row(cells: &[ElementRef], tournament_id: &str) -> Result<Standing, RowError> {
    let shape = RowShape::classify(cells.len())?;
    // Country pushes every later field right by one.
    let shift = match shape {
        RowShape::WithCountry => 1,
        RowShape::WithoutCountry => 0,
    };

    let site_ordinal = element_text(&cells[0]);
    let first_name = element_text(&cells[1]);
    let last_name = element_text(&cells[2]);
    let country = match shape {
        RowShape::WithCountry => Some(element_text(&cells[3])),
        RowShape::WithoutCountry => None,
    };
    let division = element_text(&cells[3 + shift]);
    let trainer_name = element_text(&cells[4 + shift]);

    let team_list_ref = cells[5 + shift]
        .select(&ANCHOR_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.replace("/teamlist/public/", ""))
        .unwrap_or_else(|| TEAM_LIST_SENTINEL.to_string());

    // Kept as raw text: mid-event rosters publish blank or non-numeric
    // standings, and those rows must survive.
    let rank = element_text(&cells[6 + shift]);

    let player_id = ids::player_id(&site_ordinal, &first_name, &last_name);

    Ok(Standing {
        tournament_id: tournament_id.to_string(),
        player_id,
        first_name,
        last_name,
        country,
        division,
        trainer_name,
        team_list_ref,
        rank,
    })
}
