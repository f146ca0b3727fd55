//! Deterministic record identity.
//!
//! The site does not expose stable identifiers for tournaments or players,
//! so ids are derived by hashing the normalized fields. The same inputs must
//! hash to the same id on every run; re-crawls then upsert cleanly downstream.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Hex-encoded 128-bit digest of the input tuple.
fn digest128(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..16])
}

fn date_key(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "None".to_string(),
    }
}

/// Identity for a tournament listing row. A row whose date text failed to
/// parse still gets a stable id via the `None` marker.
pub fn tournament_id(name: &str, location: &str, start_date: Option<NaiveDate>) -> String {
    digest128(&format!("{}{}{}", name, location, date_key(start_date)))
}

/// Identity for a standings row. The site ordinal is page-scoped, not
/// tournament-scoped, so consumers must always key on the composite
/// (tournament_id, player_id) pair.
pub fn player_id(site_ordinal: &str, first_name: &str, last_name: &str) -> String {
    digest128(&format!("{}{}{}", site_ordinal, first_name, last_name))
}
