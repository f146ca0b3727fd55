use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel stored when a player's roster page is not public yet. The team
/// crawler filters these out before building its fetch set.
pub const TEAM_LIST_SENTINEL: &str = "Submitted";

/// One row of the events listing page. Created once per listing parse and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub tournament_id: String,
    pub tournament_name: String,
    pub location: String,
    /// Site-specific tournament token used to build the roster URL. Rows
    /// without one are kept but never crawled for standings.
    pub external_ref: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub logo_url: Option<String>,
}

/// One row of a tournament's roster page, keyed by (tournament_id, player_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub tournament_id: String,
    pub player_id: String,
    pub first_name: String,
    pub last_name: String,
    pub country: Option<String>,
    pub division: String,
    pub trainer_name: String,
    pub team_list_ref: String,
    /// Raw text of the standing cell. Mid-event rosters publish blank or
    /// placeholder standings, so this is not numeric.
    pub rank: String,
}

impl Standing {
    /// Whether the player's roster page is public.
    pub fn has_team_list(&self) -> bool {
        self.team_list_ref != TEAM_LIST_SENTINEL
    }
}

/// One roster slot from a player's team page. Re-derived on every crawl; its
/// only identity is the composite (tournament_id, player_id, species).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub tournament_id: String,
    pub player_id: String,
    pub icon_url: String,
    pub species: String,
    pub form: String,
    pub tera_type: String,
    pub ability: String,
    pub held_item: String,
    pub moves: [String; 4],
}

/// Tabular contract with the persistence collaborator: each record type maps
/// to a header row plus one string row per record.
pub trait TableRecord {
    const TABLE: &'static str;

    fn header() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_date(value: &Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

impl TableRecord for Tournament {
    const TABLE: &'static str = "tournaments";

    fn header() -> &'static [&'static str] {
        &[
            "tournament_id",
            "tournament_name",
            "location",
            "rk9_id",
            "start_date",
            "end_date",
            "logo_link",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.tournament_id.clone(),
            self.tournament_name.clone(),
            self.location.clone(),
            opt(&self.external_ref),
            opt_date(&self.start_date),
            opt_date(&self.end_date),
            opt(&self.logo_url),
        ]
    }
}

impl TableRecord for Standing {
    const TABLE: &'static str = "standings";

    fn header() -> &'static [&'static str] {
        &[
            "tournament_id",
            "player_id",
            "first_name",
            "last_name",
            "country",
            "division",
            "trainer_name",
            "team_list",
            "standing",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.tournament_id.clone(),
            self.player_id.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            opt(&self.country),
            self.division.clone(),
            self.trainer_name.clone(),
            self.team_list_ref.clone(),
            self.rank.clone(),
        ]
    }
}

impl TableRecord for TeamMember {
    const TABLE: &'static str = "teams";

    fn header() -> &'static [&'static str] {
        &[
            "tournament_id",
            "player_id",
            "icon",
            "pokemon",
            "form",
            "tera_type",
            "ability",
            "held_item",
            "move1",
            "move2",
            "move3",
            "move4",
        ]
    }

    fn row(&self) -> Vec<String> {
        let mut row = vec![
            self.tournament_id.clone(),
            self.player_id.clone(),
            self.icon_url.clone(),
            self.species.clone(),
            self.form.clone(),
            self.tera_type.clone(),
            self.ability.clone(),
            self.held_item.clone(),
        ];
        row.extend(self.moves.iter().cloned());
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_standing_has_no_team_list() {
        let standing = Standing {
            tournament_id: "t".into(),
            player_id: "p".into(),
            first_name: "Ash".into(),
            last_name: "Ketchum".into(),
            country: None,
            division: "Masters".into(),
            trainer_name: "ash".into(),
            team_list_ref: TEAM_LIST_SENTINEL.into(),
            rank: "1".into(),
        };
        assert!(!standing.has_team_list());
    }

    #[test]
    fn tournament_row_matches_header_arity() {
        let tournament = Tournament {
            tournament_id: "id".into(),
            tournament_name: "NAIC 2024".into(),
            location: "New Orleans, US".into(),
            external_ref: None,
            start_date: None,
            end_date: None,
            logo_url: None,
        };
        assert_eq!(tournament.row().len(), Tournament::header().len());
    }

    #[test]
    fn team_member_row_matches_header_arity() {
        let member = TeamMember {
            tournament_id: "t".into(),
            player_id: "p".into(),
            icon_url: "/i.png".into(),
            species: "Pikachu".into(),
            form: "N/A".into(),
            tera_type: "Electric".into(),
            ability: "Static".into(),
            held_item: "Light Ball".into(),
            moves: [
                "Thunderbolt".into(),
                "Protect".into(),
                "Fake Out".into(),
                "Volt Switch".into(),
            ],
        };
        assert_eq!(member.row().len(), TeamMember::header().len());
    }
}
