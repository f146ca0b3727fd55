//! Stage 3: per-player team pages, the concurrency-critical path.
//!
//! Standings still waiting on a published roster are filtered out up front,
//! then one fetch per remaining standing fans out over a bounded worker
//! pool. Results carry their own (tournament_id, player_id) key, so fan-in
//! order does not matter.

use crate::config::SiteConfig;
use crate::error::RowError;
use crate::fetch::Fetcher;
use crate::model::{Standing, TeamMember};
use crate::scrape::IMG_SELECTOR;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// CSS classes the site puts on each roster-slot card.
static CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.pokemon.bg-light-green-50.p-3").unwrap());
static BOLD_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("b").unwrap());
static BADGE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.badge").unwrap());

/// A team has at most six slots; anything past that is markup noise.
const MAX_TEAM_SIZE: usize = 6;

pub struct TeamsOutcome {
    pub members: Vec<TeamMember>,
    pub fetched: usize,
    pub failed_fetches: usize,
    pub skipped_blocks: usize,
    /// Standings filtered out because their roster was not public.
    pub not_published: usize,
}

pub async fn crawl_teams(
    fetcher: Arc<dyn Fetcher>,
    site: &SiteConfig,
    standings: &[Standing],
    concurrency: usize,
) -> TeamsOutcome {
    let mut outcome = TeamsOutcome {
        members: Vec::new(),
        fetched: 0,
        failed_fetches: 0,
        skipped_blocks: 0,
        not_published: 0,
    };

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<Option<TeamPage>> = JoinSet::new();

    for standing in standings {
        if !standing.has_team_list() {
            outcome.not_published += 1;
            continue;
        }
        let url = site.team_list_url(&standing.team_list_ref);
        let tournament_id = standing.tournament_id.clone();
        let player_id = standing.player_id.clone();
        let fetcher = fetcher.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            match fetcher.fetch(&url).await {
                Ok(html) => Some(parse_team_page(&html, &tournament_id, &player_id)),
                Err(e) => {
                    warn!(%url, error = %e, "team fetch failed, forfeiting this standing's team");
                    None
                }
            }
        });
    }

    // Join barrier: the stage is complete only once every worker has
    // reported back.
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(page)) => {
                outcome.fetched += 1;
                outcome.skipped_blocks += page.skipped_blocks;
                outcome.members.extend(page.members);
            }
            Ok(None) => outcome.failed_fetches += 1,
            Err(e) => {
                warn!(error = %e, "team fetch task aborted");
                outcome.failed_fetches += 1;
            }
        }
    }

    outcome
}

pub struct TeamPage {
    pub members: Vec<TeamMember>,
    pub skipped_blocks: usize,
}

pub fn parse_team_page(html: &str, tournament_id: &str, player_id: &str) -> TeamPage {
    let document = Html::parse_document(html);

    let mut members = Vec::new();
    let mut skipped_blocks = 0;

    for card in document.select(&CARD_SELECTOR).take(MAX_TEAM_SIZE) {
        match parse_card(&card, tournament_id, player_id) {
            Ok(member) => members.push(member),
            Err(e) => {
                warn!(tournament_id, player_id, error = %e, "skipping team card block");
                skipped_blocks += 1;
            }
        }
    }

    TeamPage {
        members,
        skipped_blocks,
    }
}

fn parse_card(
    card: &ElementRef,
    tournament_id: &str,
    player_id: &str,
) -> Result<TeamMember, RowError> {
    let icon_url = card
        .select(&IMG_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or(RowError::MissingField("icon"))?
        .to_string();

    let display_text = card
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    let (species, form) = split_species_form(&display_text)?;

    let tera_type = label_value(card, "Tera Type:").ok_or(RowError::MissingField("tera type"))?;
    let ability = label_value(card, "Ability:").ok_or(RowError::MissingField("ability"))?;
    let held_item = label_value(card, "Held Item:").ok_or(RowError::MissingField("held item"))?;

    let moves: Vec<String> = card
        .select(&BADGE_SELECTOR)
        .map(|badge| badge.text().collect::<String>().trim().to_string())
        .collect();
    let moves: [String; 4] = moves
        .try_into()
        .map_err(|bad: Vec<String>| RowError::MoveArity(bad.len()))?;

    Ok(TeamMember {
        tournament_id: tournament_id.to_string(),
        player_id: player_id.to_string(),
        icon_url,
        species,
        form,
        tera_type,
        ability,
        held_item,
        moves,
    })
}

/// Splits `Name [Form]` display text; form defaults to "N/A" when the
/// bracket tag is absent, in which case the species is the leading token.
fn split_species_form(display_text: &str) -> Result<(String, String), RowError> {
    if let (Some(open), Some(close)) = (display_text.find('['), display_text.find(']')) {
        if open < close {
            let species = display_text[..open].trim().to_string();
            let form = display_text[open + 1..close].trim().to_string();
            if !species.is_empty() {
                return Ok((species, form));
            }
            return Err(RowError::MissingField("species"));
        }
    }
    let species = display_text
        .split_whitespace()
        .next()
        .ok_or(RowError::MissingField("species"))?
        .to_string();
    Ok((species, "N/A".to_string()))
}

/// Finds a `<b>` node whose text is exactly `label` and returns the first
/// non-empty text that follows it, cleaned of quote marks and
/// non-breaking-space artifacts.
fn label_value(card: &ElementRef, label: &str) -> Option<String> {
    for bold in card.select(&BOLD_SELECTOR) {
        if bold.text().collect::<String>().trim() != label {
            continue;
        }
        let mut sibling = bold.next_sibling();
        while let Some(node) = sibling {
            if let Some(text) = node.value().as_text() {
                let cleaned = clean_value(text);
                if !cleaned.is_empty() {
                    return Some(cleaned);
                }
            }
            sibling = node.next_sibling();
        }
    }
    None
}

fn clean_value(raw: &str) -> String {
    raw.replace("&nbsp;", "")
        .replace('\u{a0}', " ")
        .trim()
        .trim_matches('"')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as ScrapeResult;
    use crate::model::TEAM_LIST_SENTINEL;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn card(species_line: &str, moves: &[&str]) -> String {
        let badges: String = moves
            .iter()
            .map(|m| format!(r#"<span class="badge">{m}</span>"#))
            .collect();
        format!(
            r#"<div class="pokemon bg-light-green-50 p-3">
                 <img src="/static/icons/25.png">
                 <h5>{species_line}</h5>
                 <b>Tera Type:</b> "Electric"
                 <b>Ability:</b>&nbsp;Static
                 <b>Held Item:</b> Light Ball
                 {badges}
               </div>"#
        )
    }

    const FOUR_MOVES: [&str; 4] = ["Thunderbolt", "Protect", "Fake Out", "Volt Switch"];

    #[test]
    fn card_with_four_moves_is_complete() {
        let html = card("Pikachu", &FOUR_MOVES);
        let page = parse_team_page(&html, "t1", "p1");
        assert_eq!(page.members.len(), 1);
        let member = &page.members[0];
        assert_eq!(member.species, "Pikachu");
        assert_eq!(member.form, "N/A");
        assert_eq!(member.tera_type, "Electric");
        assert_eq!(member.ability, "Static");
        assert_eq!(member.held_item, "Light Ball");
        assert_eq!(member.icon_url, "/static/icons/25.png");
        assert_eq!(member.moves[0], "Thunderbolt");
        assert_eq!(member.moves[3], "Volt Switch");
    }

    #[test]
    fn bracketed_form_is_split_out() {
        let html = card("Urshifu [Rapid Strike]", &FOUR_MOVES);
        let page = parse_team_page(&html, "t1", "p1");
        let member = &page.members[0];
        assert_eq!(member.species, "Urshifu");
        assert_eq!(member.form, "Rapid Strike");
    }

    #[test]
    fn wrong_move_arity_rejects_only_that_block() {
        let html = format!(
            "{}{}{}",
            card("Pikachu", &FOUR_MOVES),
            card("Snorlax", &["Rest", "Body Slam", "Yawn"]),
            card("Gengar", &["Shadow Ball", "Sludge Bomb", "Protect", "Icy Wind", "Hex"]),
        );
        let page = parse_team_page(&html, "t1", "p1");
        assert_eq!(page.members.len(), 1);
        assert_eq!(page.members[0].species, "Pikachu");
        assert_eq!(page.skipped_blocks, 2);
    }

    #[test]
    fn at_most_six_blocks_are_read() {
        let html: String = (0..7).map(|_| card("Pikachu", &FOUR_MOVES)).collect();
        let page = parse_team_page(&html, "t1", "p1");
        assert_eq!(page.members.len(), 6);
    }

    #[test]
    fn missing_label_rejects_the_block() {
        let html = r#"<div class="pokemon bg-light-green-50 p-3">
            <img src="/i.png"><h5>Pikachu</h5>
            <b>Ability:</b> Static
            <b>Held Item:</b> Light Ball
            <span class="badge">A</span><span class="badge">B</span>
            <span class="badge">C</span><span class="badge">D</span>
        </div>"#;
        let page = parse_team_page(html, "t1", "p1");
        assert_eq!(page.members.len(), 0);
        assert_eq!(page.skipped_blocks, 1);
    }

    #[test]
    fn label_values_are_cleaned() {
        let html = card("Pikachu", &FOUR_MOVES);
        let page = parse_team_page(&html, "t1", "p1");
        let member = &page.members[0];
        // quotes and &nbsp; artifacts stripped
        assert_eq!(member.tera_type, "Electric");
        assert_eq!(member.ability, "Static");
    }

    struct StubFetcher {
        requested: Mutex<Vec<String>>,
        body: String,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> ScrapeResult<String> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(self.body.clone())
        }
    }

    fn standing(player_id: &str, team_list_ref: &str) -> Standing {
        Standing {
            tournament_id: "t1".into(),
            player_id: player_id.into(),
            first_name: "First".into(),
            last_name: "Last".into(),
            country: None,
            division: "Masters".into(),
            trainer_name: "trainer".into(),
            team_list_ref: team_list_ref.into(),
            rank: "1".into(),
        }
    }

    #[tokio::test]
    async fn sentinel_standings_never_enter_the_fetch_set() {
        let fetcher = Arc::new(StubFetcher {
            requested: Mutex::new(Vec::new()),
            body: card("Pikachu", &FOUR_MOVES),
        });
        let standings = vec![
            standing("p1", "tok3n"),
            standing("p2", TEAM_LIST_SENTINEL),
            standing("p3", "oth3r"),
        ];
        let outcome = crawl_teams(
            fetcher.clone(),
            &SiteConfig::default(),
            &standings,
            4,
        )
        .await;

        assert_eq!(outcome.not_published, 1);
        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.members.len(), 2);
        let requested = fetcher.requested.lock().unwrap();
        assert_eq!(requested.len(), 2);
        assert!(requested.iter().all(|u| !u.contains(TEAM_LIST_SENTINEL)));
    }

    struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> ScrapeResult<String> {
            Err(crate::error::ScraperError::Status {
                url: url.to_string(),
                status: 504,
            })
        }
    }

    #[tokio::test]
    async fn failed_fetch_forfeits_only_that_standing() {
        let standings = vec![standing("p1", "tok3n")];
        let outcome =
            crawl_teams(Arc::new(FailingFetcher), &SiteConfig::default(), &standings, 4).await;
        assert_eq!(outcome.failed_fetches, 1);
        assert!(outcome.members.is_empty());
    }

    /// Hangs on "slow" team pages until its internal budget elapses, then
    /// errors the way a timed-out request does.
    struct SlowFetcher {
        body: String,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, url: &str) -> ScrapeResult<String> {
            if url.contains("slow") {
                let stalled = std::future::pending::<()>();
                if tokio::time::timeout(std::time::Duration::from_millis(20), stalled)
                    .await
                    .is_err()
                {
                    return Err(crate::error::ScraperError::Status {
                        url: url.to_string(),
                        status: 408,
                    });
                }
            }
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn timed_out_fetch_resolves_as_skip_without_stalling_siblings() {
        let fetcher = Arc::new(SlowFetcher {
            body: card("Pikachu", &FOUR_MOVES),
        });
        let standings = vec![standing("p1", "slow-token"), standing("p2", "fast-token")];
        let outcome = crawl_teams(fetcher, &SiteConfig::default(), &standings, 2).await;

        assert_eq!(outcome.fetched, 1);
        assert_eq!(outcome.failed_fetches, 1);
        assert_eq!(outcome.members.len(), 1);
        assert_eq!(outcome.members[0].player_id, "p2");
    }
}
