//! Three-stage crawl orchestration.
//!
//! Stages run strictly in order: the listing supplies (tournament_id,
//! external_ref) pairs to the standings stage, which supplies
//! (tournament_id, player_id, team_list_ref) triples to the teams stage.
//! Each stage's rows are fully materialized and handed to the sink before
//! the next stage starts. Empty intermediate results are valid; the run
//! hard-fails only when the listing itself yields nothing.

use crate::config::Config;
use crate::error::{Result, ScraperError};
use crate::fetch::Fetcher;
use crate::model::{Standing, TeamMember, Tournament};
use crate::scrape::{listing, standings, teams};
use crate::sink::TableSink;
use std::sync::Arc;
use tracing::{info, Instrument};

#[derive(Debug, Clone, Default)]
pub struct StageSummary {
    pub pages_fetched: usize,
    pub records: usize,
    pub units_skipped: usize,
    pub fetches_failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub tournaments: StageSummary,
    pub standings: StageSummary,
    pub teams: StageSummary,
}

pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn TableSink>,
}

impl Pipeline {
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>, sink: Arc<dyn TableSink>) -> Self {
        Self {
            config,
            fetcher,
            sink,
        }
    }

    /// Stage 1: the events listing. A fetch failure here is fatal, as is an
    /// empty result set; nothing downstream could proceed.
    pub async fn crawl_tournaments(&self) -> Result<(Vec<Tournament>, StageSummary)> {
        let url = self.config.site.events_url();
        let html = self.fetcher.fetch(&url).await?;
        let parsed = listing::parse_listing(&html, &self.config.site);

        if parsed.tournaments.is_empty() {
            return Err(ScraperError::NoSeedData);
        }

        self.sink.write_tournaments(&parsed.tournaments).await?;
        let summary = StageSummary {
            pages_fetched: 1,
            records: parsed.tournaments.len(),
            units_skipped: parsed.skipped_rows,
            fetches_failed: 0,
        };
        info!(
            records = summary.records,
            skipped = summary.units_skipped,
            "tournaments stage complete"
        );
        Ok((parsed.tournaments, summary))
    }

    /// Stage 2: roster pages for every tournament carrying an external ref.
    pub async fn crawl_standings(
        &self,
        tournaments: &[Tournament],
    ) -> Result<(Vec<Standing>, StageSummary)> {
        let outcome =
            standings::crawl_standings(self.fetcher.as_ref(), &self.config.site, tournaments).await;

        self.sink.write_standings(&outcome.standings).await?;
        let summary = StageSummary {
            pages_fetched: outcome.fetched,
            records: outcome.standings.len(),
            units_skipped: outcome.skipped_rows,
            fetches_failed: outcome.failed_fetches,
        };
        info!(
            records = summary.records,
            pages = summary.pages_fetched,
            skipped = summary.units_skipped,
            failed = summary.fetches_failed,
            "standings stage complete"
        );
        Ok((outcome.standings, summary))
    }

    /// Stage 3: team pages, fanned out over the bounded worker pool.
    pub async fn crawl_teams(
        &self,
        standings: &[Standing],
    ) -> Result<(Vec<TeamMember>, StageSummary)> {
        let outcome = teams::crawl_teams(
            self.fetcher.clone(),
            &self.config.site,
            standings,
            self.config.crawl.team_concurrency,
        )
        .await;

        self.sink.write_team_members(&outcome.members).await?;
        let summary = StageSummary {
            pages_fetched: outcome.fetched,
            records: outcome.members.len(),
            units_skipped: outcome.skipped_blocks,
            fetches_failed: outcome.failed_fetches,
        };
        info!(
            records = summary.records,
            pages = summary.pages_fetched,
            skipped = summary.units_skipped,
            failed = summary.fetches_failed,
            not_published = outcome.not_published,
            "teams stage complete"
        );
        Ok((outcome.members, summary))
    }

    /// Runs all three stages in order.
    pub async fn run_all(&self) -> Result<RunSummary> {
        let (tournaments, tournament_summary) = self
            .crawl_tournaments()
            .instrument(tracing::info_span!("tournaments_stage"))
            .await?;
        let (standings, standings_summary) = self
            .crawl_standings(&tournaments)
            .instrument(tracing::info_span!("standings_stage"))
            .await?;
        let (_, teams_summary) = self
            .crawl_teams(&standings)
            .instrument(tracing::info_span!("teams_stage"))
            .await?;

        Ok(RunSummary {
            tournaments: tournament_summary,
            standings: standings_summary,
            teams: teams_summary,
        })
    }
}
