//! Persistence collaborator seam.
//!
//! The pipeline only produces clean, keyed rows; where they land (CSV files
//! here, a database elsewhere) is the sink's business. `CsvSink` mirrors the
//! downstream loader's expectations: one file per table, header row first.

use crate::error::{Result, ScraperError};
use crate::model::{Standing, TableRecord, TeamMember, Tournament, TEAM_LIST_SENTINEL};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

#[async_trait]
pub trait TableSink: Send + Sync {
    async fn write_tournaments(&self, rows: &[Tournament]) -> Result<()>;
    async fn write_standings(&self, rows: &[Standing]) -> Result<()>;
    async fn write_team_members(&self, rows: &[TeamMember]) -> Result<()>;
}

pub struct CsvSink {
    out_dir: PathBuf,
}

impl CsvSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    fn table_path<T: TableRecord>(&self) -> PathBuf {
        self.out_dir.join(format!("{}.csv", T::TABLE))
    }

    fn write_table<T: TableRecord>(&self, rows: &[T]) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.table_path::<T>();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(T::header())?;
        for row in rows {
            writer.write_record(row.row())?;
        }
        writer.flush()?;
        info!(table = T::TABLE, rows = rows.len(), path = %path.display(), "wrote table");
        Ok(())
    }

    fn read_table(path: &Path) -> Result<Vec<csv::StringRecord>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?);
        }
        Ok(records)
    }

    /// Reads back a previously written tournaments table, for runs that
    /// start at the standings stage.
    pub fn read_tournaments(&self) -> Result<Vec<Tournament>> {
        let path = self.table_path::<Tournament>();
        let mut tournaments = Vec::new();
        for record in Self::read_table(&path)? {
            tournaments.push(Tournament {
                tournament_id: field(&record, 0)?,
                tournament_name: field(&record, 1)?,
                location: field(&record, 2)?,
                external_ref: optional(field(&record, 3)?),
                start_date: parse_date(&field(&record, 4)?)?,
                end_date: parse_date(&field(&record, 5)?)?,
                logo_url: optional(field(&record, 6)?),
            });
        }
        Ok(tournaments)
    }

    /// Reads back a previously written standings table, for runs that start
    /// at the teams stage.
    pub fn read_standings(&self) -> Result<Vec<Standing>> {
        let path = self.table_path::<Standing>();
        let mut standings = Vec::new();
        for record in Self::read_table(&path)? {
            let team_list = field(&record, 7)?;
            standings.push(Standing {
                tournament_id: field(&record, 0)?,
                player_id: field(&record, 1)?,
                first_name: field(&record, 2)?,
                last_name: field(&record, 3)?,
                country: optional(field(&record, 4)?),
                division: field(&record, 5)?,
                trainer_name: field(&record, 6)?,
                team_list_ref: if team_list.is_empty() {
                    TEAM_LIST_SENTINEL.to_string()
                } else {
                    team_list
                },
                rank: field(&record, 8)?,
            });
        }
        Ok(standings)
    }
}

fn field(record: &csv::StringRecord, index: usize) -> Result<String> {
    record
        .get(index)
        .map(str::to_string)
        .ok_or_else(|| ScraperError::MalformedRecord(format!("missing column {index}")))
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_date(value: &str) -> Result<Option<NaiveDate>> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ScraperError::MalformedRecord(format!("bad date '{value}'")))
}

#[async_trait]
impl TableSink for CsvSink {
    async fn write_tournaments(&self, rows: &[Tournament]) -> Result<()> {
        self.write_table(rows)
    }

    async fn write_standings(&self, rows: &[Standing]) -> Result<()> {
        self.write_table(rows)
    }

    async fn write_team_members(&self, rows: &[TeamMember]) -> Result<()> {
        self.write_table(rows)
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    pub tournaments: Mutex<Vec<Tournament>>,
    pub standings: Mutex<Vec<Standing>>,
    pub team_members: Mutex<Vec<TeamMember>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableSink for MemorySink {
    async fn write_tournaments(&self, rows: &[Tournament]) -> Result<()> {
        self.tournaments.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }

    async fn write_standings(&self, rows: &[Standing]) -> Result<()> {
        self.standings.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }

    async fn write_team_members(&self, rows: &[TeamMember]) -> Result<()> {
        self.team_members.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tournament() -> Tournament {
        Tournament {
            tournament_id: "abc123".into(),
            tournament_name: "NAIC 2024".into(),
            location: "New Orleans, US".into(),
            external_ref: Some("NA02".into()),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 7),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 9),
            logo_url: Some("https://rk9.gg/static/x.png".into()),
        }
    }

    #[tokio::test]
    async fn csv_round_trips_tournaments() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        let rows = vec![
            sample_tournament(),
            Tournament {
                external_ref: None,
                start_date: None,
                end_date: None,
                logo_url: None,
                ..sample_tournament()
            },
        ];
        sink.write_tournaments(&rows).await.unwrap();

        let read_back = sink.read_tournaments().unwrap();
        assert_eq!(read_back, rows);
    }

    #[tokio::test]
    async fn csv_file_starts_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        sink.write_tournaments(&[sample_tournament()]).await.unwrap();

        let content = fs::read_to_string(dir.path().join("tournaments.csv")).unwrap();
        let first_line = content.lines().next().unwrap();
        assert_eq!(
            first_line,
            "tournament_id,tournament_name,location,rk9_id,start_date,end_date,logo_link"
        );
    }

    #[tokio::test]
    async fn csv_round_trips_standings() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path());
        let rows = vec![Standing {
            tournament_id: "abc123".into(),
            player_id: "def456".into(),
            first_name: "Ash".into(),
            last_name: "Ketchum".into(),
            country: None,
            division: "Masters".into(),
            trainer_name: "ash_k".into(),
            team_list_ref: TEAM_LIST_SENTINEL.into(),
            rank: "12".into(),
        }];
        sink.write_standings(&rows).await.unwrap();

        let read_back = sink.read_standings().unwrap();
        assert_eq!(read_back, rows);
    }
}
