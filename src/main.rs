use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::error;

use vgc_scraper::config::Config;
use vgc_scraper::error::Result;
use vgc_scraper::fetch::HttpFetcher;
use vgc_scraper::logging;
use vgc_scraper::pipeline::{Pipeline, StageSummary};
use vgc_scraper::sink::CsvSink;

#[derive(Parser)]
#[command(name = "vgc_scraper")]
#[command(about = "Competitive Pokémon VGC tournament data scraper")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory the CSV tables are written to (and re-read from for
    /// staged runs)
    #[arg(long, default_value = "datasets")]
    out_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the events listing into tournaments.csv
    Tournaments,
    /// Crawl roster pages for the tournaments in tournaments.csv
    Standings,
    /// Crawl team pages for the standings in standings.csv
    Teams,
    /// Run all three stages in order
    Run,
}

fn print_summary(stage: &str, summary: &StageSummary) {
    println!("\n📊 {} stage:", stage);
    println!("   Pages fetched: {}", summary.pages_fetched);
    println!("   Records: {}", summary.records);
    println!("   Units skipped: {}", summary.units_skipped);
    println!("   Failed fetches: {}", summary.fetches_failed);
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let fetcher = Arc::new(HttpFetcher::new(&config.crawl)?);
    let sink = Arc::new(CsvSink::new(&cli.out_dir));
    let pipeline = Pipeline::new(config, fetcher, sink.clone());

    match cli.command {
        Commands::Tournaments => {
            println!("🔄 Crawling events listing...");
            let (_, summary) = pipeline.crawl_tournaments().await?;
            print_summary("Tournaments", &summary);
        }
        Commands::Standings => {
            println!("🔄 Crawling roster pages...");
            let tournaments = sink.read_tournaments()?;
            let (_, summary) = pipeline.crawl_standings(&tournaments).await?;
            print_summary("Standings", &summary);
        }
        Commands::Teams => {
            println!("🔄 Crawling team pages...");
            let standings = sink.read_standings()?;
            let (_, summary) = pipeline.crawl_teams(&standings).await?;
            print_summary("Teams", &summary);
        }
        Commands::Run => {
            println!("🔄 Running full crawl...");
            let summary = pipeline.run_all().await?;
            print_summary("Tournaments", &summary.tournaments);
            print_summary("Standings", &summary.standings);
            print_summary("Teams", &summary.teams);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("crawl failed: {e}");
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
