use anyhow::{Context, Result};
use log::info;

use squadlink::config::IngestConfig;
use squadlink::{ingest, schema};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = IngestConfig::from_args_and_env(&args)?;

    if config.fresh && config.db_path.exists() {
        info!("removing existing store {}", config.db_path.display());
        std::fs::remove_file(&config.db_path)
            .with_context(|| format!("remove {}", config.db_path.display()))?;
    }

    let mut conn = schema::open_db(&config.db_path)?;
    let summary = ingest::ingest(&mut conn, &config)?;

    println!("Ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Run: {}", summary.run_id);
    println!(
        "Player rows: {} read, {} skipped",
        summary.player_rows_read, summary.player_rows_skipped
    );
    println!(
        "Lineup rows: {} read, {} skipped",
        summary.lineup_rows_read, summary.lineup_rows_skipped
    );
    println!("Seasons: {}", summary.seasons);
    println!(
        "Written: clubs={} players={} matches={}",
        summary.clubs_written, summary.players_written, summary.matches_written
    );
    let res = &summary.resolution;
    println!(
        "Resolution: fuzzy_clubs={} contained={} bigram={} unresolved={}",
        res.fuzzy_clubs, res.slots_contained, res.slots_bigram, res.slots_unresolved
    );
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}
