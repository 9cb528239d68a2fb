use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

use crate::club_resolver::{ClubMatchKind, resolve_club};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::keys::{ClubKeys, PlayerKeys, SeasonPartition};
use crate::lineup_resolver::{SlotResolution, resolve_lineup};
use crate::raw_reader::{LineupRow, read_lineup_files, read_player_files};
use crate::schema::{self, MatchId, MatchUnit};
use crate::season::SeasonCalendar;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub fuzzy_clubs: usize,
    pub slots_contained: usize,
    pub slots_bigram: usize,
    pub slots_unresolved: usize,
}

#[derive(Debug, Clone)]
pub struct MatchPlan {
    pub units: Vec<MatchUnit>,
    pub stats: ResolutionStats,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub run_id: i64,
    pub player_rows_read: usize,
    pub player_rows_skipped: usize,
    pub lineup_rows_read: usize,
    pub lineup_rows_skipped: usize,
    pub seasons: usize,
    pub clubs_written: usize,
    pub players_written: usize,
    pub matches_written: usize,
    pub resolution: ResolutionStats,
    pub errors: Vec<String>,
}

/// Resolves every lineup row against the keyed clubs and rosters. Match keys
/// run from 1 in row order. Nothing is written here, so a fatal error leaves
/// the store untouched.
pub fn plan_matches(
    rows: &[LineupRow],
    clubs: &ClubKeys,
    players: &PlayerKeys,
    calendar: &SeasonCalendar,
) -> Result<MatchPlan, IngestError> {
    let mut units = Vec::with_capacity(rows.len());
    let mut stats = ResolutionStats::default();

    for (idx, row) in rows.iter().enumerate() {
        let season = calendar.season_for(row.date)?;
        let home = resolve_club(clubs, season, &row.home_club)?;
        let away = resolve_club(clubs, season, &row.away_club)?;
        for club in [&home, &away] {
            if matches!(club.kind, ClubMatchKind::Fuzzy { .. }) {
                stats.fuzzy_clubs += 1;
            }
        }

        let lineup = resolve_lineup(
            &row.home,
            players.roster(season, home.name),
            &row.away,
            players.roster(season, away.name),
        );
        for slot in lineup.slots() {
            match slot.how {
                SlotResolution::Contained => stats.slots_contained += 1,
                SlotResolution::Bigram { .. } => stats.slots_bigram += 1,
                SlotResolution::Unresolved => stats.slots_unresolved += 1,
            }
        }

        let id = MatchId(idx as i64 + 1);
        debug!(
            "match {}: {} v {} on {} ({season})",
            id.0, home.name, away.name, row.date
        );
        units.push(MatchUnit {
            id,
            season: season.to_string(),
            home_club: home.id,
            away_club: away.id,
            score: row.score.clone(),
            date: row.date,
            home_players: lineup.home_ids(),
            away_players: lineup.away_ids(),
        });
    }

    Ok(MatchPlan { units, stats })
}

/// Runs one ingestion pass: read both sources, key clubs and players, plan
/// every match, then write clubs, players and one transaction per match.
pub fn ingest(conn: &mut Connection, config: &IngestConfig) -> Result<IngestSummary> {
    schema::ensure_empty(conn, &config.db_path)?;

    let (player_rows, player_stats) = read_player_files(&config.player_files)?;
    let (lineup_rows, lineup_stats) = read_lineup_files(&config.lineup_files)?;

    let partition = SeasonPartition::from_rows(&player_rows);
    let clubs = ClubKeys::assign(&partition);
    let players = PlayerKeys::assign(&player_rows, &clubs);
    info!(
        "keyed {} clubs over {} seasons and {} players",
        clubs.len(),
        partition.buckets().len(),
        players.players.len()
    );

    let plan = plan_matches(&lineup_rows, &clubs, &players, &config.calendar)?;
    info!(
        "planned {} matches: {} fuzzy club names, {} slots by containment, {} by bigrams, {} unresolved",
        plan.units.len(),
        plan.stats.fuzzy_clubs,
        plan.stats.slots_contained,
        plan.stats.slots_bigram,
        plan.stats.slots_unresolved
    );

    let mut errors = player_stats.errors.clone();
    errors.extend(lineup_stats.errors.iter().cloned());

    let run_id = schema::begin_run(conn, &config.player_files, &config.lineup_files)?;
    let clubs_written = schema::insert_clubs(conn, &clubs)?;
    let players_written = schema::insert_players(conn, &players.players)?;
    let mut matches_written = 0usize;
    for unit in &plan.units {
        schema::insert_match_unit(conn, unit)
            .with_context(|| format!("write match {} on {}", unit.id.0, unit.date))?;
        matches_written += 1;
    }
    schema::finish_run(
        conn,
        run_id,
        clubs_written,
        players_written,
        matches_written,
        &errors,
    )?;
    info!("wrote {clubs_written} clubs, {players_written} players, {matches_written} matches");

    Ok(IngestSummary {
        db_path: config.db_path.clone(),
        run_id,
        player_rows_read: player_stats.rows_parsed,
        player_rows_skipped: player_stats.rows_skipped,
        lineup_rows_read: lineup_stats.rows_parsed,
        lineup_rows_skipped: lineup_stats.rows_skipped,
        seasons: partition.buckets().len(),
        clubs_written,
        players_written,
        matches_written,
        resolution: plan.stats,
        errors,
    })
}
