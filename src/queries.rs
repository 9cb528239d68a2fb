use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::schema::lineup_columns;
use crate::season::iso_date;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredClub {
    pub club_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlayer {
    pub player_id: i64,
    pub name: String,
    pub name_long: String,
    pub position: String,
    pub rating: i64,
    pub club_id: i64,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMatch {
    pub match_id: i64,
    pub season: String,
    pub home_club_id: i64,
    pub away_club_id: i64,
    pub score: String,
    pub lineup_id: i64,
    pub match_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLineup {
    pub lineup_id: i64,
    pub home: Vec<Option<i64>>,
    pub away: Vec<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentResult {
    pub home_club_id: i64,
    pub score: String,
    pub away_club_id: i64,
}

/// Distinct seasons, newest label first.
pub fn seasons(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT club_season FROM Clubs ORDER BY club_season DESC")
        .context("prepare seasons query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query seasons")?;
    collect_rows(rows, "decode season row")
}

pub fn clubs_in_season(conn: &Connection, season: &str) -> Result<Vec<StoredClub>> {
    let mut stmt = conn
        .prepare("SELECT clubID, club_name FROM Clubs WHERE club_season = ?1 ORDER BY clubID")
        .context("prepare clubs query")?;
    let rows = stmt
        .query_map(params![season], |row| {
            Ok(StoredClub {
                club_id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("query clubs")?;
    collect_rows(rows, "decode club row")
}

pub fn player_names_for_club(conn: &Connection, club_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT player_name FROM Players WHERE clubID = ?1 ORDER BY playerID")
        .context("prepare club players query")?;
    let rows = stmt
        .query_map(params![club_id], |row| row.get::<_, String>(0))
        .context("query club players")?;
    collect_rows(rows, "decode player name row")
}

pub fn players_by_name(conn: &Connection, name: &str, season: &str) -> Result<Vec<StoredPlayer>> {
    let mut stmt = conn
        .prepare(
            "SELECT playerID, player_name, player_name_long, player_position, player_rating,
                    clubID, player_season
             FROM Players
             WHERE player_name = ?1 AND player_season = ?2
             ORDER BY playerID",
        )
        .context("prepare player lookup")?;
    let rows = stmt
        .query_map(params![name, season], player_from_row)
        .context("query player by name")?;
    collect_rows(rows, "decode player row")
}

pub fn player(conn: &Connection, player_id: i64) -> Result<Option<StoredPlayer>> {
    conn.query_row(
        "SELECT playerID, player_name, player_name_long, player_position, player_rating,
                clubID, player_season
         FROM Players WHERE playerID = ?1",
        params![player_id],
        player_from_row,
    )
    .optional()
    .context("query player by id")
}

pub fn lineup(conn: &Connection, lineup_id: i64) -> Result<Option<StoredLineup>> {
    let columns = lineup_columns();
    let sql = format!(
        "SELECT {} FROM Lineups WHERE lineupID = ?1",
        columns.join(", ")
    );
    conn.query_row(&sql, params![lineup_id], |row| {
        let mut slots = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            slots.push(row.get::<_, Option<i64>>(idx)?);
        }
        let away = slots.split_off(columns.len() / 2);
        Ok(StoredLineup {
            lineup_id,
            home: slots,
            away,
        })
    })
    .optional()
    .context("query lineup")
}

pub fn matches(conn: &Connection) -> Result<Vec<StoredMatch>> {
    let mut stmt = conn
        .prepare(
            "SELECT matchID, match_season, home_clubID, away_clubID, score, lineupID, match_date
             FROM Matches ORDER BY matchID",
        )
        .context("prepare matches query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StoredMatch {
                match_id: row.get(0)?,
                season: row.get(1)?,
                home_club_id: row.get(2)?,
                away_club_id: row.get(3)?,
                score: row.get(4)?,
                lineup_id: row.get(5)?,
                match_date: row.get(6)?,
            })
        })
        .context("query matches")?;
    collect_rows(rows, "decode match row")
}

/// Results involving `club_id` dated from one month before `date` up to the
/// day before it.
pub fn recent_matches(conn: &Connection, club_id: i64, date: NaiveDate) -> Result<Vec<RecentResult>> {
    let mut stmt = conn
        .prepare(
            "SELECT home_clubID, score, away_clubID
             FROM Matches
             WHERE (home_clubID = ?1 OR away_clubID = ?1)
               AND match_date BETWEEN DATE(?2, '-1 month') AND DATE(?2, '-1 day')
             ORDER BY match_date, matchID",
        )
        .context("prepare recent matches query")?;
    let rows = stmt
        .query_map(params![club_id, iso_date(date)], |row| {
            Ok(RecentResult {
                home_club_id: row.get(0)?,
                score: row.get(1)?,
                away_club_id: row.get(2)?,
            })
        })
        .context("query recent matches")?;
    collect_rows(rows, "decode recent match row")
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<StoredPlayer> {
    Ok(StoredPlayer {
        player_id: row.get(0)?,
        name: row.get(1)?,
        name_long: row.get(2)?,
        position: row.get(3)?,
        rating: row.get(4)?,
        club_id: row.get(5)?,
        season: row.get(6)?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
    what: &'static str,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context(what)?);
    }
    Ok(out)
}
