use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params, params_from_iter};

use crate::error::IngestError;
use crate::keys::{ClubId, ClubKeys, PlayerId, PlayerRecord};
use crate::raw_reader::LINEUP_SIZE;
use crate::season::iso_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId(pub i64);

/// One match with everything that must land in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchUnit {
    pub id: MatchId,
    pub season: String,
    pub home_club: ClubId,
    pub away_club: ClubId,
    pub score: String,
    pub date: NaiveDate,
    pub home_players: Vec<Option<PlayerId>>,
    pub away_players: Vec<Option<PlayerId>>,
}

pub fn default_db_path() -> PathBuf {
    PathBuf::from("squadlink.sqlite")
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn lineup_columns() -> Vec<String> {
    let home = (1..=LINEUP_SIZE).map(|n| format!("playerID_H{n}"));
    let away = (1..=LINEUP_SIZE).map(|n| format!("playerID_A{n}"));
    home.chain(away).collect()
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS Clubs (
            clubID INTEGER PRIMARY KEY,
            club_name TEXT NOT NULL,
            club_season TEXT NOT NULL,
            UNIQUE (club_season, club_name)
        );
        CREATE INDEX IF NOT EXISTS idx_clubs_season ON Clubs(club_season);

        CREATE TABLE IF NOT EXISTS Players (
            playerID INTEGER PRIMARY KEY,
            player_name TEXT NOT NULL,
            player_name_long TEXT NOT NULL,
            player_position TEXT NOT NULL,
            player_rating INTEGER NOT NULL,
            clubID INTEGER NOT NULL REFERENCES Clubs(clubID),
            player_season TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_players_club ON Players(clubID);
        CREATE INDEX IF NOT EXISTS idx_players_name_season ON Players(player_name, player_season);

        CREATE TABLE IF NOT EXISTS Matches (
            matchID INTEGER PRIMARY KEY,
            match_season TEXT NOT NULL,
            home_clubID INTEGER NOT NULL REFERENCES Clubs(clubID),
            away_clubID INTEGER NOT NULL REFERENCES Clubs(clubID),
            score TEXT NOT NULL,
            lineupID INTEGER NOT NULL
                REFERENCES Lineups(lineupID) DEFERRABLE INITIALLY DEFERRED,
            match_date TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_date ON Matches(match_date);

        CREATE TABLE IF NOT EXISTS ClubMatch (
            clubID INTEGER NOT NULL REFERENCES Clubs(clubID),
            matchID INTEGER NOT NULL REFERENCES Matches(matchID)
        );
        CREATE INDEX IF NOT EXISTS idx_club_match_club ON ClubMatch(clubID);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            player_files_json TEXT NOT NULL,
            lineup_files_json TEXT NOT NULL,
            clubs_written INTEGER NOT NULL,
            players_written INTEGER NOT NULL,
            matches_written INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;

    let slots = lineup_columns()
        .iter()
        .map(|col| format!("{col} INTEGER NULL REFERENCES Players(playerID)"))
        .collect::<Vec<_>>()
        .join(",\n            ");
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS Lineups (
            lineupID INTEGER PRIMARY KEY,
            {slots}
        );"
    ))
    .context("create lineups table")?;
    Ok(())
}

/// Append-only store: a second ingestion into the same file is refused.
pub fn ensure_empty(conn: &Connection, path: &Path) -> Result<()> {
    let rows: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM Clubs) + (SELECT COUNT(*) FROM Matches)",
            [],
            |row| row.get(0),
        )
        .context("count existing rows")?;
    if rows > 0 {
        return Err(IngestError::StoreNotEmpty(path.to_path_buf()).into());
    }
    Ok(())
}

pub fn insert_clubs(conn: &mut Connection, clubs: &ClubKeys) -> Result<usize> {
    let tx = conn.transaction().context("begin clubs transaction")?;
    {
        let mut stmt = tx
            .prepare("INSERT INTO Clubs(clubID, club_name, club_season) VALUES (?1, ?2, ?3)")
            .context("prepare club insert")?;
        for entry in clubs.entries() {
            stmt.execute(params![entry.id.0, entry.key.club, entry.key.season])
                .with_context(|| format!("insert club {}", entry.key.club))?;
        }
    }
    tx.commit().context("commit clubs transaction")?;
    Ok(clubs.len())
}

pub fn insert_players(conn: &mut Connection, players: &[PlayerRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin players transaction")?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO Players(playerID, player_name, player_name_long, player_position,
                                     player_rating, clubID, player_season)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .context("prepare player insert")?;
        for p in players {
            stmt.execute(params![
                p.id.0,
                p.short_name,
                p.long_name,
                p.position,
                p.rating,
                p.club_id.0,
                p.season,
            ])
            .with_context(|| format!("insert player {}", p.short_name))?;
        }
    }
    tx.commit().context("commit players transaction")?;
    Ok(players.len())
}

/// Writes the match, its two club links and its lineup atomically.
pub fn insert_match_unit(conn: &mut Connection, unit: &MatchUnit) -> Result<()> {
    if unit.home_players.len() != LINEUP_SIZE || unit.away_players.len() != LINEUP_SIZE {
        return Err(anyhow!(
            "match {} has {}+{} lineup slots, expected {LINEUP_SIZE} per side",
            unit.id.0,
            unit.home_players.len(),
            unit.away_players.len()
        ));
    }

    let tx = conn.transaction().context("begin match transaction")?;
    tx.execute(
        "INSERT INTO Matches(matchID, match_season, home_clubID, away_clubID, score, lineupID, match_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            unit.id.0,
            unit.season,
            unit.home_club.0,
            unit.away_club.0,
            unit.score,
            unit.id.0,
            iso_date(unit.date),
        ],
    )
    .with_context(|| format!("insert match {}", unit.id.0))?;

    for club in [unit.home_club, unit.away_club] {
        tx.execute(
            "INSERT INTO ClubMatch(clubID, matchID) VALUES (?1, ?2)",
            params![club.0, unit.id.0],
        )
        .with_context(|| format!("insert club link {} -> {}", club.0, unit.id.0))?;
    }

    let columns = lineup_columns();
    let placeholders = (1..=columns.len() + 1)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO Lineups(lineupID, {}) VALUES ({placeholders})",
        columns.join(", ")
    );
    let values = std::iter::once(Some(unit.id.0)).chain(
        unit.home_players
            .iter()
            .chain(unit.away_players.iter())
            .map(|slot| slot.map(|p| p.0)),
    );
    tx.execute(&sql, params_from_iter(values))
        .with_context(|| format!("insert lineup {}", unit.id.0))?;

    tx.commit()
        .with_context(|| format!("commit match {}", unit.id.0))?;
    Ok(())
}

pub fn begin_run(conn: &Connection, player_files: &[PathBuf], lineup_files: &[PathBuf]) -> Result<i64> {
    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, player_files_json, lineup_files_json,
                                 clubs_written, players_written, matches_written, errors_json)
         VALUES (?1, NULL, ?2, ?3, 0, 0, 0, '[]')",
        params![started_at, paths_json(player_files), paths_json(lineup_files)],
    )
    .context("insert ingest run")?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_run(
    conn: &Connection,
    run_id: i64,
    clubs_written: usize,
    players_written: usize,
    matches_written: usize,
    errors: &[String],
) -> Result<()> {
    let finished_at = Utc::now().to_rfc3339();
    let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, clubs_written = ?2, players_written = ?3,
             matches_written = ?4, errors_json = ?5
         WHERE run_id = ?6",
        params![
            finished_at,
            clubs_written as i64,
            players_written as i64,
            matches_written as i64,
            errors_json,
            run_id
        ],
    )
    .context("update ingest run")?;
    Ok(())
}

fn paths_json(paths: &[PathBuf]) -> String {
    let names = paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>();
    serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SeasonPartition;
    use crate::raw_reader::PlayerRow;

    fn seeded() -> (Connection, ClubKeys) {
        let rows = vec![
            PlayerRow {
                short_name: "H. Kane".to_string(),
                long_name: "Harry Kane".to_string(),
                position: "ST".to_string(),
                rating: 89,
                club: "Tottenham Hotspur".to_string(),
                season: "2017/2018".to_string(),
            },
            PlayerRow {
                short_name: "M. Salah".to_string(),
                long_name: "Mohamed Salah".to_string(),
                position: "RW".to_string(),
                rating: 88,
                club: "Liverpool".to_string(),
                season: "2017/2018".to_string(),
            },
        ];
        let clubs = ClubKeys::assign(&SeasonPartition::from_rows(&rows));
        let players = crate::keys::PlayerKeys::assign(&rows, &clubs);
        let mut conn = open_in_memory().unwrap();
        insert_clubs(&mut conn, &clubs).unwrap();
        insert_players(&mut conn, &players.players).unwrap();
        (conn, clubs)
    }

    fn unit(id: i64, home_first: Option<PlayerId>) -> MatchUnit {
        let mut home_players = vec![None; LINEUP_SIZE];
        home_players[0] = home_first;
        MatchUnit {
            id: MatchId(id),
            season: "2017/2018".to_string(),
            home_club: ClubId(1),
            away_club: ClubId(2),
            score: "2-2".to_string(),
            date: NaiveDate::from_ymd_opt(2018, 2, 4).unwrap(),
            home_players,
            away_players: vec![None; LINEUP_SIZE],
        }
    }

    #[test]
    fn lineup_columns_cover_both_sides() {
        let cols = lineup_columns();
        assert_eq!(cols.len(), 22);
        assert_eq!(cols[0], "playerID_H1");
        assert_eq!(cols[21], "playerID_A11");
    }

    #[test]
    fn match_unit_writes_all_rows() {
        let (mut conn, _) = seeded();
        insert_match_unit(&mut conn, &unit(1, Some(PlayerId(1)))).unwrap();
        let links = conn
            .prepare("SELECT clubID FROM ClubMatch WHERE matchID = 1 ORDER BY rowid")
            .unwrap()
            .query_map([], |r| r.get::<_, i64>(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        let sides: (i64, i64) = conn
            .query_row(
                "SELECT home_clubID, away_clubID FROM Matches WHERE matchID = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(sides, (1, 2));
        assert_eq!(links, vec![sides.0, sides.1]);
        let (h1, a1): (Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT playerID_H1, playerID_A1 FROM Lineups WHERE lineupID = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(h1, Some(1));
        assert_eq!(a1, None);
        let date: String = conn
            .query_row("SELECT match_date FROM Matches WHERE matchID = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(date, "2018-02-04");
    }

    #[test]
    fn failed_unit_leaves_nothing_behind() {
        let (mut conn, _) = seeded();
        // Unknown player key violates the lineup foreign key.
        let err = insert_match_unit(&mut conn, &unit(1, Some(PlayerId(99))));
        assert!(err.is_err());
        for table in ["Matches", "ClubMatch", "Lineups"] {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap();
            assert_eq!(n, 0, "{table} should be empty");
        }
    }

    #[test]
    fn store_with_rows_is_not_empty() {
        let (conn, _) = seeded();
        let err = ensure_empty(&conn, Path::new("x.sqlite")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::StoreNotEmpty(_))
        ));
        let fresh = open_in_memory().unwrap();
        assert!(ensure_empty(&fresh, Path::new("y.sqlite")).is_ok());
    }
}
