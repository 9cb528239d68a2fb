use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::{info, warn};

use crate::error::IngestError;
use crate::season::parse_match_date;

pub const LINEUP_SIZE: usize = 11;

const PLAYER_FIELDS: usize = 6;
const LINEUP_FIELDS: usize = 4 + 2 * LINEUP_SIZE;
const MAX_RATING: u8 = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub short_name: String,
    pub long_name: String,
    pub position: String,
    pub rating: u8,
    pub club: String,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupRow {
    pub home_club: String,
    pub away_club: String,
    pub score: String,
    pub date: NaiveDate,
    pub home: Vec<String>,
    pub away: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReadStats {
    pub rows_total: usize,
    pub rows_parsed: usize,
    pub rows_skipped: usize,
    pub errors: Vec<String>,
}

impl ReadStats {
    fn skip(&mut self, path: &Path, line: u64, reason: String) {
        warn!("{}:{line}: skipping row: {reason}", path.display());
        self.rows_skipped += 1;
        self.errors.push(format!("{}:{line}: {reason}", path.display()));
    }

    fn merge(&mut self, other: ReadStats) {
        self.rows_total += other.rows_total;
        self.rows_parsed += other.rows_parsed;
        self.rows_skipped += other.rows_skipped;
        self.errors.extend(other.errors);
    }
}

pub fn read_player_files(
    paths: &[impl AsRef<Path>],
) -> Result<(Vec<PlayerRow>, ReadStats), IngestError> {
    let mut rows = Vec::new();
    let mut stats = ReadStats::default();
    for path in paths {
        let (mut file_rows, file_stats) = read_player_file(path.as_ref())?;
        rows.append(&mut file_rows);
        stats.merge(file_stats);
    }
    Ok((rows, stats))
}

pub fn read_lineup_files(
    paths: &[impl AsRef<Path>],
) -> Result<(Vec<LineupRow>, ReadStats), IngestError> {
    let mut rows = Vec::new();
    let mut stats = ReadStats::default();
    for path in paths {
        let (mut file_rows, file_stats) = read_lineup_file(path.as_ref())?;
        rows.append(&mut file_rows);
        stats.merge(file_stats);
    }
    Ok((rows, stats))
}

pub fn read_player_file(path: &Path) -> Result<(Vec<PlayerRow>, ReadStats), IngestError> {
    let text = read_source_text(path)?;
    let (rows, stats) = parse_rows(path, &text, parse_player_record);
    info!(
        "{}: {} player rows parsed, {} skipped",
        path.display(),
        stats.rows_parsed,
        stats.rows_skipped
    );
    Ok((rows, stats))
}

pub fn read_lineup_file(path: &Path) -> Result<(Vec<LineupRow>, ReadStats), IngestError> {
    let text = read_source_text(path)?;
    let (rows, stats) = parse_rows(path, &text, parse_lineup_record);
    info!(
        "{}: {} lineup rows parsed, {} skipped",
        path.display(),
        stats.rows_parsed,
        stats.rows_skipped
    );
    Ok((rows, stats))
}

/// Reads a source file, decoding UTF-16 when a byte-order mark (or a NUL
/// byte pattern in the first code unit) says so and UTF-8 otherwise.
/// Undecodable sequences become U+FFFD; rows holding one are skipped later.
pub fn read_source_text(path: &Path) -> Result<String, IngestError> {
    if !path.is_file() {
        return Err(IngestError::MissingInput(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    let text = decode_text(&bytes);
    if text.contains(char::REPLACEMENT_CHARACTER) {
        warn!(
            "{}: contains undecodable text; affected rows will be skipped",
            path.display()
        );
    }
    Ok(text)
}

pub fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        // BOM-less UTF-16: ASCII text leaves a NUL in every other byte.
        [lo, 0, ..] if *lo != 0 => {
            warn!("input has no byte-order mark but looks like utf-16le");
            decode_utf16(bytes, u16::from_le_bytes)
        }
        [0, hi, ..] if *hi != 0 => {
            warn!("input has no byte-order mark but looks like utf-16be");
            decode_utf16(bytes, u16::from_be_bytes)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let pairs = bytes.chunks_exact(2);
    let dangling = !pairs.remainder().is_empty();
    let mut text = char::decode_utf16(pairs.map(|pair| unit([pair[0], pair[1]])))
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect::<String>();
    if dangling {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn parse_rows<T>(
    path: &Path,
    text: &str,
    parse: fn(&csv::StringRecord) -> Result<T, String>,
) -> (Vec<T>, ReadStats) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut stats = ReadStats::default();
    for result in reader.records() {
        stats.rows_total += 1;
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or(0);
                stats.skip(path, line, err.to_string());
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            stats.rows_total -= 1;
            continue;
        }
        if record
            .iter()
            .any(|field| field.contains(char::REPLACEMENT_CHARACTER))
        {
            stats.skip(path, line, "undecodable text in row".to_string());
            continue;
        }
        match parse(&record) {
            Ok(row) => {
                rows.push(row);
                stats.rows_parsed += 1;
            }
            Err(reason) => stats.skip(path, line, reason),
        }
    }
    (rows, stats)
}

fn parse_player_record(record: &csv::StringRecord) -> Result<PlayerRow, String> {
    if record.len() != PLAYER_FIELDS {
        return Err(format!(
            "expected {PLAYER_FIELDS} player fields, found {}",
            record.len()
        ));
    }
    let rating = record[3]
        .parse::<u8>()
        .ok()
        .filter(|r| *r <= MAX_RATING)
        .ok_or_else(|| format!("invalid rating '{}'", &record[3]))?;
    let club = record[4].to_string();
    let season = record[5].to_string();
    if club.is_empty() || season.is_empty() {
        return Err("missing club or season".to_string());
    }
    Ok(PlayerRow {
        short_name: record[0].to_string(),
        long_name: record[1].to_string(),
        position: record[2].to_string(),
        rating,
        club,
        season,
    })
}

fn parse_lineup_record(record: &csv::StringRecord) -> Result<LineupRow, String> {
    if record.len() < LINEUP_FIELDS {
        return Err(format!(
            "expected {LINEUP_FIELDS} lineup fields, found {}",
            record.len()
        ));
    }
    let home_club = record[0].to_string();
    let away_club = record[1].to_string();
    if home_club.is_empty() || away_club.is_empty() {
        return Err("missing club name".to_string());
    }
    let date =
        parse_match_date(&record[3]).ok_or_else(|| format!("invalid date '{}'", &record[3]))?;
    let mut home = record
        .iter()
        .skip(4)
        .take(2 * LINEUP_SIZE)
        .map(str::to_string)
        .collect::<Vec<_>>();
    let away = home.split_off(LINEUP_SIZE);
    Ok(LineupRow {
        home_club,
        away_club,
        score: record[2].to_string(),
        date,
        home,
        away,
    })
}
