use std::path::PathBuf;

use crate::error::IngestError;
use crate::schema::default_db_path;
use crate::season::{DEFAULT_FIRST_END_YEAR, DEFAULT_LAST_END_YEAR, SeasonCalendar};

const ENV_DB_PATH: &str = "APP_DB_PATH";
const ENV_PLAYER_FILES: &str = "APP_PLAYER_FILES";
const ENV_LINEUP_FILES: &str = "APP_LINEUP_FILES";
const ENV_FIRST_END_YEAR: &str = "APP_SEASON_FIRST_END_YEAR";
const ENV_LAST_END_YEAR: &str = "APP_SEASON_LAST_END_YEAR";

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub db_path: PathBuf,
    pub player_files: Vec<PathBuf>,
    pub lineup_files: Vec<PathBuf>,
    pub calendar: SeasonCalendar,
    /// Delete an existing store before ingesting.
    pub fresh: bool,
}

impl IngestConfig {
    pub fn new(player_files: Vec<PathBuf>, lineup_files: Vec<PathBuf>) -> Self {
        Self {
            db_path: default_db_path(),
            player_files,
            lineup_files,
            calendar: SeasonCalendar::default(),
            fresh: false,
        }
    }

    /// Flags win over environment variables, which win over defaults.
    pub fn from_args_and_env(args: &[String]) -> Result<Self, IngestError> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    pub fn resolve(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, IngestError> {
        let db_path = flag_value(args, "--db")
            .or_else(|| env(ENV_DB_PATH).filter(|v| !v.trim().is_empty()))
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let player_files = flag_value(args, "--players")
            .or_else(|| env(ENV_PLAYER_FILES))
            .map(|raw| parse_path_list(&raw))
            .unwrap_or_default();
        let lineup_files = flag_value(args, "--lineups")
            .or_else(|| env(ENV_LINEUP_FILES))
            .map(|raw| parse_path_list(&raw))
            .unwrap_or_default();
        if player_files.is_empty() {
            return Err(IngestError::Config(format!(
                "no player files given (--players or {ENV_PLAYER_FILES})"
            )));
        }
        if lineup_files.is_empty() {
            return Err(IngestError::Config(format!(
                "no lineup files given (--lineups or {ENV_LINEUP_FILES})"
            )));
        }

        let first = env_year(&env, ENV_FIRST_END_YEAR)?.unwrap_or(DEFAULT_FIRST_END_YEAR);
        let last = env_year(&env, ENV_LAST_END_YEAR)?.unwrap_or(DEFAULT_LAST_END_YEAR);
        let calendar = SeasonCalendar::from_end_years(first, last)?;

        Ok(Self {
            db_path,
            player_files,
            lineup_files,
            calendar,
            fresh: args.iter().any(|a| a == "--fresh"),
        })
    }
}

/// Accepts both `--flag value` and `--flag=value`.
pub fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

pub fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn env_year(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<i32>, IngestError> {
    let Some(raw) = env(key) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|_| IngestError::Config(format!("{key} is not a year: '{raw}'")))
}
