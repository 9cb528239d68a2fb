use std::io::Write;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::IngestError;
use crate::queries::{self, StoredMatch, StoredPlayer};

const DEFENCE: &[&str] = &["GK", "RB", "RWB", "CB", "LB", "LWB"];
const MIDFIELD: &[&str] = &["CDM", "LM", "CM", "RM", "CAM"];
const FORWARD: &[&str] = &["LW", "CF", "RW", "ST"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionGroup {
    Defence,
    Midfield,
    Forward,
}

pub fn position_group(code: &str) -> Option<PositionGroup> {
    let code = code.trim();
    if DEFENCE.contains(&code) {
        Some(PositionGroup::Defence)
    } else if MIDFIELD.contains(&code) {
        Some(PositionGroup::Midfield)
    } else if FORWARD.contains(&code) {
        Some(PositionGroup::Forward)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Draw = 0,
    HomeWin = 1,
    AwayWin = 2,
}

impl Outcome {
    pub fn from_score(score: &str) -> Option<Self> {
        let (home, away) = parse_score_pair(score)?;
        Some(match home.cmp(&away) {
            std::cmp::Ordering::Equal => Self::Draw,
            std::cmp::Ordering::Greater => Self::HomeWin,
            std::cmp::Ordering::Less => Self::AwayWin,
        })
    }

    pub fn class(self) -> u8 {
        self as u8
    }
}

/// Mean ratings over the lineup and its position groups; an empty group is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamRatings {
    pub overall: f64,
    pub defence: f64,
    pub midfield: f64,
    pub forward: f64,
}

impl TeamRatings {
    pub fn from_players(players: &[StoredPlayer]) -> Self {
        let group_mean = |group: PositionGroup| {
            mean(
                players
                    .iter()
                    .filter(|p| position_group(&p.position) == Some(group))
                    .map(|p| p.rating as f64),
            )
        };
        Self {
            overall: mean(players.iter().map(|p| p.rating as f64)),
            defence: group_mean(PositionGroup::Defence),
            midfield: group_mean(PositionGroup::Midfield),
            forward: group_mean(PositionGroup::Forward),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchFeatures {
    pub match_id: i64,
    pub match_date: String,
    pub home: TeamRatings,
    pub home_form: f64,
    pub away: TeamRatings,
    pub away_form: f64,
    pub outcome: Option<Outcome>,
}

impl MatchFeatures {
    pub fn to_vector(&self) -> [f64; 10] {
        [
            self.home.overall,
            self.home.defence,
            self.home.midfield,
            self.home.forward,
            self.home_form,
            self.away.overall,
            self.away.defence,
            self.away.midfield,
            self.away.forward,
            self.away_form,
        ]
    }
}

/// Points per game over the month before `date`: 3 for a win, 1 for a draw.
pub fn recent_form(conn: &Connection, club_id: i64, date: NaiveDate) -> Result<f64> {
    let recent = queries::recent_matches(conn, club_id, date)?;
    if recent.is_empty() {
        return Ok(0.0);
    }
    let mut points = 0.0;
    for m in &recent {
        points += match Outcome::from_score(&m.score) {
            Some(Outcome::Draw) => 1.0,
            Some(Outcome::HomeWin) if m.home_club_id == club_id => 3.0,
            Some(Outcome::AwayWin) if m.away_club_id == club_id => 3.0,
            _ => 0.0,
        };
    }
    Ok(points / recent.len() as f64)
}

pub fn match_features(conn: &Connection, m: &StoredMatch) -> Result<MatchFeatures> {
    let date = NaiveDate::parse_from_str(&m.match_date, "%Y-%m-%d")
        .with_context(|| format!("match {} has bad date {}", m.match_id, m.match_date))?;
    let lineup = queries::lineup(conn, m.lineup_id)?
        .ok_or_else(|| anyhow!("match {} has no lineup {}", m.match_id, m.lineup_id))?;

    let home_players = load_players(conn, &lineup.home)?;
    let away_players = load_players(conn, &lineup.away)?;

    Ok(MatchFeatures {
        match_id: m.match_id,
        match_date: m.match_date.clone(),
        home: TeamRatings::from_players(&home_players),
        home_form: recent_form(conn, m.home_club_id, date)?,
        away: TeamRatings::from_players(&away_players),
        away_form: recent_form(conn, m.away_club_id, date)?,
        outcome: Outcome::from_score(&m.score),
    })
}

pub fn all_match_features(conn: &Connection) -> Result<Vec<MatchFeatures>> {
    let stored = queries::matches(conn)?;
    let mut out = Vec::with_capacity(stored.len());
    for m in &stored {
        out.push(match_features(conn, m)?);
    }
    Ok(out)
}

/// Flat CSV record: both sides' ratings and form, then the outcome class.
#[derive(Debug, Serialize)]
struct FeatureRecord<'a> {
    match_id: i64,
    match_date: &'a str,
    home_overall: f64,
    home_defence: f64,
    home_midfield: f64,
    home_forward: f64,
    home_form: f64,
    away_overall: f64,
    away_defence: f64,
    away_midfield: f64,
    away_forward: f64,
    away_form: f64,
    outcome: Option<u8>,
}

impl<'a> From<&'a MatchFeatures> for FeatureRecord<'a> {
    fn from(f: &'a MatchFeatures) -> Self {
        Self {
            match_id: f.match_id,
            match_date: &f.match_date,
            home_overall: f.home.overall,
            home_defence: f.home.defence,
            home_midfield: f.home.midfield,
            home_forward: f.home.forward,
            home_form: f.home_form,
            away_overall: f.away.overall,
            away_defence: f.away.defence,
            away_midfield: f.away.midfield,
            away_forward: f.away.forward,
            away_form: f.away_form,
            outcome: f.outcome.map(Outcome::class),
        }
    }
}

pub fn write_csv<W: Write>(features: &[MatchFeatures], out: W) -> Result<usize, IngestError> {
    let mut writer = csv::Writer::from_writer(out);
    for f in features {
        writer.serialize(FeatureRecord::from(f))?;
    }
    writer.flush()?;
    Ok(features.len())
}

fn load_players(conn: &Connection, slots: &[Option<i64>]) -> Result<Vec<StoredPlayer>> {
    let mut out = Vec::new();
    for id in slots.iter().flatten() {
        if let Some(p) = queries::player(conn, *id)? {
            out.push(p);
        }
    }
    Ok(out)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn parse_score_pair(raw: &str) -> Option<(u32, u32)> {
    let mut nums = raw
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok());
    let home = nums.next()?;
    let away = nums.next()?;
    Some((home, away))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(position: &str, rating: i64) -> StoredPlayer {
        StoredPlayer {
            player_id: 1,
            name: "X".to_string(),
            name_long: "X Y".to_string(),
            position: position.to_string(),
            rating,
            club_id: 1,
            season: "2017/2018".to_string(),
        }
    }

    #[test]
    fn outcome_from_score() {
        assert_eq!(Outcome::from_score("2-1"), Some(Outcome::HomeWin));
        assert_eq!(Outcome::from_score("0 - 0"), Some(Outcome::Draw));
        assert_eq!(Outcome::from_score("1-3"), Some(Outcome::AwayWin));
        assert_eq!(Outcome::from_score("postponed"), None);
        assert_eq!(Outcome::AwayWin.class(), 2);
    }

    #[test]
    fn ratings_group_by_position() {
        let players = vec![
            player("GK", 80),
            player("CB", 70),
            player("CM", 75),
            player("ST", 90),
            player("ST", 84),
        ];
        let r = TeamRatings::from_players(&players);
        assert!((r.overall - 79.8).abs() < 1e-9);
        assert!((r.defence - 75.0).abs() < 1e-9);
        assert!((r.midfield - 75.0).abs() < 1e-9);
        assert!((r.forward - 87.0).abs() < 1e-9);
    }

    #[test]
    fn empty_groups_average_to_zero() {
        let r = TeamRatings::from_players(&[player("GK", 60)]);
        assert_eq!(r.midfield, 0.0);
        assert_eq!(r.forward, 0.0);
        assert_eq!(TeamRatings::from_players(&[]), TeamRatings::default());
    }

    #[test]
    fn csv_has_header_and_flat_rows() {
        let f = MatchFeatures {
            match_id: 7,
            match_date: "2018-05-12".to_string(),
            home: TeamRatings::from_players(&[player("ST", 90)]),
            home_form: 3.0,
            away: TeamRatings::default(),
            away_form: 0.5,
            outcome: Some(Outcome::HomeWin),
        };
        assert_eq!(f.to_vector()[3], 90.0);
        assert_eq!(f.to_vector()[9], 0.5);

        let mut buf = Vec::new();
        assert_eq!(write_csv(&[f], &mut buf).unwrap(), 1);
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("match_id,match_date,home_overall"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,2018-05-12,90.0,"));
        assert!(row.ends_with(",0.5,1"));
    }
}
