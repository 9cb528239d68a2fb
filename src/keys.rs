use std::collections::HashMap;

use crate::raw_reader::PlayerRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClubId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub i64);

/// Clubs are season-scoped: the same name in two seasons is two clubs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeasonClub {
    pub season: String,
    pub club: String,
}

impl SeasonClub {
    pub fn new(season: impl Into<String>, club: impl Into<String>) -> Self {
        Self {
            season: season.into(),
            club: club.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonBucket {
    pub season: String,
    pub clubs: Vec<String>,
}

/// Distinct club names per season, both levels in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonPartition {
    buckets: Vec<SeasonBucket>,
}

impl SeasonPartition {
    pub fn from_rows(rows: &[PlayerRow]) -> Self {
        let mut buckets: Vec<SeasonBucket> = Vec::new();
        let mut by_season: HashMap<&str, usize> = HashMap::new();
        for row in rows {
            let idx = *by_season.entry(row.season.as_str()).or_insert_with(|| {
                buckets.push(SeasonBucket {
                    season: row.season.clone(),
                    clubs: Vec::new(),
                });
                buckets.len() - 1
            });
            let bucket = &mut buckets[idx];
            if !bucket.clubs.iter().any(|c| c == &row.club) {
                bucket.clubs.push(row.club.clone());
            }
        }
        Self { buckets }
    }

    pub fn buckets(&self) -> &[SeasonBucket] {
        &self.buckets
    }

    pub fn club_count(&self) -> usize {
        self.buckets.iter().map(|b| b.clubs.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClubEntry {
    pub key: SeasonClub,
    pub id: ClubId,
}

/// (season, club) → surrogate key, iterable in assignment order.
#[derive(Debug, Clone, Default)]
pub struct ClubKeys {
    entries: Vec<ClubEntry>,
    lookup: HashMap<SeasonClub, usize>,
}

impl ClubKeys {
    pub fn assign(partition: &SeasonPartition) -> Self {
        let mut keys = Self::default();
        let mut next = 1i64;
        for bucket in partition.buckets() {
            for club in &bucket.clubs {
                let key = SeasonClub::new(bucket.season.as_str(), club.as_str());
                keys.lookup.insert(key.clone(), keys.entries.len());
                keys.entries.push(ClubEntry {
                    key,
                    id: ClubId(next),
                });
                next += 1;
            }
        }
        keys
    }

    pub fn get(&self, season: &str, club: &str) -> Option<ClubId> {
        self.entry(season, club).map(|e| e.id)
    }

    pub fn entry(&self, season: &str, club: &str) -> Option<&ClubEntry> {
        let idx = *self.lookup.get(&SeasonClub::new(season, club))?;
        self.entries.get(idx)
    }

    pub fn entries(&self) -> &[ClubEntry] {
        &self.entries
    }

    pub fn in_season<'a>(&'a self, season: &str) -> impl Iterator<Item = &'a ClubEntry> {
        self.entries.iter().filter(move |e| e.key.season == season)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A known player as seen by the lineup resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub short_name: String,
    pub long_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub short_name: String,
    pub long_name: String,
    pub position: String,
    pub rating: u8,
    pub club_id: ClubId,
    pub season: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerKeys {
    pub players: Vec<PlayerRecord>,
    /// Roster candidates per (season, club), in player key order.
    pub name_index: HashMap<SeasonClub, Vec<RosterEntry>>,
}

impl PlayerKeys {
    /// Keys players in row order starting at 1. Rows whose club was not keyed
    /// are dropped; this cannot happen when `clubs` was built from the same rows.
    pub fn assign(rows: &[PlayerRow], clubs: &ClubKeys) -> Self {
        let mut keys = Self::default();
        let mut next = 1i64;
        for row in rows {
            let Some(club_id) = clubs.get(&row.season, &row.club) else {
                log::warn!(
                    "player {} references unkeyed club {} ({})",
                    row.short_name,
                    row.club,
                    row.season
                );
                continue;
            };
            let id = PlayerId(next);
            next += 1;
            keys.players.push(PlayerRecord {
                id,
                short_name: row.short_name.clone(),
                long_name: row.long_name.clone(),
                position: row.position.clone(),
                rating: row.rating,
                club_id,
                season: row.season.clone(),
            });
            keys.name_index
                .entry(SeasonClub::new(row.season.as_str(), row.club.as_str()))
                .or_default()
                .push(RosterEntry {
                    id,
                    short_name: row.short_name.clone(),
                    long_name: row.long_name.clone(),
                });
        }
        keys
    }

    pub fn roster(&self, season: &str, club: &str) -> &[RosterEntry] {
        self.name_index
            .get(&SeasonClub::new(season, club))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(short: &str, club: &str, season: &str) -> PlayerRow {
        PlayerRow {
            short_name: short.to_string(),
            long_name: format!("{short} Long"),
            position: "CM".to_string(),
            rating: 70,
            club: club.to_string(),
            season: season.to_string(),
        }
    }

    fn sample_rows() -> Vec<PlayerRow> {
        vec![
            row("A", "Arsenal", "2017/2018"),
            row("B", "Chelsea", "2017/2018"),
            row("C", "Arsenal", "2017/2018"),
            row("D", "Arsenal", "2018/2019"),
            row("E", "Burnley", "2018/2019"),
            row("F", "Everton", "2017/2018"),
        ]
    }

    #[test]
    fn partition_keeps_first_seen_order_per_season() {
        let partition = SeasonPartition::from_rows(&sample_rows());
        let buckets = partition.buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].season, "2017/2018");
        assert_eq!(buckets[0].clubs, vec!["Arsenal", "Chelsea", "Everton"]);
        assert_eq!(buckets[1].clubs, vec!["Arsenal", "Burnley"]);
        assert_eq!(partition.club_count(), 5);
    }

    #[test]
    fn club_keys_follow_season_then_club_order() {
        let clubs = ClubKeys::assign(&SeasonPartition::from_rows(&sample_rows()));
        assert_eq!(clubs.get("2017/2018", "Arsenal"), Some(ClubId(1)));
        assert_eq!(clubs.get("2017/2018", "Everton"), Some(ClubId(3)));
        assert_eq!(clubs.get("2018/2019", "Arsenal"), Some(ClubId(4)));
        assert_eq!(clubs.get("2018/2019", "Chelsea"), None);
        assert_eq!(clubs.in_season("2018/2019").count(), 2);
    }

    #[test]
    fn player_keys_and_name_index() {
        let rows = sample_rows();
        let clubs = ClubKeys::assign(&SeasonPartition::from_rows(&rows));
        let players = PlayerKeys::assign(&rows, &clubs);
        assert_eq!(players.players.len(), 6);
        assert_eq!(players.players[3].id, PlayerId(4));
        assert_eq!(players.players[3].club_id, ClubId(4));
        let arsenal = players.roster("2017/2018", "Arsenal");
        assert_eq!(
            arsenal.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![PlayerId(1), PlayerId(3)]
        );
        assert!(players.roster("2019/2020", "Arsenal").is_empty());
    }

    #[test]
    fn assignment_is_deterministic() {
        let rows = sample_rows();
        let first = ClubKeys::assign(&SeasonPartition::from_rows(&rows));
        let second = ClubKeys::assign(&SeasonPartition::from_rows(&rows));
        assert_eq!(first.entries(), second.entries());
        let p1 = PlayerKeys::assign(&rows, &first);
        let p2 = PlayerKeys::assign(&rows, &second);
        assert_eq!(p1.players, p2.players);
    }
}
