use log::debug;
use strsim::levenshtein;

use crate::error::IngestError;
use crate::keys::{ClubId, ClubKeys};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClubMatchKind {
    Exact,
    Fuzzy { distance: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClub<'a> {
    pub id: ClubId,
    /// Name as spelled in the player source; used to look up the roster.
    pub name: &'a str,
    pub kind: ClubMatchKind,
}

/// Finds the club key for a name spelled by the lineup source. Exact
/// (season, name) hits win; otherwise the same-season club with the smallest
/// edit distance is taken, earliest key first on ties.
pub fn resolve_club<'a>(
    keys: &'a ClubKeys,
    season: &str,
    name: &str,
) -> Result<ResolvedClub<'a>, IngestError> {
    if let Some(entry) = keys.entry(season, name) {
        return Ok(ResolvedClub {
            id: entry.id,
            name: entry.key.club.as_str(),
            kind: ClubMatchKind::Exact,
        });
    }

    let mut best: Option<ResolvedClub<'a>> = None;
    let mut best_distance = usize::MAX;
    for entry in keys.in_season(season) {
        let distance = levenshtein(&entry.key.club, name);
        if distance < best_distance {
            best_distance = distance;
            best = Some(ResolvedClub {
                id: entry.id,
                name: entry.key.club.as_str(),
                kind: ClubMatchKind::Fuzzy { distance },
            });
        }
    }
    let resolved = best.ok_or_else(|| IngestError::UnknownSeason(season.to_string()))?;
    debug!(
        "club '{name}' ({season}) resolved to '{}' by edit distance {best_distance}",
        resolved.name
    );
    Ok(resolved)
}
