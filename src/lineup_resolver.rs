use std::collections::HashSet;

use log::{debug, warn};

use crate::keys::{PlayerId, RosterEntry};

pub type Bigram = (char, char);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution {
    Contained,
    Bigram { score: usize },
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlot {
    pub player: Option<PlayerId>,
    pub how: SlotResolution,
}

impl ResolvedSlot {
    const UNRESOLVED: Self = Self {
        player: None,
        how: SlotResolution::Unresolved,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLineup {
    pub home: Vec<ResolvedSlot>,
    pub away: Vec<ResolvedSlot>,
}

impl ResolvedLineup {
    pub fn home_ids(&self) -> Vec<Option<PlayerId>> {
        self.home.iter().map(|s| s.player).collect()
    }

    pub fn away_ids(&self) -> Vec<Option<PlayerId>> {
        self.away.iter().map(|s| s.player).collect()
    }

    pub fn slots(&self) -> impl Iterator<Item = &ResolvedSlot> {
        self.home.iter().chain(self.away.iter())
    }
}

pub fn resolve_lineup(
    home_names: &[String],
    home_roster: &[RosterEntry],
    away_names: &[String],
    away_roster: &[RosterEntry],
) -> ResolvedLineup {
    ResolvedLineup {
        home: resolve_side(home_names, home_roster),
        away: resolve_side(away_names, away_roster),
    }
}

/// Maps each lineup name to a roster player, keeping slot positions. Every
/// candidate is handed out at most once: substring containment first, then
/// the largest common-bigram count for whatever is left.
pub fn resolve_side(names: &[String], roster: &[RosterEntry]) -> Vec<ResolvedSlot> {
    let mut pool: Vec<&RosterEntry> = roster.iter().collect();
    let mut slots = vec![ResolvedSlot::UNRESOLVED; names.len()];
    let mut pending = Vec::new();

    for (slot, name) in names.iter().enumerate() {
        if name.is_empty() {
            continue;
        }
        let hit = pool.iter().position(|c| {
            c.short_name.contains(name.as_str()) || c.long_name.contains(name.as_str())
        });
        match hit {
            Some(idx) => {
                let candidate = pool.remove(idx);
                slots[slot] = ResolvedSlot {
                    player: Some(candidate.id),
                    how: SlotResolution::Contained,
                };
            }
            None => pending.push(slot),
        }
    }

    for slot in pending {
        let name = &names[slot];
        let wanted = bigrams(name).into_iter().collect::<HashSet<_>>();
        let mut best: Option<(usize, usize)> = None;
        for (idx, candidate) in pool.iter().enumerate() {
            let score = candidate_score(candidate, &wanted);
            if score > best.map_or(0, |(s, _)| s) {
                best = Some((score, idx));
            }
        }
        let Some((score, idx)) = best else {
            warn!("no roster candidate shares a bigram with '{name}'");
            continue;
        };
        let candidate = pool.remove(idx);
        debug!(
            "'{name}' matched '{}' with {score} common bigrams",
            candidate.long_name
        );
        slots[slot] = ResolvedSlot {
            player: Some(candidate.id),
            how: SlotResolution::Bigram { score },
        };
    }

    slots
}

fn candidate_score(candidate: &RosterEntry, wanted: &HashSet<Bigram>) -> usize {
    let short = common_bigrams(&bigrams(&candidate.short_name), wanted);
    let long = common_bigrams(&bigrams(&candidate.long_name), wanted);
    short.max(long)
}

/// Adjacent character pairs of every significant token. Tokens are split on
/// whitespace and stripped of punctuation; single letters (initials) are
/// dropped.
pub fn bigrams(name: &str) -> Vec<Bigram> {
    let mut out = Vec::new();
    for token in name.split_whitespace() {
        let chars = token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<Vec<_>>();
        if chars.len() < 2 {
            continue;
        }
        out.extend(chars.windows(2).map(|w| (w[0], w[1])));
    }
    out
}

/// Raw count, not normalised by either name's length.
pub fn common_bigrams(candidate: &[Bigram], wanted: &HashSet<Bigram>) -> usize {
    candidate.iter().filter(|b| wanted.contains(b)).count()
}
