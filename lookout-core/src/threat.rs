//! Defend-mode proximity detection with nation and alliance exclusion.

use crate::geo::horizontal_distance;
use crate::models::{Affiliation, Coords, PlayerName, Threat};
use crate::provider::{Alliance, OnlinePlayer};
use std::collections::HashSet;
use tracing::debug;

impl Affiliation {
    /// Build the exclusion set for `nation` from the alliances it belongs to.
    pub fn resolve(nation: Option<String>, alliances: &[Alliance]) -> Self {
        let allied_nations = match &nation {
            Some(own) => alliances
                .iter()
                .filter(|a| a.member_nations.iter().any(|n| n.eq_ignore_ascii_case(own)))
                .flat_map(|a| a.member_nations.iter().map(|n| n.to_lowercase()))
                .collect(),
            None => HashSet::new(),
        };
        Self {
            nation,
            allied_nations,
        }
    }

    /// Why a player of `nation` is friendly, if they are.
    pub fn exclusion(&self, nation: Option<&str>) -> Option<Exclusion> {
        let nation = nation?;
        if self
            .nation
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(nation))
        {
            return Some(Exclusion::SameNation);
        }
        if self.allied_nations.contains(&nation.to_lowercase()) {
            return Some(Exclusion::AlliedNation);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    SameNation,
    AlliedNation,
}

/// Non-friendly players within `radius` blocks of `origin`, nearest first.
pub fn detect_threats(
    subject: &str,
    origin: Coords,
    radius: u32,
    affiliation: &Affiliation,
    candidates: &[OnlinePlayer],
) -> Vec<Threat> {
    let mut threats: Vec<Threat> = candidates
        .iter()
        .filter(|p| !p.name.eq_ignore_ascii_case(subject))
        .filter_map(|p| {
            let distance = horizontal_distance(origin, p.coords);
            if distance > f64::from(radius) {
                return None;
            }
            if let Some(reason) = affiliation.exclusion(p.nation.as_deref()) {
                debug!(player = %p.name, ?reason, distance, "excluding nearby player");
                return None;
            }
            Some(Threat {
                name: p.name,
                distance: distance.round() as u32,
                nation: p.nation.clone(),
                town: p.town.clone(),
                coords: p.coords,
            })
        })
        .collect();
    threats.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.name.cmp(&b.name)));
    threats
}

/// Change in the threat set between two ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatDiff {
    pub entered: Vec<Threat>,
    pub left: Vec<PlayerName>,
    /// Replaces the session's `last_known_threats`.
    pub current: HashSet<PlayerName>,
}

impl ThreatDiff {
    pub fn is_unchanged(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

pub fn diff_threats(previous: &HashSet<PlayerName>, now: &[Threat]) -> ThreatDiff {
    let current: HashSet<PlayerName> = now.iter().map(|t| t.name).collect();
    let entered = now
        .iter()
        .filter(|t| !previous.contains(&t.name))
        .cloned()
        .collect();
    let mut left: Vec<PlayerName> = previous.difference(&current).copied().collect();
    left.sort();
    ThreatDiff {
        entered,
        left,
        current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PlayerName {
        PlayerName::from(s).unwrap()
    }

    fn player(n: &str, x: f64, z: f64, nation: Option<&str>) -> OnlinePlayer {
        OnlinePlayer {
            name: name(n),
            coords: Coords::new(x, z),
            nation: nation.map(String::from),
            town: None,
        }
    }

    fn threat(n: &str) -> Threat {
        Threat {
            name: name(n),
            distance: 10,
            nation: None,
            town: None,
            coords: Coords::new(0.0, 10.0),
        }
    }

    #[test]
    fn test_same_nation_excluded_and_stranger_at_radius_included() {
        let affiliation = Affiliation::resolve(Some("X".into()), &[]);
        let candidates = vec![
            player("D", 30.0, 40.0, Some("X")),
            player("E", 60.0, 80.0, Some("Y")),
        ];

        let threats = detect_threats("Subject", Coords::new(0.0, 0.0), 100, &affiliation, &candidates);

        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].name.as_str(), "E");
        assert_eq!(threats[0].distance, 100);
        assert_eq!(threats[0].nation.as_deref(), Some("Y"));
    }

    #[test]
    fn test_alliance_members_excluded_case_insensitively() {
        let alliances = vec![
            Alliance {
                name: "Pact".into(),
                member_nations: vec!["X".into(), "Zed".into()],
            },
            Alliance {
                name: "Elsewhere".into(),
                member_nations: vec!["Q".into(), "R".into()],
            },
        ];
        let affiliation = Affiliation::resolve(Some("x".into()), &alliances);
        assert_eq!(affiliation.exclusion(Some("ZED")), Some(Exclusion::AlliedNation));
        assert_eq!(affiliation.exclusion(Some("X")), Some(Exclusion::SameNation));
        assert_eq!(affiliation.exclusion(Some("Q")), None);
        assert_eq!(affiliation.exclusion(None), None);

        let candidates = vec![
            player("Ally", 1.0, 1.0, Some("zed")),
            player("Foe", 2.0, 2.0, Some("Q")),
            player("Nomad", 3.0, 3.0, None),
        ];
        let threats = detect_threats("Subject", Coords::new(0.0, 0.0), 50, &affiliation, &candidates);
        let names: Vec<_> = threats.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Foe", "Nomad"]);
    }

    #[test]
    fn test_subject_and_distant_players_ignored() {
        let affiliation = Affiliation::default();
        let candidates = vec![
            player("subject", 0.0, 0.0, None),
            player("Far", 101.0, 0.0, None),
            player("Near", 0.0, -5.0, None),
        ];
        let threats = detect_threats("Subject", Coords::new(0.0, 0.0), 100, &affiliation, &candidates);
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].name.as_str(), "Near");
    }

    #[test]
    fn test_diff_reports_entries_and_exits() {
        let previous: HashSet<PlayerName> = [name("A"), name("B")].into_iter().collect();
        let now = vec![threat("B"), threat("C")];

        let diff = diff_threats(&previous, &now);

        assert_eq!(diff.entered.len(), 1);
        assert_eq!(diff.entered[0].name.as_str(), "C");
        assert_eq!(diff.left, vec![name("A")]);
        assert_eq!(diff.current, [name("B"), name("C")].into_iter().collect());
    }

    #[test]
    fn test_diff_unchanged_set() {
        let previous: HashSet<PlayerName> = [name("A")].into_iter().collect();
        let diff = diff_threats(&previous, &[threat("A")]);
        assert!(diff.is_unchanged());
        assert_eq!(diff.current, previous);
    }
}
