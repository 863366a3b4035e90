//! Aggregator
//!
//! Derives per-member point totals from the unified activity log,
//! independent of the per-type tables, and composes the member listing
//! from its three layered sources.

use sadhana_common::records::{ActivityEvent, ActivityType, ManualMember, SyncedMember};
use serde::Serialize;

use crate::scoring;

/// Sentinel team for events that arrive without one
pub const UNKNOWN_TEAM: &str = "unknown";

/// Per-member totals bucket, keyed by `(team, name)`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTotals {
    pub team: String,
    pub name: String,
    pub meditation_points: f64,
    pub practice_points: f64,
    pub class_points: f64,
}

impl MemberTotals {
    pub fn new(team: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            name: name.into(),
            meditation_points: 0.0,
            practice_points: 0.0,
            class_points: 0.0,
        }
    }

    /// Display score: the three per-type totals summed
    pub fn total(&self) -> f64 {
        self.meditation_points + self.practice_points + self.class_points
    }

    fn absorb(&mut self, other: &MemberTotals) {
        self.meditation_points += other.meditation_points;
        self.practice_points += other.practice_points;
        self.class_points += other.class_points;
    }

    fn add(&mut self, activity: ActivityType, points: f64) {
        match activity {
            ActivityType::Meditation => self.meditation_points += points,
            ActivityType::Practice => self.practice_points += points,
            ActivityType::Class => self.class_points += points,
        }
    }
}

/// Derive per-member totals from the unified log in a single pass
///
/// Events with an empty member name are skipped; an empty team resolves
/// to the unknown sentinel. When a later event supplies a real team for
/// a name previously bucketed under the sentinel, that bucket is
/// upgraded in place: the name is the stronger identity key.
pub fn aggregate_events(events: &[ActivityEvent]) -> Vec<MemberTotals> {
    let mut buckets: Vec<MemberTotals> = Vec::new();

    for event in events {
        let name = event.member.trim();
        if name.is_empty() {
            continue;
        }
        let team = match event.team.trim() {
            "" => UNKNOWN_TEAM,
            t => t,
        };
        let points = scoring::event_points(event.activity, event.value);

        if team != UNKNOWN_TEAM {
            if let Some(orphan) = buckets
                .iter()
                .position(|b| b.team == UNKNOWN_TEAM && b.name == name)
            {
                match buckets.iter().position(|b| b.team == team && b.name == name) {
                    Some(target) => {
                        let upgraded = buckets.remove(orphan);
                        let target = if target > orphan { target - 1 } else { target };
                        buckets[target].absorb(&upgraded);
                    }
                    None => buckets[orphan].team = team.to_string(),
                }
            }
        }

        match buckets.iter_mut().find(|b| b.team == team && b.name == name) {
            Some(bucket) => bucket.add(event.activity, points),
            None => {
                let mut bucket = MemberTotals::new(team, name);
                bucket.add(event.activity, points);
                buckets.push(bucket);
            }
        }
    }

    buckets
}

// ---------------------------------------------------------------------------
// Layered member listing: baseline -> computed -> overrides
// ---------------------------------------------------------------------------

/// Stage 1: identity scaffold from the last sync, zero scores
pub fn apply_baseline(synced: &[SyncedMember]) -> Vec<MemberTotals> {
    synced
        .iter()
        .map(|m| MemberTotals::new(m.team.as_str(), m.name.as_str()))
        .collect()
}

/// Stage 2: overlay live totals from the aggregator
///
/// Entries match by `(team, name)`, falling back to name alone so a
/// baseline row keeps its sheet team when the log only knows the
/// sentinel. Computed members absent from the baseline are appended.
pub fn apply_computed(mut listing: Vec<MemberTotals>, computed: Vec<MemberTotals>) -> Vec<MemberTotals> {
    for totals in computed {
        let position = listing
            .iter()
            .position(|e| e.team == totals.team && e.name == totals.name)
            .or_else(|| listing.iter().position(|e| e.name == totals.name));

        match position {
            Some(i) => {
                listing[i].meditation_points = totals.meditation_points;
                listing[i].practice_points = totals.practice_points;
                listing[i].class_points = totals.class_points;
            }
            None => listing.push(totals),
        }
    }
    listing
}

/// Stage 3: manual admin overrides, applied last
///
/// An override may replace the team but never clobbers computed scores
/// unless it supplies its own.
pub fn apply_overrides(mut listing: Vec<MemberTotals>, manual: &[ManualMember]) -> Vec<MemberTotals> {
    for record in manual {
        let name = record.name.trim();
        if name.is_empty() {
            continue;
        }

        let index = match listing.iter().position(|e| e.name == name) {
            Some(i) => i,
            None => {
                listing.push(MemberTotals::new(
                    record.team.as_deref().unwrap_or(UNKNOWN_TEAM),
                    name,
                ));
                listing.len() - 1
            }
        };
        let entry = &mut listing[index];

        if let Some(team) = &record.team {
            entry.team = team.clone();
        }
        if let Some(points) = record.meditation_points {
            entry.meditation_points = points;
        }
        if let Some(points) = record.practice_points {
            entry.practice_points = points;
        }
        if let Some(points) = record.class_points {
            entry.class_points = points;
        }
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use sadhana_common::records::EventSource;

    fn event(activity: ActivityType, team: &str, member: &str, value: f64) -> ActivityEvent {
        ActivityEvent::new(activity, team, member, "1/5", value, EventSource::Sheets)
    }

    #[test]
    fn accumulates_per_type_totals_by_team_and_name() {
        let events = vec![
            event(ActivityType::Meditation, "Lotus", "Asha", 30.0),
            event(ActivityType::Meditation, "Lotus", "Asha", 15.0),
            event(ActivityType::Practice, "Lotus", "Asha", 25.0),
            event(ActivityType::Meditation, "Cedar", "Bo", 10.0),
        ];

        let totals = aggregate_events(&events);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].meditation_points, 45.0);
        assert_eq!(totals[0].practice_points, 25.0);
        assert_eq!(totals[0].total(), 70.0);
    }

    #[test]
    fn class_values_go_through_the_log_heuristic() {
        let events = vec![
            event(ActivityType::Class, "Lotus", "Asha", 2.0),
            event(ActivityType::Class, "Cedar", "Bo", 100.0),
        ];

        let totals = aggregate_events(&events);
        assert_eq!(totals[0].class_points, 100.0);
        assert_eq!(totals[1].class_points, 100.0);
    }

    #[test]
    fn events_without_member_are_skipped() {
        let events = vec![event(ActivityType::Meditation, "Lotus", "", 30.0)];
        assert!(aggregate_events(&events).is_empty());
    }

    #[test]
    fn later_real_team_upgrades_sentinel_bucket() {
        let events = vec![
            event(ActivityType::Meditation, "", "Asha", 30.0),
            event(ActivityType::Meditation, "Lotus", "Asha", 10.0),
        ];

        let totals = aggregate_events(&events);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].team, "Lotus");
        assert_eq!(totals[0].meditation_points, 40.0);
    }

    #[test]
    fn baseline_then_computed_then_overrides() {
        let synced = vec![
            SyncedMember {
                team: "Lotus".to_string(),
                name: "Asha".to_string(),
            },
            SyncedMember {
                team: "Cedar".to_string(),
                name: "Bo".to_string(),
            },
        ];
        let computed = vec![{
            let mut t = MemberTotals::new("Lotus", "Asha");
            t.meditation_points = 45.0;
            t
        }];
        let manual = vec![ManualMember {
            name: "Asha".to_string(),
            team: Some("Juniper".to_string()),
            meditation_points: None,
            practice_points: None,
            class_points: None,
        }];

        let listing = apply_overrides(apply_computed(apply_baseline(&synced), computed), &manual);

        assert_eq!(listing.len(), 2);
        // override moved the team but left the computed score alone
        assert_eq!(listing[0].team, "Juniper");
        assert_eq!(listing[0].meditation_points, 45.0);
        // untouched baseline member keeps zero scores
        assert_eq!(listing[1].total(), 0.0);
    }

    #[test]
    fn override_with_scores_replaces_computed() {
        let computed = vec![{
            let mut t = MemberTotals::new("Lotus", "Asha");
            t.class_points = 150.0;
            t
        }];
        let manual = vec![ManualMember {
            name: "Asha".to_string(),
            team: None,
            meditation_points: None,
            practice_points: None,
            class_points: Some(200.0),
        }];

        let listing = apply_overrides(apply_computed(Vec::new(), computed), &manual);
        assert_eq!(listing[0].class_points, 200.0);
    }
}
