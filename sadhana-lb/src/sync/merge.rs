//! Merge primitives
//!
//! Pure reconciliation of freshly parsed external data against
//! previously persisted state. Nothing here touches the store; the
//! orchestration in the parent module decides what gets written.

use sadhana_common::records::{ParsedTable, Submission};
use std::collections::HashMap;

/// Most recent submissions retained after a merge
pub const SUBMISSION_WINDOW: usize = 500;

/// Merge a per-type table
///
/// Existing members are indexed by `(team, name)` and fresh members
/// overlaid on top: a key collision replaces the whole record, members
/// present only in `existing` are retained, and fresh-only members are
/// appended. The result can never have fewer members than either input.
pub fn merge_tables(existing: ParsedTable, fresh: ParsedTable) -> ParsedTable {
    let dates = if fresh.dates.is_empty() {
        existing.dates
    } else {
        fresh.dates
    };

    let mut members = existing.members;
    let mut index: HashMap<(String, String), usize> = members
        .iter()
        .enumerate()
        .map(|(i, m)| (m.key(), i))
        .collect();

    for member in fresh.members {
        let key = member.key();
        match index.get(&key) {
            Some(&i) => members[i] = member,
            None => {
                index.insert(key, members.len());
                members.push(member);
            }
        }
    }

    ParsedTable { dates, members }
}

/// Merge the submission log
///
/// Both sides are indexed by `(name, timestamp)`; fresh overwrites on
/// collision. The result is re-sorted descending by effective
/// timestamp and truncated to the retention window.
pub fn merge_submissions(existing: Vec<Submission>, fresh: Vec<Submission>) -> Vec<Submission> {
    let mut merged: Vec<Submission> = Vec::with_capacity(existing.len() + fresh.len());
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for submission in existing.into_iter().chain(fresh) {
        let key = submission.dedup_key();
        match index.get(&key) {
            Some(&i) => merged[i] = submission,
            None => {
                index.insert(key, merged.len());
                merged.push(submission);
            }
        }
    }

    sort_and_truncate(merged)
}

/// Sort descending by effective timestamp and cap storage growth
pub fn sort_and_truncate(mut submissions: Vec<Submission>) -> Vec<Submission> {
    submissions.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
            .then_with(|| a.name.cmp(&b.name))
    });
    submissions.truncate(SUBMISSION_WINDOW);
    submissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use sadhana_common::records::{EventSource, MemberRecord};

    fn member(team: &str, name: &str, total: f64) -> MemberRecord {
        MemberRecord {
            team: team.to_string(),
            name: name.to_string(),
            total,
            points: None,
            daily: Default::default(),
        }
    }

    fn table(members: Vec<MemberRecord>) -> ParsedTable {
        ParsedTable {
            dates: vec![],
            members,
        }
    }

    fn submission(name: &str, timestamp: &str, submitted_at: i64, minutes: f64) -> Submission {
        Submission {
            id: format!("{}-{}", name, timestamp),
            name: name.to_string(),
            date: "1/1".to_string(),
            minutes,
            time_of_day: None,
            thoughts: None,
            share_consent: false,
            timestamp: timestamp.to_string(),
            submitted_at,
            source: EventSource::Sheets,
        }
    }

    #[test]
    fn fresh_wins_on_key_collision() {
        let existing = table(vec![member("Lotus", "Asha", 10.0)]);
        let fresh = table(vec![member("Lotus", "Asha", 42.0)]);

        let merged = merge_tables(existing, fresh);
        assert_eq!(merged.members.len(), 1);
        assert_eq!(merged.members[0].total, 42.0);
    }

    #[test]
    fn existing_only_members_are_retained() {
        let existing = table(vec![member("Lotus", "Asha", 10.0), member("Cedar", "Bo", 5.0)]);
        let fresh = table(vec![member("Lotus", "Kiran", 7.0)]);

        let merged = merge_tables(existing, fresh);
        assert_eq!(merged.members.len(), 3);
    }

    #[test]
    fn merged_count_never_regresses() {
        let existing = table(vec![member("Lotus", "Asha", 1.0), member("Cedar", "Bo", 2.0)]);
        let fresh = table(vec![
            member("Lotus", "Asha", 3.0),
            member("Cedar", "Devi", 4.0),
            member("Cedar", "Ela", 5.0),
        ]);

        let existing_len = existing.members.len();
        let fresh_len = fresh.members.len();
        let merged = merge_tables(existing, fresh);
        assert!(merged.members.len() >= existing_len.max(fresh_len));
    }

    #[test]
    fn same_name_on_different_teams_stays_distinct() {
        let existing = table(vec![member("Lotus", "Asha", 1.0)]);
        let fresh = table(vec![member("Cedar", "Asha", 2.0)]);

        let merged = merge_tables(existing, fresh);
        assert_eq!(merged.members.len(), 2);
    }

    #[test]
    fn fresh_dates_replace_existing() {
        let mut existing = table(vec![]);
        existing.dates = vec!["1/1".to_string()];
        let mut fresh = table(vec![]);
        fresh.dates = vec!["1/1".to_string(), "1/2".to_string()];

        assert_eq!(merge_tables(existing, fresh).dates.len(), 2);
    }

    #[test]
    fn submission_dedup_keeps_later_applied_source() {
        let existing = vec![submission("Asha", "1/5/2024 9:00:00 AM", 100, 30.0)];
        let fresh = vec![submission("Asha", "1/5/2024 9:00:00 AM", 100, 45.0)];

        let merged = merge_submissions(existing, fresh);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].minutes, 45.0);
    }

    #[test]
    fn submissions_resort_descending_after_merge() {
        let existing = vec![submission("Asha", "t1", 100, 30.0)];
        let fresh = vec![
            submission("Bo", "t3", 300, 10.0),
            submission("Kiran", "t2", 200, 20.0),
        ];

        let merged = merge_submissions(existing, fresh);
        let order: Vec<&str> = merged.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, vec!["Bo", "Kiran", "Asha"]);
    }

    #[test]
    fn submission_window_caps_growth() {
        let existing: Vec<Submission> = (0..SUBMISSION_WINDOW as i64 + 50)
            .map(|i| submission("Asha", &format!("t{}", i), i, 1.0))
            .collect();

        let merged = merge_submissions(existing, vec![]);
        assert_eq!(merged.len(), SUBMISSION_WINDOW);
        // the oldest fall off the window
        assert!(merged.iter().all(|s| s.submitted_at >= 50));
    }
}
