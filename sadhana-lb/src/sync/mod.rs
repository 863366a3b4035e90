//! Merge engine
//!
//! Orchestrates a sync run: parse the four fetched sources, reconcile
//! them against persisted state under the selected mode, write the
//! result back, stamp sync metadata, and verify one written table.

pub mod merge;

pub use merge::{merge_submissions, merge_tables, SUBMISSION_WINDOW};

use chrono::{DateTime, Utc};
use sadhana_common::records::{
    ActivityType, MemberRecord, ParsedTable, RecentEntry, Submission, SyncMeta, SyncMode,
    SyncedMember,
};
use sadhana_common::Result;
use serde::Serialize;

use crate::db::kv::{keys, Store};
use crate::scoring::CLASS_ATTENDANCE_POINTS;
use crate::tabular;

/// Entries retained in the sync metadata's recent-activity preview
pub const RECENT_ACTIVITY_LIMIT: usize = 20;

/// Raw text of the four tabular sources, empty where a fetch failed
#[derive(Debug, Clone, Default)]
pub struct FetchedSources {
    pub meditation: String,
    pub practice: String,
    pub class: String,
    pub form: String,
}

/// Outcome of one sync run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub mode: SyncMode,
    pub synced_at: DateTime<Utc>,
    pub meditation_members: usize,
    pub practice_members: usize,
    pub class_members: usize,
    pub submission_count: usize,
    /// Post-write verification read of the meditation table, None when
    /// the verification read itself failed
    pub verified_member_count: Option<usize>,
}

/// Run one sync against the store
///
/// Source fetch failures have already degraded to empty text upstream;
/// a write failure here is surfaced as a sync failure since an
/// incomplete write set must not be reported as success.
pub async fn run_sync(store: &Store, mode: SyncMode, sources: FetchedSources) -> Result<SyncSummary> {
    let fresh_meditation = tabular::parse_meditation(&sources.meditation);
    let fresh_practice = tabular::parse_practice(&sources.practice);
    let fresh_class = tabular::parse_class(&sources.class);
    let fresh_submissions = tabular::parse_form(&sources.form);

    tracing::info!(
        mode = mode.as_str(),
        meditation = fresh_meditation.members.len(),
        practice = fresh_practice.members.len(),
        class = fresh_class.members.len(),
        submissions = fresh_submissions.len(),
        "Parsed fresh sources"
    );

    let (meditation, practice, class, submissions) = match mode {
        SyncMode::Overwrite => {
            // Derived caches do not survive an overwrite
            let (members, activities) = tokio::join!(
                store.delete(keys::MEMBERS_ALL),
                store.delete(keys::ACTIVITIES_ALL),
            );
            members?;
            activities?;

            (
                fresh_meditation,
                fresh_practice,
                fresh_class,
                merge::sort_and_truncate(fresh_submissions),
            )
        }
        SyncMode::Merge => {
            let (meditation, practice, class, submissions) = tokio::join!(
                store.get_or_default::<ParsedTable>(keys::MEDITATION),
                store.get_or_default::<ParsedTable>(keys::PRACTICE),
                store.get_or_default::<ParsedTable>(keys::CLASS),
                store.get_or_default::<Vec<Submission>>(keys::SUBMISSIONS_ALL),
            );

            (
                merge_tables(meditation, fresh_meditation),
                merge_tables(practice, fresh_practice),
                merge_tables(class, fresh_class),
                merge_submissions(submissions, fresh_submissions),
            )
        }
    };

    let synced = synced_members(&meditation, &practice, &class);
    let meta = SyncMeta {
        synced_at: Utc::now(),
        recent_activity: submissions
            .iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .cloned()
            .map(RecentEntry::Submission)
            .collect(),
        last_sync_mode: mode,
    };

    // Writes are issued concurrently with no ordering guarantee; a
    // reader mid-sync may observe a torn state across tables
    let (w_meditation, w_practice, w_class, w_submissions, w_synced, w_meta) = tokio::join!(
        store.set(keys::MEDITATION, &meditation, None),
        store.set(keys::PRACTICE, &practice, None),
        store.set(keys::CLASS, &class, None),
        store.set_permanent(keys::SUBMISSIONS_ALL, &submissions),
        store.set_permanent(keys::MEMBERS_SYNCED, &synced),
        store.set(keys::META, &meta, None),
    );
    w_meditation?;
    w_practice?;
    w_class?;
    w_submissions?;
    w_synced?;
    w_meta?;

    // Post-write verification: surfaces silent write failures in the
    // log without failing an otherwise-complete sync
    let verified_member_count = match store.get::<ParsedTable>(keys::MEDITATION).await {
        Ok(Some(table)) => {
            tracing::info!(members = table.members.len(), "Post-write verification read");
            Some(table.members.len())
        }
        Ok(None) => {
            tracing::warn!("Post-write verification read found no meditation table");
            Some(0)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Post-write verification read failed");
            None
        }
    };

    Ok(SyncSummary {
        mode,
        synced_at: meta.synced_at,
        meditation_members: meditation.members.len(),
        practice_members: practice.members.len(),
        class_members: class.members.len(),
        submission_count: submissions.len(),
        verified_member_count,
    })
}

/// Union of table identities, the baseline scaffold for member listings
fn synced_members(
    meditation: &ParsedTable,
    practice: &ParsedTable,
    class: &ParsedTable,
) -> Vec<SyncedMember> {
    let mut members: Vec<SyncedMember> = Vec::new();
    for table in [meditation, practice, class] {
        for record in &table.members {
            let seen = members
                .iter()
                .any(|m| m.team == record.team && m.name == record.name);
            if !seen {
                members.push(SyncedMember {
                    team: record.team.clone(),
                    name: record.name.clone(),
                });
            }
        }
    }
    members
}

/// Accumulate a direct write into a per-type table
///
/// Daily values add up (multiple sessions per day are intentional) and
/// the total is recomputed from the daily map. Class records also get
/// their derived points refreshed.
pub fn apply_direct_entry(
    table: &mut ParsedTable,
    activity: ActivityType,
    team: &str,
    member: &str,
    date: &str,
    value: f64,
) {
    let index = match table
        .members
        .iter()
        .position(|m| m.team == team && m.name == member)
    {
        Some(i) => i,
        None => {
            table.members.push(MemberRecord::new(team, member));
            table.members.len() - 1
        }
    };
    let record = &mut table.members[index];

    *record.daily.entry(date.to_string()).or_insert(0.0) += value;
    record.recompute_total();
    if activity == ActivityType::Class {
        record.points = Some(record.total * CLASS_ATTENDANCE_POINTS);
    }

    if !table.dates.iter().any(|d| d == date) {
        table.dates.push(date.to_string());
    }
}
