//! Core record types shared across the leaderboard services
//!
//! Per-type tables, the unified activity log, form submissions, teams,
//! and sync metadata. Everything here crosses either the wire or the
//! persistence gateway, so all types derive Serialize/Deserialize with
//! camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Activity types tracked by the leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    /// Meditation minutes (1 minute = 1 point)
    Meditation,
    /// Practice sessions (points configured per date column in the sheet)
    Practice,
    /// Class attendance (50 points per attendance)
    Class,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Meditation => "meditation",
            ActivityType::Practice => "practice",
            ActivityType::Class => "class",
        }
    }
}

/// Where a record entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Direct admin edit
    Admin,
    /// Spreadsheet sync
    Sheets,
    /// User-facing submission form
    Form,
}

/// One member's row in a per-type table
///
/// Identity is `(team, name)`. `total` is a derived cache of the daily
/// values; `points` is populated only for class records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub team: String,
    pub name: String,
    #[serde(default)]
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(default)]
    pub daily: BTreeMap<String, f64>,
}

impl MemberRecord {
    pub fn new(team: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            name: name.into(),
            total: 0.0,
            points: None,
            daily: BTreeMap::new(),
        }
    }

    /// Identity key for merging
    pub fn key(&self) -> (String, String) {
        (self.team.clone(), self.name.clone())
    }

    /// Recompute `total` from the daily map
    pub fn recompute_total(&mut self) {
        self.total = self.daily.values().sum();
    }
}

/// Normalized output of one tabular source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTable {
    /// Date labels in sheet column order
    pub dates: Vec<String>,
    pub members: Vec<MemberRecord>,
}

/// One entry in the unified activity log
///
/// Immutable once created, except for deletion by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub activity: ActivityType,
    #[serde(default)]
    pub team: String,
    pub member: String,
    pub date: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    pub source: EventSource,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(
        activity: ActivityType,
        team: impl Into<String>,
        member: impl Into<String>,
        date: impl Into<String>,
        value: f64,
        source: EventSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            activity,
            team: team.into(),
            member: member.into(),
            date: date.into(),
            value,
            notes: None,
            thoughts: None,
            time_of_day: None,
            source,
            created_at: Utc::now(),
        }
    }
}

/// Raw form intake record
///
/// Dedup identity is `(name, timestamp)`; `submitted_at` is the parsed
/// timestamp in epoch milliseconds (0 when unparseable) and drives the
/// descending sort of the submission log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub name: String,
    pub date: String,
    pub minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
    #[serde(default)]
    pub share_consent: bool,
    /// Raw timestamp string as it appeared at intake
    pub timestamp: String,
    pub submitted_at: i64,
    pub source: EventSource,
}

impl Submission {
    /// Identity key for deduplication
    pub fn dedup_key(&self) -> (String, String) {
        (self.name.clone(), self.timestamp.clone())
    }
}

/// Team definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub color: String,
}

/// Reconciliation strategy for a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Additive reconciliation against persisted state
    Merge,
    /// Wholesale replacement; derived caches are discarded
    Overwrite,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Merge => "merge",
            SyncMode::Overwrite => "overwrite",
        }
    }
}

/// Entry in the bounded recent-activity preview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecentEntry {
    Activity(ActivityEvent),
    Submission(Submission),
}

/// Freshness signal written after every sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub recent_activity: Vec<RecentEntry>,
    pub last_sync_mode: SyncMode,
}

/// Member identity captured at sync time, zero scores
///
/// The baseline scaffold for the layered member listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedMember {
    pub team: String,
    pub name: String,
}

/// Admin-entered member metadata, applied last in the member listing
///
/// Optional score fields overwrite computed scores only when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meditation_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_points: Option<f64>,
}
