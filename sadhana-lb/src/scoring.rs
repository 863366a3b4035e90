//! Scoring rules
//!
//! Converts raw attendance/duration values into point values per
//! activity type. Meditation minutes score 1:1 and practice daily
//! values are already points (embedded from the sheet's own header at
//! parse time), so only class values need a transform here.

use sadhana_common::records::ActivityType;

/// Points earned per class attendance
pub const CLASS_ATTENDANCE_POINTS: f64 = 50.0;

/// Boundary between "attendance count" and "already points" readings
/// of a class value in the unified log
pub const CLASS_COUNT_THRESHOLD: f64 = 5.0;

/// Resolve a class value taken from the unified log into points
///
/// The log mixes records written under two conventions: older entries
/// store a raw attendance count, newer ones store precomputed points.
/// Values below the threshold are read as counts; anything at or above
/// it is taken as points unchanged. The threshold is fragile: a member
/// with exactly 5 recorded attendances lands on the points side and is
/// scored as 5 rather than 250.
pub fn class_points_from_log(value: f64) -> f64 {
    if value < CLASS_COUNT_THRESHOLD {
        value * CLASS_ATTENDANCE_POINTS
    } else {
        value
    }
}

/// Point value of one unified-log event
///
/// Negative stored values contribute nothing; no activity type may
/// subtract from a total.
pub fn event_points(activity: ActivityType, value: f64) -> f64 {
    let value = value.max(0.0);
    match activity {
        ActivityType::Meditation => value,
        ActivityType::Practice => value,
        ActivityType::Class => class_points_from_log(value),
    }
}
