//! Tabular parser
//!
//! Turns raw delimited spreadsheet exports into normalized per-member
//! records, one schema per activity type plus the free-form submission
//! log. The parser is total: malformed rows are dropped, never raised,
//! and empty or unreachable sources yield empty results so a failed
//! fetch degrades cleanly.

use sadhana_common::records::{EventSource, MemberRecord, ParsedTable, Submission};
use sadhana_common::time::parse_form_timestamp;
use uuid::Uuid;

use crate::scoring::CLASS_ATTENDANCE_POINTS;

/// Split one row into fields, respecting quoted fields
///
/// A quote toggles the in-quotes state; a delimiter inside quotes is
/// literal. Quote characters themselves are not part of the field.
pub fn split_delimited_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current = String::new();
        } else {
            current.push(c);
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Line-based row splitting over the whole export
fn rows(raw: &str) -> Vec<Vec<String>> {
    raw.lines()
        .map(|line| split_delimited_line(line.trim_end_matches('\r'), ','))
        .collect()
}

/// Numeric cell parsing; anything unparseable counts as zero
fn parse_cell_number(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(0.0)
}

fn opt_cell(cell: Option<&String>) -> Option<String> {
    cell.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// Parse the meditation table
///
/// Row layout: `[team, name, total(ignored), ...dailyMinutes]`. The
/// header row past column 2 supplies date labels aligned positionally
/// with the daily cells. Only strictly positive cells enter the daily
/// map; the total is recomputed from it.
pub fn parse_meditation(raw: &str) -> ParsedTable {
    let rows = rows(raw);
    if rows.is_empty() {
        return ParsedTable::default();
    }

    let labels: Vec<String> = rows[0].iter().skip(3).cloned().collect();
    let mut members = Vec::new();

    for row in &rows[1..] {
        if row.len() < 3 {
            continue;
        }
        let (team, name) = (row[0].as_str(), row[1].as_str());
        if team.is_empty() || name.is_empty() {
            continue;
        }

        let mut record = MemberRecord::new(team, name);
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            let value = row.get(3 + i).map(|c| parse_cell_number(c)).unwrap_or(0.0);
            if value > 0.0 {
                record.daily.insert(label.clone(), value);
            }
        }
        record.recompute_total();
        members.push(record);
    }

    ParsedTable {
        dates: labels.into_iter().filter(|l| !l.is_empty()).collect(),
        members,
    }
}

/// Parse the practice table
///
/// Two header rows: row 0 carries the points-per-session for each date
/// column, row 1 the date labels; data rows start at row 2. A day earns
/// points only when both the attendance cell and that day's
/// points-per-session are strictly positive, and the stored daily value
/// is the points value, not the attendance count.
pub fn parse_practice(raw: &str) -> ParsedTable {
    let rows = rows(raw);
    if rows.len() < 2 {
        return ParsedTable::default();
    }

    let points_per_session: Vec<f64> = rows[0].iter().skip(3).map(|c| parse_cell_number(c)).collect();
    let labels: Vec<String> = rows[1].iter().skip(3).cloned().collect();
    let mut members = Vec::new();

    for row in &rows[2..] {
        if row.len() < 3 {
            continue;
        }
        let (team, name) = (row[0].as_str(), row[1].as_str());
        if team.is_empty() || name.is_empty() {
            continue;
        }

        let mut record = MemberRecord::new(team, name);
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            let attendance = row.get(3 + i).map(|c| parse_cell_number(c)).unwrap_or(0.0);
            let points = points_per_session.get(i).copied().unwrap_or(0.0);
            if attendance > 0.0 && points > 0.0 {
                record.daily.insert(label.clone(), points);
            }
        }
        record.recompute_total();
        members.push(record);
    }

    ParsedTable {
        dates: labels.into_iter().filter(|l| !l.is_empty()).collect(),
        members,
    }
}

/// Parse the class table
///
/// Row layout: `[team, name, tier(ignored), total, ...dailyAttendance]`
/// with date labels starting at header column 4. Points are derived
/// from the sheet's own total column at parse time.
pub fn parse_class(raw: &str) -> ParsedTable {
    let rows = rows(raw);
    if rows.is_empty() {
        return ParsedTable::default();
    }

    let labels: Vec<String> = rows[0].iter().skip(4).cloned().collect();
    let mut members = Vec::new();

    for row in &rows[1..] {
        if row.len() < 4 {
            continue;
        }
        let (team, name) = (row[0].as_str(), row[1].as_str());
        if team.is_empty() || name.is_empty() {
            continue;
        }

        let mut record = MemberRecord::new(team, name);
        let total = parse_cell_number(&row[3]);
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            let attendance = row.get(4 + i).map(|c| parse_cell_number(c)).unwrap_or(0.0);
            if attendance > 0.0 {
                record.daily.insert(label.clone(), attendance);
            }
        }
        record.total = total;
        record.points = Some(total * CLASS_ATTENDANCE_POINTS);
        members.push(record);
    }

    ParsedTable {
        dates: labels.into_iter().filter(|l| !l.is_empty()).collect(),
        members,
    }
}

/// Parse the free-form submission log
///
/// Row layout: `[timestamp, name, date, minutes, timeOfDay, thoughts,
/// shareConsent]`. Rows missing name or date, or with non-positive
/// minutes, are dropped; any header row falls out the same way. Output
/// is sorted descending by parsed timestamp, with unparseable
/// timestamps sorting as earliest.
pub fn parse_form(raw: &str) -> Vec<Submission> {
    let mut submissions = Vec::new();

    for row in rows(raw) {
        if row.len() < 4 {
            continue;
        }
        let (name, date) = (row[1].as_str(), row[2].as_str());
        if name.is_empty() || date.is_empty() {
            continue;
        }
        let minutes = parse_cell_number(&row[3]);
        if minutes <= 0.0 {
            continue;
        }

        let timestamp = row[0].clone();
        let submitted_at = parse_form_timestamp(&timestamp);
        submissions.push(Submission {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            date: date.to_string(),
            minutes,
            time_of_day: opt_cell(row.get(4)),
            thoughts: opt_cell(row.get(5)),
            share_consent: row
                .get(6)
                .map(|c| matches!(c.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1"))
                .unwrap_or(false),
            timestamp,
            submitted_at,
            source: EventSource::Sheets,
        });
    }

    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    submissions
}
