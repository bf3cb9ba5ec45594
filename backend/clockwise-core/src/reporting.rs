// src/reporting.rs
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error};

use crate::date_range::{format_display_date, working_days, DateRange, SeriesGranularity};
use crate::models::{ActivityType, TimesheetEntry, UserSettings};
use crate::validation::{calculate_duration_minutes, format_duration, TimeFormatError};

// --- Error Types ---

/// A stored row that validation should never have let through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Entry {entry_id} on {date} has a non-positive duration of {minutes} minutes")]
    NonPositiveDuration {
        entry_id: String,
        date: NaiveDate,
        minutes: i64,
    },
    #[error("Entry {entry_id} has an unreadable time: {source}")]
    UnreadableTime {
        entry_id: String,
        #[source]
        source: TimeFormatError,
    },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Buffer(String),
    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

// --- Durations ---

/// Same HH:MM conversion as validation. Never clamps.
pub fn entry_duration_minutes(entry: &TimesheetEntry) -> Result<i64, IntegrityError> {
    let minutes = calculate_duration_minutes(&entry.start_time, &entry.end_time).map_err(
        |source| IntegrityError::UnreadableTime {
            entry_id: entry.id.clone(),
            source,
        },
    )?;
    if minutes <= 0 {
        error!(
            "Integrity error: entry {} on {} spans {} minutes",
            entry.id, entry.entry_date, minutes
        );
        return Err(IntegrityError::NonPositiveDuration {
            entry_id: entry.id.clone(),
            date: entry.entry_date,
            minutes,
        });
    }
    Ok(minutes)
}

pub fn total_minutes(entries: &[TimesheetEntry]) -> Result<i64, IntegrityError> {
    entries.iter().map(entry_duration_minutes).sum()
}

pub fn minutes_to_hours(minutes: i64) -> Decimal {
    (Decimal::from(minutes) / dec!(60)).round_dp(2).normalize()
}

pub fn expected_hours(daily_target_minutes: i64, working_days: u32) -> Decimal {
    minutes_to_hours(daily_target_minutes * i64::from(working_days))
}

// --- Completion ---

/// Computed from whole minutes, never from rounded hours. `None` when
/// nothing was expected.
pub fn completion_rate(actual_minutes: i64, expected_minutes: i64) -> Option<f64> {
    if expected_minutes <= 0 {
        return None;
    }
    (Decimal::from(actual_minutes) * dec!(100) / Decimal::from(expected_minutes)).to_f64()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBand {
    ExceededTarget,
    OnTrack,
    BehindSchedule,
    Critical,
}

impl CompletionBand {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 100.0 {
            CompletionBand::ExceededTarget
        } else if rate >= 70.0 {
            CompletionBand::OnTrack
        } else if rate >= 50.0 {
            CompletionBand::BehindSchedule
        } else {
            CompletionBand::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CompletionBand::ExceededTarget => "Exceeded Target",
            CompletionBand::OnTrack => "On Track",
            CompletionBand::BehindSchedule => "Behind Schedule",
            CompletionBand::Critical => "Critical",
        }
    }
}

// --- Activity breakdown ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySlice {
    pub activity_type: ActivityType,
    pub label: &'static str,
    pub minutes: i64,
    pub hours: Decimal,
    pub percentage: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "slices", rename_all = "snake_case")]
pub enum ActivityBreakdown {
    /// Nothing logged; render the empty state instead of dividing by zero.
    Empty,
    Data(Vec<ActivitySlice>),
}

impl ActivityBreakdown {
    pub fn slices(&self) -> &[ActivitySlice] {
        match self {
            ActivityBreakdown::Empty => &[],
            ActivityBreakdown::Data(slices) => slices,
        }
    }
}

pub fn activity_breakdown(entries: &[TimesheetEntry]) -> Result<ActivityBreakdown, IntegrityError> {
    let mut per_type: BTreeMap<ActivityType, (i64, usize)> = BTreeMap::new();
    for entry in entries {
        let minutes = entry_duration_minutes(entry)?;
        let slot = per_type.entry(entry.activity_type).or_insert((0, 0));
        slot.0 += minutes;
        slot.1 += 1;
    }

    let total: i64 = per_type.values().map(|(m, _)| m).sum();
    if total == 0 {
        return Ok(ActivityBreakdown::Empty);
    }

    let mut slices: Vec<ActivitySlice> = per_type
        .into_iter()
        .map(|(activity_type, (minutes, count))| ActivitySlice {
            activity_type,
            label: activity_type.display_name(),
            minutes,
            hours: minutes_to_hours(minutes),
            percentage: minutes as f64 / total as f64 * 100.0,
            count,
        })
        .collect();
    // Largest first; the BTreeMap order breaks ties.
    slices.sort_by(|a, b| b.minutes.cmp(&a.minutes));
    Ok(ActivityBreakdown::Data(slices))
}

// --- Series ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub bucket_start: NaiveDate,
    pub label: String,
    pub minutes: i64,
    pub hours: Decimal,
}

/// One zero-filled point per bucket overlapping the range. Entries outside
/// the range are ignored.
pub fn hours_series(
    entries: &[TimesheetEntry],
    range: &DateRange,
    granularity: SeriesGranularity,
) -> Result<Vec<SeriesPoint>, IntegrityError> {
    let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut cursor = Some(granularity.bucket_start(range.start_date()));
    while let Some(start) = cursor {
        if start > range.end_date() {
            break;
        }
        buckets.insert(start, 0);
        cursor = granularity.next_bucket(start);
    }

    for entry in entries.iter().filter(|e| range.contains(e.entry_date)) {
        let minutes = entry_duration_minutes(entry)?;
        *buckets
            .entry(granularity.bucket_start(entry.entry_date))
            .or_insert(0) += minutes;
    }

    Ok(buckets
        .into_iter()
        .map(|(bucket_start, minutes)| SeriesPoint {
            bucket_start,
            label: granularity.label(bucket_start),
            minutes,
            hours: minutes_to_hours(minutes),
        })
        .collect())
}

// --- Summary ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub range: DateRange,
    pub granularity: SeriesGranularity,
    pub entry_count: usize,
    pub total_minutes: i64,
    pub total_hours: Decimal,
    pub total_display: String,
    pub working_days: u32,
    pub daily_target_minutes: i64,
    pub expected_hours: Decimal,
    pub completion_rate: Option<f64>,
    pub completion_band: Option<CompletionBand>,
    pub completion_label: Option<&'static str>,
    pub breakdown: ActivityBreakdown,
    pub series: Vec<SeriesPoint>,
}

pub fn build_report(
    entries: &[TimesheetEntry],
    range: DateRange,
    granularity: SeriesGranularity,
    settings: &UserSettings,
) -> Result<ReportSummary, IntegrityError> {
    let in_range: Vec<TimesheetEntry> = entries
        .iter()
        .filter(|e| range.contains(e.entry_date))
        .cloned()
        .collect();

    let total_minutes = total_minutes(&in_range)?;
    let total_hours = minutes_to_hours(total_minutes);
    let working_days = working_days(range.start_date(), range.end_date());
    let expected_minutes = settings.daily_target_minutes * i64::from(working_days);
    let expected_hours = expected_hours(settings.daily_target_minutes, working_days);
    let completion_rate = completion_rate(total_minutes, expected_minutes);
    let completion_band = completion_rate.map(CompletionBand::from_rate);

    debug!(
        "Report for {} ({} entries): {}h of {}h expected",
        settings.user_id,
        in_range.len(),
        total_hours,
        expected_hours
    );

    Ok(ReportSummary {
        range,
        granularity,
        entry_count: in_range.len(),
        total_minutes,
        total_hours,
        total_display: format_duration(total_minutes),
        working_days,
        daily_target_minutes: settings.daily_target_minutes,
        expected_hours,
        completion_rate,
        completion_band,
        completion_label: completion_band.map(CompletionBand::label),
        breakdown: activity_breakdown(&in_range)?,
        series: hours_series(&in_range, &range, granularity)?,
    })
}

// --- Export ---

pub fn report_to_csv(
    report: &ReportSummary,
    entries: &[TimesheetEntry],
) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record([
        "Date",
        "Start",
        "End",
        "Activity",
        "Subtype",
        "Status",
        "Duration",
    ])?;
    for entry in entries.iter().filter(|e| report.range.contains(e.entry_date)) {
        let minutes = entry_duration_minutes(entry)?;
        writer.write_record([
            format_display_date(entry.entry_date),
            entry.start_time.clone(),
            entry.end_time.clone(),
            entry.activity_type.display_name().to_string(),
            entry.activity_subtype.clone().unwrap_or_default(),
            entry.status.as_str().to_string(),
            format_duration(minutes),
        ])?;
    }

    writer.write_record([""])?;
    writer.write_record(["Activity", "Hours", "Percentage", "Entries"])?;
    for slice in report.breakdown.slices() {
        writer.write_record([
            slice.label.to_string(),
            slice.hours.to_string(),
            format!("{:.1}", slice.percentage),
            slice.count.to_string(),
        ])?;
    }

    writer.write_record([""])?;
    writer.write_record(["Total hours".to_string(), report.total_hours.to_string()])?;
    writer.write_record(["Expected hours".to_string(), report.expected_hours.to_string()])?;
    writer.write_record([
        "Completion".to_string(),
        match (report.completion_rate, report.completion_label) {
            (Some(rate), Some(label)) => format!("{:.1}% ({})", rate, label),
            _ => "n/a".to_string(),
        },
    ])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
