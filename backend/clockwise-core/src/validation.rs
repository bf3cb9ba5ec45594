// src/validation.rs
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date_range::is_valid_display_date;
use crate::models::{ActivityType, ALL_ACTIVITY_TYPES};

pub const MAX_SUBTYPE_CHARS: usize = 100;
pub const MAX_NOTES_CHARS: usize = 1000;
pub const MAX_ORGANIZATION_CODE_CHARS: usize = 10;

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static HH_MM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());
static ORG_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_-]+$").unwrap());

// --- Error Types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", summarize(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn field(&self, name: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid time '{0}', expected HH:MM")]
pub struct TimeFormatError(pub String);

// --- Time arithmetic shared with reporting ---

/// Minutes since midnight for `HH:MM` (a trailing `:SS`, as time columns
/// return it, is ignored).
pub fn time_to_minutes(time: &str) -> Result<i64, TimeFormatError> {
    let mut parts = time.trim().split(':');
    let hours = parts.next().and_then(|h| h.parse::<i64>().ok());
    let minutes = parts.next().and_then(|m| m.parse::<i64>().ok());
    match (hours, minutes) {
        (Some(h), Some(m)) if (0..24).contains(&h) && (0..60).contains(&m) => Ok(h * 60 + m),
        _ => Err(TimeFormatError(time.to_string())),
    }
}

/// `end - start` in minutes. Zero or negative means the pair never passed
/// validation.
pub fn calculate_duration_minutes(start: &str, end: &str) -> Result<i64, TimeFormatError> {
    Ok(time_to_minutes(end)? - time_to_minutes(start)?)
}

pub fn format_duration(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    let (h, m) = (minutes / 60, minutes % 60);
    match (h, m) {
        (0, m) => format!("{}{}m", sign, m),
        (h, 0) => format!("{}{}h", sign, h),
        (h, m) => format!("{}{}h {}m", sign, h, m),
    }
}

// --- Timesheet entries ---

/// Entry payload as submitted by a client, before any checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimesheetEntryInput {
    pub entry_date: String,
    pub start_time: String,
    pub end_time: String,
    pub activity_type: String,
    #[serde(default)]
    pub activity_subtype: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    pub entry_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub activity_type: ActivityType,
    pub activity_subtype: Option<String>,
    pub notes: Option<String>,
    pub duration_minutes: i64,
}

pub fn validate_entry(input: &TimesheetEntryInput) -> Result<ValidatedEntry, ValidationErrors> {
    let mut errors = Vec::new();

    let entry_date = if ISO_DATE_RE.is_match(&input.entry_date) {
        match NaiveDate::parse_from_str(&input.entry_date, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError::new("entry_date", "Date does not exist"));
                None
            }
        }
    } else if is_valid_display_date(&input.entry_date) {
        errors.push(FieldError::new(
            "entry_date",
            "Date must be in YYYY-MM-DD format, not DD/MM/YYYY",
        ));
        None
    } else {
        errors.push(FieldError::new("entry_date", "Date must be in YYYY-MM-DD format"));
        None
    };

    let start_ok = HH_MM_RE.is_match(&input.start_time);
    if !start_ok {
        errors.push(FieldError::new("start_time", "Time must be in HH:MM format"));
    }
    let end_ok = HH_MM_RE.is_match(&input.end_time);
    if !end_ok {
        errors.push(FieldError::new("end_time", "Time must be in HH:MM format"));
    }

    let activity_type = ActivityType::parse(&input.activity_type);
    if activity_type.is_none() {
        let allowed: Vec<&str> = ALL_ACTIVITY_TYPES.iter().map(|t| t.as_str()).collect();
        errors.push(FieldError::new(
            "activity_type",
            format!("Activity type must be one of: {}", allowed.join(", ")),
        ));
    }

    let activity_subtype = normalize_optional(&input.activity_subtype);
    if let Some(subtype) = &activity_subtype {
        if subtype.chars().count() > MAX_SUBTYPE_CHARS {
            errors.push(FieldError::new(
                "activity_subtype",
                format!("Must be at most {} characters", MAX_SUBTYPE_CHARS),
            ));
        }
    }

    let notes = normalize_optional(&input.notes);
    if let Some(notes) = &notes {
        if notes.chars().count() > MAX_NOTES_CHARS {
            errors.push(FieldError::new(
                "notes",
                format!("Must be at most {} characters", MAX_NOTES_CHARS),
            ));
        }
    }

    // Ordering is only meaningful once both times parse.
    let mut duration_minutes = 0;
    if start_ok && end_ok {
        match calculate_duration_minutes(&input.start_time, &input.end_time) {
            Ok(d) if d > 0 => duration_minutes = d,
            Ok(_) => errors.push(FieldError::new("end_time", "End time must be after start time")),
            Err(e) => errors.push(FieldError::new("end_time", e.to_string())),
        }
    }

    match (entry_date, activity_type) {
        (Some(entry_date), Some(activity_type)) if errors.is_empty() => Ok(ValidatedEntry {
            entry_date,
            start_time: input.start_time.clone(),
            end_time: input.end_time.clone(),
            activity_type,
            activity_subtype,
            notes,
            duration_minutes,
        }),
        _ => Err(ValidationErrors(errors)),
    }
}

fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

// --- Organization settings ---

pub fn validate_organization_code(code: &str) -> Result<(), FieldError> {
    if code.is_empty() {
        return Err(FieldError::new("code", "Code is required"));
    }
    if code.chars().count() > MAX_ORGANIZATION_CODE_CHARS {
        return Err(FieldError::new(
            "code",
            format!("Code must be at most {} characters", MAX_ORGANIZATION_CODE_CHARS),
        ));
    }
    if !ORG_CODE_RE.is_match(code) {
        return Err(FieldError::new(
            "code",
            "Code may only contain uppercase letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrganizationInput {
    pub name: String,
    pub code: String,
}

pub fn validate_organization_input(input: &OrganizationInput) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if input.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if let Err(e) = validate_organization_code(&input.code) {
        errors.push(e);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}
