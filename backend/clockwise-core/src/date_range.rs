// src/date_range.rs
use chrono::{Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

static DISPLAY_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap());
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    pub fn for_days(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: start_of_day(from),
            to: end_of_day(to),
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.from.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.to.date()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

// --- Boundary functions ---

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    // 23:59:59.999 always exists
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

/// Monday of the ISO week containing `date`, whatever the locale.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    start_of_week(date) + Days::new(6)
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let first = start_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

// --- Dashboard periods ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePeriod {
    Today,
    Week,
    Month,
    Custom {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl DatePeriod {
    pub fn parse(key: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<Self> {
        match key {
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "custom" => Some(Self::Custom { from, to }),
            _ => None,
        }
    }

    pub fn range(self, today: NaiveDate) -> DateRange {
        match self {
            DatePeriod::Today => DateRange::for_days(today, today),
            DatePeriod::Week => DateRange::for_days(start_of_week(today), end_of_week(today)),
            DatePeriod::Month => DateRange::for_days(start_of_month(today), end_of_month(today)),
            DatePeriod::Custom {
                from: Some(from),
                to: Some(to),
            } => DateRange::for_days(from, to),
            DatePeriod::Custom { .. } => DatePeriod::Today.range(today),
        }
    }
}

// --- Report presets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPreset {
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    Custom {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl ReportPreset {
    pub fn parse(key: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<Self> {
        match key {
            "week" | "thisWeek" | "this_week" => Some(Self::ThisWeek),
            "lastWeek" | "last_week" => Some(Self::LastWeek),
            "month" | "thisMonth" | "this_month" => Some(Self::ThisMonth),
            "lastMonth" | "last_month" => Some(Self::LastMonth),
            "custom" => Some(Self::Custom { from, to }),
            _ => None,
        }
    }

    pub fn range(self, today: NaiveDate) -> DateRange {
        match self {
            ReportPreset::ThisWeek => DatePeriod::Week.range(today),
            ReportPreset::LastWeek => DatePeriod::Week.range(today - Days::new(7)),
            ReportPreset::ThisMonth => DatePeriod::Month.range(today),
            ReportPreset::LastMonth => {
                let shifted = today.checked_sub_months(Months::new(1)).unwrap_or(today);
                DatePeriod::Month.range(shifted)
            }
            ReportPreset::Custom { from, to } => DatePeriod::Custom { from, to }.range(today),
        }
    }
}

// --- Series buckets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesGranularity {
    Daily,
    Weekly,
    Monthly,
}

impl SeriesGranularity {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            SeriesGranularity::Daily => date,
            SeriesGranularity::Weekly => start_of_week(date),
            SeriesGranularity::Monthly => start_of_month(date),
        }
    }

    pub fn next_bucket(self, bucket_start: NaiveDate) -> Option<NaiveDate> {
        match self {
            SeriesGranularity::Daily => bucket_start.checked_add_days(Days::new(1)),
            SeriesGranularity::Weekly => bucket_start.checked_add_days(Days::new(7)),
            SeriesGranularity::Monthly => bucket_start.checked_add_months(Months::new(1)),
        }
    }

    pub fn label(self, bucket_start: NaiveDate) -> String {
        match self {
            SeriesGranularity::Daily => bucket_start.format("%a %d/%m").to_string(),
            SeriesGranularity::Weekly => format!("Week of {}", bucket_start.format("%d/%m")),
            SeriesGranularity::Monthly => bucket_start.format("%b %Y").to_string(),
        }
    }
}

/// Monday to Friday inclusive of both ends; 0 when `to` precedes `from`.
pub fn working_days(from: NaiveDate, to: NaiveDate) -> u32 {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| d.weekday().num_days_from_monday() < 5)
        .count() as u32
}

// --- Display format ---

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// `DD/MM/YYYY` only, zero-padded, and the day must exist in that month.
pub fn parse_display_date(display: &str) -> Option<NaiveDate> {
    if !DISPLAY_DATE_RE.is_match(display) {
        return None;
    }
    NaiveDate::parse_from_str(display, DISPLAY_DATE_FORMAT).ok()
}

pub fn is_valid_display_date(display: &str) -> bool {
    parse_display_date(display).is_some()
}

pub fn parse_iso_date(iso: &str) -> Option<NaiveDate> {
    if !ISO_DATE_RE.is_match(iso) {
        return None;
    }
    NaiveDate::parse_from_str(iso, ISO_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Weekday};

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, ISO_DATE_FORMAT)
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    #[test]
    fn week_always_runs_monday_to_sunday() {
        // 2024-03-04 is a Monday; walk a full week plus the days either side.
        let mut day = d("2024-03-02");
        while day <= d("2024-03-12") {
            let range = DatePeriod::Week.range(day);
            assert_eq!(range.start_date().weekday(), Weekday::Mon, "from for {}", day);
            assert_eq!(range.end_date().weekday(), Weekday::Sun, "to for {}", day);
            assert!(range.contains(day));
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn sunday_belongs_to_the_week_before() {
        let range = DatePeriod::Week.range(d("2024-03-10"));
        assert_eq!(range.start_date(), d("2024-03-04"));
        assert_eq!(range.end_date(), d("2024-03-10"));
    }

    #[test]
    fn today_spans_the_whole_day() {
        let range = DatePeriod::Today.range(d("2024-03-05"));
        assert_eq!(range.from, d("2024-03-05").and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(range.to.date(), d("2024-03-05"));
        assert_eq!((range.to.hour(), range.to.minute(), range.to.second()), (23, 59, 59));
    }

    #[test]
    fn month_handles_leap_february() {
        let range = DatePeriod::Month.range(d("2024-02-14"));
        assert_eq!(range.start_date(), d("2024-02-01"));
        assert_eq!(range.end_date(), d("2024-02-29"));
        let range = DatePeriod::Month.range(d("2023-12-31"));
        assert_eq!(range.end_date(), d("2023-12-31"));
    }

    #[test]
    fn custom_falls_back_to_today_when_a_bound_is_missing() {
        let today = d("2024-03-05");
        let partial = DatePeriod::Custom {
            from: Some(d("2024-01-01")),
            to: None,
        };
        assert_eq!(partial.range(today), DatePeriod::Today.range(today));
        let full = DatePeriod::Custom {
            from: Some(d("2024-01-01")),
            to: Some(d("2024-01-31")),
        };
        assert_eq!(full.range(today).start_date(), d("2024-01-01"));
        assert_eq!(full.range(today).end_date(), d("2024-01-31"));
    }

    #[test]
    fn last_presets_shift_back_one_unit() {
        let today = d("2024-03-06");
        let last_week = ReportPreset::LastWeek.range(today);
        assert_eq!(last_week.start_date(), d("2024-02-26"));
        assert_eq!(last_week.end_date(), d("2024-03-03"));

        let last_month = ReportPreset::LastMonth.range(d("2024-03-31"));
        assert_eq!(last_month.start_date(), d("2024-02-01"));
        assert_eq!(last_month.end_date(), d("2024-02-29"));

        let january = ReportPreset::LastMonth.range(d("2024-01-15"));
        assert_eq!(january.start_date(), d("2023-12-01"));
    }

    #[test]
    fn working_days_skip_weekends() {
        assert_eq!(working_days(d("2024-03-04"), d("2024-03-10")), 5);
        assert_eq!(working_days(d("2024-03-09"), d("2024-03-10")), 0);
        assert_eq!(working_days(d("2024-02-01"), d("2024-02-29")), 21);
        assert_eq!(working_days(d("2024-03-10"), d("2024-03-04")), 0);
    }

    #[test]
    fn series_buckets() {
        assert_eq!(SeriesGranularity::Weekly.bucket_start(d("2024-03-07")), d("2024-03-04"));
        assert_eq!(SeriesGranularity::Monthly.bucket_start(d("2024-03-07")), d("2024-03-01"));
        assert_eq!(
            SeriesGranularity::Monthly.next_bucket(d("2024-01-01")),
            Some(d("2024-02-01"))
        );
        assert_eq!(SeriesGranularity::Monthly.label(d("2024-03-01")), "Mar 2024");
    }

    #[test]
    fn display_dates_are_calendar_checked() {
        assert!(!is_valid_display_date("31/02/2024"));
        assert!(is_valid_display_date("29/02/2024"));
        assert!(!is_valid_display_date("29/02/2023"));
        assert!(!is_valid_display_date("1/2/2024"));
        assert!(!is_valid_display_date("2024-02-01"));
    }

    #[test]
    fn display_round_trip() {
        for iso in ["2024-02-29", "1999-12-31", "2000-01-01", "2026-10-19"] {
            let date = parse_iso_date(iso).unwrap();
            let display = format_display_date(date);
            assert_eq!(parse_display_date(&display), Some(date));
            assert_eq!(date.format(ISO_DATE_FORMAT).to_string(), iso);
        }
        assert_eq!(format_display_date(d("2024-03-05")), "05/03/2024");
        assert_eq!(parse_iso_date("2024-3-5"), None);
        assert_eq!(parse_iso_date("2023-02-29"), None);
    }
}
