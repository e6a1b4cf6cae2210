//! Natural-language date resolution at the agent boundary.
//!
//! Expressions the model passes through verbatim ("tomorrow", "next
//! Friday", "in 3 days", "Jan 15", "tomorrow at 9am") resolve against an
//! explicit `now` so parsing is deterministic and testable. Everything is
//! interpreted in UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use regex::Regex;
use std::sync::OnceLock;

use quill_core::CoreError;

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    match name {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

macro_rules! cached_regex {
    ($pattern:expr) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new($pattern).expect("pattern compiles"))
    }};
}

/// Resolve a natural-language date expression to a UTC instant.
pub fn parse_natural_date(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("date expression must not be empty"));
    }

    parse_with_time(trimmed, now)
        .or_else(|| parse_relative(trimmed, now))
        .or_else(|| parse_weekday(trimmed, now))
        .or_else(|| parse_absolute(trimmed, now))
        .ok_or_else(|| {
            CoreError::validation(format!(
                "could not understand '{trimmed}' as a date; try 'tomorrow', 'next Friday', or '2025-01-15'"
            ))
        })
}

/// Resolve a reminder expression. Relative forms like "1 hour before"
/// subtract from the task's due date and require one.
pub fn parse_reminder(
    text: &str,
    now: DateTime<Utc>,
    due_at: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = text.trim().to_lowercase();
    let before =
        cached_regex!(r"^(\d+)\s+(minute|minutes|hour|hours|day|days)\s+before$");

    if let Some(caps) = before.captures(&trimmed) {
        let amount: i64 = caps[1].parse().map_err(|_| {
            CoreError::validation(format!("could not understand '{text}' as a reminder"))
        })?;
        let offset = match &caps[2] {
            unit if unit.starts_with("minute") => Duration::minutes(amount),
            unit if unit.starts_with("hour") => Duration::hours(amount),
            _ => Duration::days(amount),
        };
        let due = due_at.ok_or_else(|| {
            CoreError::validation(
                "cannot set a relative reminder because the task has no due date; \
                 set a due date first or use an absolute time like 'tomorrow at 9am'",
            )
        })?;
        return Ok(due - offset);
    }

    parse_natural_date(text, now)
}

fn parse_relative(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = text.to_lowercase();

    match lower.as_str() {
        "today" | "now" => return Some(now),
        "tomorrow" => return Some(now + Duration::days(1)),
        "yesterday" => return Some(now - Duration::days(1)),
        "next week" => return Some(now + Duration::weeks(1)),
        "next month" => return Some(now + Duration::days(30)),
        "this week" => {
            let since_monday = now.weekday().num_days_from_monday() as i64;
            return Some(now - Duration::days(since_monday));
        }
        _ => {}
    }

    let in_pattern = cached_regex!(r"^in\s+(\d+)\s+(day|days|week|weeks|month|months)$");
    if let Some(caps) = in_pattern.captures(&lower) {
        let amount: i64 = caps[1].parse().ok()?;
        return Some(match &caps[2] {
            unit if unit.starts_with("day") => now + Duration::days(amount),
            unit if unit.starts_with("week") => now + Duration::weeks(amount),
            _ => now + Duration::days(amount * 30),
        });
    }

    let ago_pattern = cached_regex!(r"^(\d+)\s+(day|days|week|weeks|month|months)\s+ago$");
    if let Some(caps) = ago_pattern.captures(&lower) {
        let amount: i64 = caps[1].parse().ok()?;
        return Some(match &caps[2] {
            unit if unit.starts_with("day") => now - Duration::days(amount),
            unit if unit.starts_with("week") => now - Duration::weeks(amount),
            _ => now - Duration::days(amount * 30),
        });
    }

    None
}

fn parse_weekday(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = text.to_lowercase();
    let pattern = cached_regex!(
        r"^(?:(next|this|on)\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)$"
    );
    let caps = pattern.captures(&lower)?;
    let target = weekday_from_name(&caps[2])?;
    let qualifier = caps.get(1).map(|m| m.as_str());

    let current = now.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let diff = wanted - current;

    let days_ahead = match qualifier {
        // "next Friday" is always a future occurrence, never today.
        Some("next") => {
            if diff <= 0 {
                diff + 7
            } else {
                diff
            }
        }
        // "this Friday" is this calendar week's occurrence, even if past.
        Some("this") => diff,
        // "on Friday" / bare "friday": next occurrence, today included.
        _ => {
            if diff < 0 {
                diff + 7
            } else {
                diff
            }
        }
    };

    Some(now + Duration::days(days_ahead))
}

fn parse_absolute(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();

    let iso = cached_regex!(r"^(\d{4})-(\d{1,2})-(\d{1,2})$");
    if let Some(caps) = iso.captures(trimmed) {
        return date_at_midnight(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }

    let us = cached_regex!(r"^(\d{1,2})/(\d{1,2})/(\d{4})$");
    if let Some(caps) = us.captures(trimmed) {
        return date_at_midnight(
            caps[3].parse().ok()?,
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
        );
    }

    let lower = trimmed.to_lowercase();

    // "January 15, 2025" / "Jan 15 2025"
    let mdy = cached_regex!(r"^([a-z]+)\s+(\d{1,2}),?\s+(\d{4})$");
    if let Some(caps) = mdy.captures(&lower) {
        let month = month_from_name(&caps[1])?;
        return date_at_midnight(caps[3].parse().ok()?, month, caps[2].parse().ok()?);
    }

    // "15 January 2025"
    let dmy = cached_regex!(r"^(\d{1,2})\s+([a-z]+)\s+(\d{4})$");
    if let Some(caps) = dmy.captures(&lower) {
        let month = month_from_name(&caps[2])?;
        return date_at_midnight(caps[3].parse().ok()?, month, caps[1].parse().ok()?);
    }

    // "Jan 15": current year, rolling to next year if already past.
    let md = cached_regex!(r"^([a-z]+)\s+(\d{1,2})$");
    if let Some(caps) = md.captures(&lower) {
        let month = month_from_name(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let this_year = date_at_midnight(now.year(), month, day)?;
        if this_year < now {
            return date_at_midnight(now.year() + 1, month, day);
        }
        return Some(this_year);
    }

    None
}

fn parse_with_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();

    let iso_dt = cached_regex!(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})[T\s](\d{1,2}):(\d{2})(?::(\d{2}))?(?:Z|\+00:00)?$"
    );
    if let Some(caps) = iso_dt.captures(trimmed) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?;
        let second: u32 = caps.get(6).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let time = date.and_hms_opt(caps[4].parse().ok()?, caps[5].parse().ok()?, second)?;
        return Utc.from_local_datetime(&time).single();
    }

    // "<date> at 3pm" / "<date> at 14:30"
    let at_time = cached_regex!(r"^(.+?)\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$");
    let lower = trimmed.to_lowercase();
    if let Some(caps) = at_time.captures(&lower) {
        let date_part = caps[1].trim();
        let mut hour: u32 = caps[2].parse().ok()?;
        let minute: u32 = caps.get(3).map_or(0, |m| m.as_str().parse().unwrap_or(0));
        match caps.get(4).map(|m| m.as_str()) {
            Some("pm") if hour != 12 => hour += 12,
            Some("am") if hour == 12 => hour = 0,
            _ => {}
        }
        if hour > 23 || minute > 59 {
            return None;
        }

        let base = parse_relative(date_part, now)
            .or_else(|| parse_weekday(date_part, now))
            .or_else(|| parse_absolute(date_part, now))?;
        return base
            .with_hour(hour)
            .and_then(|dt| dt.with_minute(minute))
            .and_then(|dt| dt.with_second(0))
            .and_then(|dt| dt.with_nanosecond(0));
    }

    None
}

fn date_at_midnight(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday 2025-06-11 15:30 UTC.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 15, 30, 0).unwrap()
    }

    fn date_of(result: DateTime<Utc>) -> (i32, u32, u32) {
        (result.year(), result.month(), result.day())
    }

    #[test]
    fn today_and_tomorrow() {
        assert_eq!(parse_natural_date("today", now()).unwrap(), now());
        assert_eq!(
            date_of(parse_natural_date("tomorrow", now()).unwrap()),
            (2025, 6, 12)
        );
        assert_eq!(
            date_of(parse_natural_date("Tomorrow", now()).unwrap()),
            (2025, 6, 12)
        );
    }

    #[test]
    fn in_n_units() {
        assert_eq!(
            date_of(parse_natural_date("in 3 days", now()).unwrap()),
            (2025, 6, 14)
        );
        assert_eq!(
            date_of(parse_natural_date("in 2 weeks", now()).unwrap()),
            (2025, 6, 25)
        );
        assert_eq!(
            date_of(parse_natural_date("in 1 month", now()).unwrap()),
            (2025, 7, 11)
        );
    }

    #[test]
    fn next_weekday_is_strictly_future() {
        // "now" is a Wednesday; next Wednesday is a week out.
        let next_wed = parse_natural_date("next Wednesday", now()).unwrap();
        assert_eq!(date_of(next_wed), (2025, 6, 18));

        let next_fri = parse_natural_date("next Friday", now()).unwrap();
        assert_eq!(date_of(next_fri), (2025, 6, 13));
    }

    #[test]
    fn bare_weekday_includes_today() {
        let wednesday = parse_natural_date("wednesday", now()).unwrap();
        assert_eq!(date_of(wednesday), (2025, 6, 11));

        let monday = parse_natural_date("on monday", now()).unwrap();
        assert_eq!(date_of(monday), (2025, 6, 16));
    }

    #[test]
    fn this_weekday_stays_in_week() {
        // "this monday" already passed; stays in the current week.
        let monday = parse_natural_date("this monday", now()).unwrap();
        assert_eq!(date_of(monday), (2025, 6, 9));
    }

    #[test]
    fn absolute_formats() {
        assert_eq!(
            date_of(parse_natural_date("2025-01-15", now()).unwrap()),
            (2025, 1, 15)
        );
        assert_eq!(
            date_of(parse_natural_date("1/15/2026", now()).unwrap()),
            (2026, 1, 15)
        );
        assert_eq!(
            date_of(parse_natural_date("January 15, 2026", now()).unwrap()),
            (2026, 1, 15)
        );
        assert_eq!(
            date_of(parse_natural_date("15 January 2026", now()).unwrap()),
            (2026, 1, 15)
        );
    }

    #[test]
    fn bare_month_day_prefers_future() {
        // "Jan 15" already passed in 2025, so it rolls to 2026.
        assert_eq!(
            date_of(parse_natural_date("Jan 15", now()).unwrap()),
            (2026, 1, 15)
        );
        // "Dec 1" is still ahead.
        assert_eq!(
            date_of(parse_natural_date("Dec 1", now()).unwrap()),
            (2025, 12, 1)
        );
    }

    #[test]
    fn time_suffixes() {
        let at_3pm = parse_natural_date("tomorrow at 3pm", now()).unwrap();
        assert_eq!(date_of(at_3pm), (2025, 6, 12));
        assert_eq!((at_3pm.hour(), at_3pm.minute()), (15, 0));

        let at_930 = parse_natural_date("monday at 9:30am", now()).unwrap();
        assert_eq!((at_930.hour(), at_930.minute()), (9, 30));

        let midnight = parse_natural_date("tomorrow at 12am", now()).unwrap();
        assert_eq!(midnight.hour(), 0);

        let iso_dt = parse_natural_date("2025-07-01 14:30", now()).unwrap();
        assert_eq!(date_of(iso_dt), (2025, 7, 1));
        assert_eq!((iso_dt.hour(), iso_dt.minute()), (14, 30));
    }

    #[test]
    fn invalid_dates_rejected() {
        assert!(parse_natural_date("", now()).is_err());
        assert!(parse_natural_date("someday", now()).is_err());
        assert!(parse_natural_date("2025-02-30", now()).is_err());
        assert!(parse_natural_date("13/45/2025", now()).is_err());
    }

    #[test]
    fn error_is_a_validation_kind() {
        let err = parse_natural_date("gibberish", now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("gibberish"));
    }

    #[test]
    fn reminder_relative_to_due_date() {
        let due = Utc.with_ymd_and_hms(2025, 6, 20, 9, 0, 0).unwrap();
        let remind = parse_reminder("1 hour before", now(), Some(due)).unwrap();
        assert_eq!(remind, due - Duration::hours(1));

        let remind = parse_reminder("30 minutes before", now(), Some(due)).unwrap();
        assert_eq!(remind, due - Duration::minutes(30));

        let remind = parse_reminder("2 days before", now(), Some(due)).unwrap();
        assert_eq!(remind, due - Duration::days(2));
    }

    #[test]
    fn relative_reminder_without_due_date_is_validation_error() {
        let err = parse_reminder("1 hour before", now(), None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("due date"));
    }

    #[test]
    fn absolute_reminder_ignores_due_date() {
        let remind = parse_reminder("tomorrow at 9am", now(), None).unwrap();
        assert_eq!(date_of(remind), (2025, 6, 12));
        assert_eq!(remind.hour(), 9);
    }
}
