//! Next-occurrence arithmetic for recurring tasks.
//!
//! The base instant is the source task's due time when it has one,
//! otherwise the completion instant. Monthly steps keep the original
//! day-of-month as the anchor and clamp to the last day of shorter months
//! (Jan 31 → Feb 28/29), so repeated advances do not drift earlier.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::task::Recurrence;

/// Computed schedule for a successor task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NextOccurrence {
    pub due_at: DateTime<Utc>,
    pub remind_at: Option<DateTime<Utc>>,
}

/// Compute the successor schedule, or `None` for non-recurring tasks.
///
/// The returned due time is strictly after `now`: a task completed long
/// past its due date advances by whole increments until it lands in the
/// future, instead of creating a backlog of stale occurrences.
pub fn next_occurrence(
    recurrence: Recurrence,
    due_at: Option<DateTime<Utc>>,
    remind_at: Option<DateTime<Utc>>,
    completed_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<NextOccurrence> {
    if !recurrence.is_recurring() {
        return None;
    }

    let base = due_at.unwrap_or(completed_at);
    let anchor_day = base.day();

    let mut steps: u32 = 1;
    let mut next = advance(base, recurrence, steps, anchor_day);
    while next <= now {
        steps += 1;
        next = advance(base, recurrence, steps, anchor_day);
    }

    // Preserve the reminder lead time relative to the due date.
    let next_remind_at = match (remind_at, due_at) {
        (Some(remind), Some(due)) => Some(next - (due - remind)),
        _ => None,
    };

    Some(NextOccurrence {
        due_at: next,
        remind_at: next_remind_at,
    })
}

fn advance(base: DateTime<Utc>, recurrence: Recurrence, steps: u32, anchor_day: u32) -> DateTime<Utc> {
    match recurrence {
        Recurrence::None => base,
        Recurrence::Daily => base + Duration::days(i64::from(steps)),
        Recurrence::Weekly => base + Duration::days(7 * i64::from(steps)),
        Recurrence::Monthly => add_months(base, steps, anchor_day),
    }
}

/// Add `months` to `base`, anchored on `anchor_day`, clamping to the last
/// day of the target month. Time-of-day is preserved.
fn add_months(base: DateTime<Utc>, months: u32, anchor_day: u32) -> DateTime<Utc> {
    let zero_based = base.month0() + months;
    let year = base.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    let day = anchor_day.min(days_in_month(year, month));

    Utc.with_ymd_and_hms(
        year,
        month,
        day,
        base.hour(),
        base.minute(),
        base.second(),
    )
    .single()
    // Every clamped Y-M-D H:M:S is a valid UTC instant.
    .unwrap_or(base)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
    }
}
