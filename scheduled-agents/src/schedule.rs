//! Next-run computation
//!
//! Schedules are interpreted in a fixed UTC offset (default +7). Daily
//! schedules carry an "HH:MM" time, weekly ones a day-of-week digit
//! (0 = Monday) and fire at 09:00.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Hour weekly schedules fire at
const WEEKLY_RUN_HOUR: u32 = 9;

/// An agent's recurrence rule, stored as two flat fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "schedule")]
    pub kind: ScheduleKind,

    /// "HH:MM" for daily, "0".."6" for weekly (0 = Monday)
    #[serde(rename = "schedule_time")]
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Daily,
    Weekly,
}

impl Schedule {
    pub fn daily(time: &str) -> Self {
        Self {
            kind: ScheduleKind::Daily,
            time: time.to_string(),
        }
    }

    pub fn weekly(day: u32) -> Self {
        Self {
            kind: ScheduleKind::Weekly,
            time: day.to_string(),
        }
    }

    /// Validate the time field against the schedule kind.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            ScheduleKind::Daily => parse_hhmm(&self.time).map(|_| ()),
            ScheduleKind::Weekly => parse_weekday(&self.time).map(|_| ()),
        }
    }

    /// The next instant this schedule fires, strictly after `now` for
    /// daily schedules and on the requested weekday for weekly ones.
    pub fn next_run(&self, now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
        match self.kind {
            ScheduleKind::Daily => {
                let (hour, minute) = parse_hhmm(&self.time)?;
                let today = now
                    .date_naive()
                    .and_hms_opt(hour, minute, 0)
                    .ok_or_else(|| anyhow!("Invalid schedule time: {}", self.time))?;
                let mut next = local_datetime(now.offset(), today)?;
                if next <= now {
                    next = next + Duration::days(1);
                }
                Ok(next)
            }
            ScheduleKind::Weekly => {
                let target_day = parse_weekday(&self.time)?;
                let mut days_ahead =
                    target_day as i64 - now.weekday().num_days_from_monday() as i64;
                if days_ahead <= 0 {
                    days_ahead += 7;
                }
                let date = (now + Duration::days(days_ahead)).date_naive();
                let at = date
                    .and_hms_opt(WEEKLY_RUN_HOUR, 0, 0)
                    .ok_or_else(|| anyhow!("Invalid weekly run time"))?;
                local_datetime(now.offset(), at)
            }
        }
    }
}

/// The fixed offset all schedules are interpreted in.
pub fn zone_offset(utc_offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

/// Current wall-clock time in the schedule zone.
pub fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

fn local_datetime(
    offset: &FixedOffset,
    naive: chrono::NaiveDateTime,
) -> Result<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| anyhow!("Ambiguous local datetime"))
}

fn parse_hhmm(time: &str) -> Result<(u32, u32)> {
    let (hour, minute) = time
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected HH:MM, got '{time}'"))?;
    let hour: u32 = hour.parse()?;
    let minute: u32 = minute.parse()?;
    if hour > 23 || minute > 59 {
        return Err(anyhow!("Time out of range: '{time}'"));
    }
    Ok((hour, minute))
}

fn parse_weekday(time: &str) -> Result<u32> {
    let day: u32 = time
        .parse()
        .map_err(|_| anyhow!("Expected day of week 0-6, got '{time}'"))?;
    if day > 6 {
        return Err(anyhow!("Day of week out of range: '{time}'"));
    }
    Ok(day)
}
