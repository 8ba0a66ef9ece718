//! Time utilities: timezone-aware deadlines and quiet-hours math.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::profile::QuietHours;

/// Parse a deadline like "2026-04-20 23:59" in an IANA tz like
/// "America/Chicago", returning UTC.
pub fn parse_local_deadline_to_utc(local: &str, tz: &str) -> Result<DateTime<Utc>> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;

    let ndt = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M")
        .map_err(|e| anyhow::anyhow!("invalid local datetime '{local}': {e}"))?;

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {local} {tz}"))?;

    Ok(local_dt.with_timezone(&Utc))
}

pub fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| anyhow::anyhow!("invalid HH:MM time '{s}': {e}"))
}

/// Whether `at` falls inside the quiet window in the user's local time.
/// The start bound is inclusive, the end bound exclusive; windows may wrap
/// midnight.
pub fn in_quiet_hours(at: DateTime<Utc>, tz: Tz, quiet: &QuietHours) -> Result<bool> {
    let start = parse_hhmm(&quiet.start)?;
    let end = parse_hhmm(&quiet.end)?;
    let local = at.with_timezone(&tz).time();

    Ok(if start <= end {
        local >= start && local < end
    } else {
        local >= start || local < end
    })
}

/// First quiet-window end strictly after `at`.
pub fn next_quiet_end(at: DateTime<Utc>, tz: Tz, quiet: &QuietHours) -> Result<DateTime<Utc>> {
    let end = parse_hhmm(&quiet.end)?;
    let local = at.with_timezone(&tz);

    for day_offset in 0..=1 {
        let date = local.date_naive() + Duration::days(day_offset);
        let candidate = match tz.from_local_datetime(&date.and_time(end)).earliest() {
            Some(dt) => dt.with_timezone(&Utc),
            None => continue,
        };
        if candidate > at {
            return Ok(candidate);
        }
    }

    anyhow::bail!("no quiet-hours end after {} in {}", at.to_rfc3339(), tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chicago() -> Tz {
        "America/Chicago".parse().unwrap()
    }

    #[test]
    fn test_parse_chicago_deadline() {
        // Feb is CST (UTC-6)
        let utc = parse_local_deadline_to_utc("2026-02-20 23:59", "America/Chicago").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-02-21T05:59:00+00:00");
    }

    #[test]
    fn test_quiet_hours_wrapping_window() {
        let quiet = QuietHours::new("22:00", "08:00");
        // 2026-03-02 13:00 UTC = 07:00 CST, inside the wrapped window.
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap();
        assert!(in_quiet_hours(at, chicago(), &quiet).unwrap());

        // 14:00 UTC = 08:00 CST, end bound is exclusive.
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        assert!(!in_quiet_hours(at, chicago(), &quiet).unwrap());
    }

    #[test]
    fn test_quiet_hours_non_wrapping_window() {
        let quiet = QuietHours::new("12:00", "13:00");
        let inside = Utc.with_ymd_and_hms(2026, 3, 2, 18, 30, 0).unwrap(); // 12:30 CST
        let outside = Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap(); // 14:00 CST
        assert!(in_quiet_hours(inside, chicago(), &quiet).unwrap());
        assert!(!in_quiet_hours(outside, chicago(), &quiet).unwrap());
    }

    #[test]
    fn test_next_quiet_end_same_morning() {
        let quiet = QuietHours::new("22:00", "08:00");
        // 07:00 CST -> next end is 08:00 CST = 14:00 UTC.
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap();
        let end = next_quiet_end(at, chicago(), &quiet).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_next_quiet_end_rolls_to_tomorrow() {
        let quiet = QuietHours::new("22:00", "08:00");
        // 23:00 CST -> next end is 08:00 CST tomorrow.
        let at = Utc.with_ymd_and_hms(2026, 3, 3, 5, 0, 0).unwrap();
        let end = next_quiet_end(at, chicago(), &quiet).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 3, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_bad_hhmm_is_an_error() {
        assert!(parse_hhmm("25:99").is_err());
        let quiet = QuietHours::new("night", "morning");
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap();
        assert!(in_quiet_hours(at, chicago(), &quiet).is_err());
    }
}
