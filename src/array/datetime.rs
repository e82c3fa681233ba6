//! Datetime and timedelta support.
//!
//! Datetimes are stored as `i64` ticks since the Unix epoch in a [`TimeUnit`],
//! timedeltas as `i64` tick counts. Calendar units (years, months) go through
//! chrono so month lengths and leap years are handled.

use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Resolution of a datetime or timedelta value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeUnit {
    /// No fixed unit; only meaningful in a declared data type.
    Generic,
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Milli,
    Micro,
    Nano,
}

impl TimeUnit {
    /// All codes accepted by [`TimeUnit::parse`], coarsest first.
    pub const CODES: [&'static str; 10] = ["Y", "M", "W", "D", "h", "m", "s", "ms", "us", "ns"];

    /// Parse a numpy-style unit code (`D`, `h`, `ms`, ...).
    pub fn parse(code: &str) -> Result<Self> {
        let unit = match code {
            "Y" => TimeUnit::Year,
            "M" => TimeUnit::Month,
            "W" => TimeUnit::Week,
            "D" => TimeUnit::Day,
            "h" => TimeUnit::Hour,
            "m" => TimeUnit::Minute,
            "s" => TimeUnit::Second,
            "ms" => TimeUnit::Milli,
            "us" => TimeUnit::Micro,
            "ns" => TimeUnit::Nano,
            other => bail!("compute_unit= {} is not a valid code!", other),
        };
        Ok(unit)
    }

    pub fn code(&self) -> &'static str {
        match self {
            TimeUnit::Generic => "generic",
            TimeUnit::Year => "Y",
            TimeUnit::Month => "M",
            TimeUnit::Week => "W",
            TimeUnit::Day => "D",
            TimeUnit::Hour => "h",
            TimeUnit::Minute => "m",
            TimeUnit::Second => "s",
            TimeUnit::Milli => "ms",
            TimeUnit::Micro => "us",
            TimeUnit::Nano => "ns",
        }
    }

    /// Years and months have no fixed length.
    pub fn is_calendar(&self) -> bool {
        matches!(self, TimeUnit::Year | TimeUnit::Month)
    }

    /// Length of one tick in nanoseconds, for fixed-length units.
    pub fn nanos(&self) -> Option<i128> {
        let nanos = match self {
            TimeUnit::Week => 7 * 86_400 * NANOS_PER_SECOND,
            TimeUnit::Day => 86_400 * NANOS_PER_SECOND,
            TimeUnit::Hour => 3_600 * NANOS_PER_SECOND,
            TimeUnit::Minute => 60 * NANOS_PER_SECOND,
            TimeUnit::Second => NANOS_PER_SECOND,
            TimeUnit::Milli => 1_000_000,
            TimeUnit::Micro => 1_000,
            TimeUnit::Nano => 1,
            TimeUnit::Generic | TimeUnit::Year | TimeUnit::Month => return None,
        };
        Some(nanos)
    }

    /// The finer of two units. `Generic` yields to any concrete unit.
    pub fn finer(self, other: TimeUnit) -> TimeUnit {
        match (self, other) {
            (TimeUnit::Generic, u) | (u, TimeUnit::Generic) => u,
            (a, b) => a.max(b),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Parse an ISO-like datetime string, returning the value and the finest unit
/// its precision implies (`2023-01-05` is `D`, `2024-09-10T12` is `h`).
pub fn parse_datetime(text: &str) -> Result<(NaiveDateTime, TimeUnit)> {
    let text = text.trim();
    let invalid = || anyhow!("Error parsing datetime string \"{}\"", text);

    let (date_part, time_part) = match text.find(['T', ' ']) {
        Some(idx) => (&text[..idx], Some(text[idx + 1..].trim())),
        None => (text, None),
    };

    let date_fields: Vec<&str> = date_part.split('-').collect();
    let (year, month, day, mut unit) = match date_fields.as_slice() {
        [y] => (parse_field(y)?, 1, 1, TimeUnit::Year),
        [y, m] => (parse_field(y)?, parse_field(m)?, 1, TimeUnit::Month),
        [y, m, d] => (parse_field(y)?, parse_field(m)?, parse_field(d)?, TimeUnit::Day),
        _ => return Err(invalid()),
    };
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or_else(invalid)?;

    let Some(time_part) = time_part.filter(|t| !t.is_empty()) else {
        return date.and_hms_opt(0, 0, 0).map(|dt| (dt, unit)).ok_or_else(invalid);
    };
    if unit != TimeUnit::Day {
        return Err(invalid());
    }

    let (clock, fraction) = match time_part.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (time_part, None),
    };
    let clock_fields: Vec<&str> = clock.split(':').collect();
    let (hour, minute, second) = match clock_fields.as_slice() {
        [h] => {
            unit = TimeUnit::Hour;
            (parse_field(h)?, 0, 0)
        }
        [h, m] => {
            unit = TimeUnit::Minute;
            (parse_field(h)?, parse_field(m)?, 0)
        }
        [h, m, s] => {
            unit = TimeUnit::Second;
            (parse_field(h)?, parse_field(m)?, parse_field(s)?)
        }
        _ => return Err(invalid()),
    };

    let mut nanos = 0u32;
    if let Some(fraction) = fraction {
        if fraction.is_empty() || fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        unit = match fraction.len() {
            1..=3 => TimeUnit::Milli,
            4..=6 => TimeUnit::Micro,
            _ => TimeUnit::Nano,
        };
        let padded = format!("{:0<9}", fraction);
        nanos = padded.parse().map_err(|_| invalid())?;
    }

    let datetime = date
        .and_hms_nano_opt(hour as u32, minute as u32, second as u32, nanos)
        .ok_or_else(invalid)?;
    Ok((datetime, unit))
}

fn parse_field(field: &str) -> Result<i64> {
    field
        .trim()
        .parse::<i64>()
        .map_err(|_| anyhow!("Invalid datetime field '{}'", field))
}

/// Convert a datetime to ticks since the epoch, flooring to the unit.
pub fn to_ticks(datetime: NaiveDateTime, unit: TimeUnit) -> Result<i64> {
    let ticks: i128 = match unit {
        TimeUnit::Year => (datetime.year() - 1970) as i128,
        TimeUnit::Month => ((datetime.year() - 1970) as i128) * 12 + datetime.month0() as i128,
        TimeUnit::Generic => bail!("Cannot convert datetime to generic unit"),
        fixed => {
            let step = fixed.nanos().unwrap_or(1);
            let delta = datetime - epoch();
            let nanos = match delta.num_nanoseconds() {
                Some(n) => n as i128,
                None => delta.num_seconds() as i128 * NANOS_PER_SECOND,
            };
            nanos.div_euclid(step)
        }
    };
    i64::try_from(ticks).map_err(|_| anyhow!("Datetime {} out of range for unit {}", datetime, unit))
}

/// Convert ticks since the epoch back into a datetime.
pub fn from_ticks(ticks: i64, unit: TimeUnit) -> Result<NaiveDateTime> {
    let out_of_range = || anyhow!("Datetime tick {} out of range for unit {}", ticks, unit);
    match unit {
        TimeUnit::Year => NaiveDate::from_ymd_opt(1970 + ticks as i32, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(out_of_range),
        TimeUnit::Month => {
            let year = 1970 + ticks.div_euclid(12);
            let month = ticks.rem_euclid(12) + 1;
            NaiveDate::from_ymd_opt(year as i32, month as u32, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(out_of_range)
        }
        TimeUnit::Generic => bail!("Cannot convert ticks with a generic unit"),
        fixed => {
            let nanos = ticks as i128 * fixed.nanos().unwrap_or(1);
            let seconds = nanos.div_euclid(NANOS_PER_SECOND);
            let sub_nanos = nanos.rem_euclid(NANOS_PER_SECOND);
            let seconds = i64::try_from(seconds).map_err(|_| out_of_range())?;
            chrono::DateTime::from_timestamp(seconds, sub_nanos as u32)
                .map(|dt| dt.naive_utc())
                .ok_or_else(out_of_range)
        }
    }
}

/// Re-express datetime ticks in another unit (flooring when coarser).
pub fn convert_datetime(ticks: i64, from: TimeUnit, to: TimeUnit) -> Result<i64> {
    if from == to || to == TimeUnit::Generic {
        return Ok(ticks);
    }
    if let (Some(from_ns), Some(to_ns)) = (from.nanos(), to.nanos()) {
        let nanos = ticks as i128 * from_ns;
        return i64::try_from(nanos.div_euclid(to_ns))
            .map_err(|_| anyhow!("Datetime overflow converting {} to {}", from, to));
    }
    to_ticks(from_ticks(ticks, from)?, to)
}

/// Re-express a timedelta in another unit. Calendar and fixed units do not mix.
pub fn convert_timedelta(ticks: i64, from: TimeUnit, to: TimeUnit) -> Result<i64> {
    if from == to || to == TimeUnit::Generic {
        return Ok(ticks);
    }
    match (from, to) {
        (TimeUnit::Year, TimeUnit::Month) => Ok(ticks * 12),
        (TimeUnit::Month, TimeUnit::Year) => Ok(ticks.div_euclid(12)),
        _ => match (from.nanos(), to.nanos()) {
            (Some(from_ns), Some(to_ns)) => {
                let nanos = ticks as i128 * from_ns;
                i64::try_from(nanos.div_euclid(to_ns))
                    .map_err(|_| anyhow!("Timedelta overflow converting {} to {}", from, to))
            }
            _ => bail!(
                "Cannot cast timedelta from [{}] to [{}]: calendar and fixed units are incompatible",
                from,
                to
            ),
        },
    }
}

/// Shift datetime ticks by a number of calendar months, keeping the unit.
pub fn add_months(ticks: i64, unit: TimeUnit, months: i64) -> Result<i64> {
    let overflow = || anyhow!("Datetime overflow adding {} months", months);
    if unit == TimeUnit::Month {
        return ticks.checked_add(months).ok_or_else(overflow);
    }
    if unit == TimeUnit::Year {
        return ticks.checked_add(months.div_euclid(12)).ok_or_else(overflow);
    }
    let datetime = from_ticks(ticks, unit)?;
    let count = Months::new(u32::try_from(months.unsigned_abs()).map_err(|_| overflow())?);
    let shifted = if months >= 0 {
        datetime.checked_add_months(count)
    } else {
        datetime.checked_sub_months(count)
    };
    let shifted = shifted.ok_or_else(overflow)?;
    to_ticks(shifted, unit)
}

/// Format datetime ticks the way numpy prints them for the unit.
pub fn format_datetime(ticks: i64, unit: TimeUnit) -> String {
    let Ok(datetime) = from_ticks(ticks, unit) else {
        return "NaT".to_string();
    };
    match unit {
        TimeUnit::Year => datetime.format("%Y").to_string(),
        TimeUnit::Month => datetime.format("%Y-%m").to_string(),
        TimeUnit::Week | TimeUnit::Day | TimeUnit::Generic => datetime.format("%Y-%m-%d").to_string(),
        TimeUnit::Hour => datetime.format("%Y-%m-%dT%H").to_string(),
        TimeUnit::Minute => datetime.format("%Y-%m-%dT%H:%M").to_string(),
        TimeUnit::Second => datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
        TimeUnit::Milli => datetime.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        TimeUnit::Micro => datetime.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        TimeUnit::Nano => datetime.format("%Y-%m-%dT%H:%M:%S%.9f").to_string(),
    }
}

/// Calendar component of a datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateComponent {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Week,
    Weekday,
}

impl DateComponent {
    pub fn parse(code: &str) -> Result<Self> {
        let component = match code {
            "Y" => DateComponent::Year,
            "M" => DateComponent::Month,
            "D" => DateComponent::Day,
            "h" => DateComponent::Hour,
            "m" => DateComponent::Minute,
            "s" => DateComponent::Second,
            "W" => DateComponent::Week,
            "weekday" => DateComponent::Weekday,
            other => bail!(
                "Invalid component '{}'. Expected one of: Y, M, D, h, m, s, W, weekday",
                other
            ),
        };
        Ok(component)
    }

    pub fn extract(&self, datetime: &NaiveDateTime) -> i64 {
        match self {
            DateComponent::Year => datetime.year() as i64,
            DateComponent::Month => datetime.month() as i64,
            DateComponent::Day => datetime.day() as i64,
            DateComponent::Hour => datetime.hour() as i64,
            DateComponent::Minute => datetime.minute() as i64,
            DateComponent::Second => datetime.second() as i64,
            DateComponent::Week => datetime.iso_week().week() as i64,
            DateComponent::Weekday => datetime.weekday().num_days_from_monday() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_infers_day_unit() {
        let (dt, unit) = parse_datetime("2023-01-05").unwrap();
        assert_eq!(unit, TimeUnit::Day);
        assert_eq!(dt.day(), 5);
    }

    #[test]
    fn test_parse_datetime_precision() {
        assert_eq!(parse_datetime("2024-09-10T12").unwrap().1, TimeUnit::Hour);
        assert_eq!(parse_datetime("2024-09-10 12:30").unwrap().1, TimeUnit::Minute);
        assert_eq!(parse_datetime("2024-09-10 12:30:45").unwrap().1, TimeUnit::Second);
        assert_eq!(parse_datetime("2024-09-10T12:30:45.5").unwrap().1, TimeUnit::Milli);
        assert_eq!(parse_datetime("2024-09").unwrap().1, TimeUnit::Month);
        assert_eq!(parse_datetime("2024").unwrap().1, TimeUnit::Year);
    }

    #[test]
    fn test_parse_invalid_datetime() {
        assert!(parse_datetime("2024-13-01").is_err());
        assert!(parse_datetime("yesterday").is_err());
        assert!(parse_datetime("2024-09T12").is_err());
    }

    #[test]
    fn test_ticks_roundtrip_days() {
        let (dt, _) = parse_datetime("2023-01-01").unwrap();
        let ticks = to_ticks(dt, TimeUnit::Day).unwrap();
        assert_eq!(ticks, 19358);
        assert_eq!(from_ticks(ticks, TimeUnit::Day).unwrap(), dt);
    }

    #[test]
    fn test_ticks_before_epoch_floor() {
        let (dt, _) = parse_datetime("1969-12-31T23").unwrap();
        assert_eq!(to_ticks(dt, TimeUnit::Day).unwrap(), -1);
    }

    #[test]
    fn test_convert_timedelta_days_to_seconds() {
        assert_eq!(convert_timedelta(4, TimeUnit::Day, TimeUnit::Second).unwrap(), 345_600);
        assert_eq!(convert_timedelta(90, TimeUnit::Minute, TimeUnit::Hour).unwrap(), 1);
        assert!(convert_timedelta(1, TimeUnit::Month, TimeUnit::Day).is_err());
        assert_eq!(convert_timedelta(2, TimeUnit::Year, TimeUnit::Month).unwrap(), 24);
    }

    #[test]
    fn test_convert_datetime_month() {
        let (dt, _) = parse_datetime("2024-03-15").unwrap();
        let days = to_ticks(dt, TimeUnit::Day).unwrap();
        let months = convert_datetime(days, TimeUnit::Day, TimeUnit::Month).unwrap();
        assert_eq!(format_datetime(months, TimeUnit::Month), "2024-03");
    }

    #[test]
    fn test_add_months_end_of_month() {
        let (dt, _) = parse_datetime("2024-01-31").unwrap();
        let ticks = to_ticks(dt, TimeUnit::Day).unwrap();
        let shifted = add_months(ticks, TimeUnit::Day, 1).unwrap();
        assert_eq!(format_datetime(shifted, TimeUnit::Day), "2024-02-29");
    }

    #[test]
    fn test_add_months_rejects_out_of_range_counts() {
        let (dt, _) = parse_datetime("2024-01-15").unwrap();
        let ticks = to_ticks(dt, TimeUnit::Day).unwrap();
        let err = add_months(ticks, TimeUnit::Day, 4_294_967_297).unwrap_err();
        assert!(err.to_string().contains("Datetime overflow"));
        assert!(add_months(ticks, TimeUnit::Day, -4_294_967_297).is_err());
        assert!(add_months(i64::MAX, TimeUnit::Month, 1).is_err());
        assert!(add_months(i64::MAX, TimeUnit::Year, 24).is_err());
    }

    #[test]
    fn test_unit_parse_rejects_unknown() {
        let err = TimeUnit::parse("invalid").unwrap_err();
        assert!(err.to_string().contains("compute_unit= invalid is not a valid code!"));
    }

    #[test]
    fn test_finer() {
        assert_eq!(TimeUnit::Day.finer(TimeUnit::Second), TimeUnit::Second);
        assert_eq!(TimeUnit::Generic.finer(TimeUnit::Hour), TimeUnit::Hour);
    }
}
