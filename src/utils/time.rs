use crate::utils::error::{Result, ScaffoldError};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, SecondsFormat, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static ISO_8601: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})(?:-(?P<month>\d{2})(?:-(?P<day>\d{2}))?|(?P<bmonth>\d{2})(?P<bday>\d{2})|-?W(?P<week>\d{2})(?:-?(?P<wday>[1-7]))?|-?(?P<ordinal>\d{3}))?(?:[T ](?P<hour>\d{2})(?::?(?P<minute>\d{2})(?::?(?P<second>\d{2})(?:[.,]\d{1,9})?)?)?(?P<offset>Z|[+-]\d{2}(?::?\d{2})?)?)?$",
    )
    .expect("ISO 8601 pattern is valid")
});

static OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<sign>[+-])(?P<hours>\d{2})(?::?(?P<minutes>\d{2}))?$")
        .expect("offset pattern is valid")
});

/// Abbreviations tried after the tz database, each pinned to one offset.
const ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
    ("CET", 3600),
    ("CEST", 2 * 3600),
    ("EET", 2 * 3600),
    ("EEST", 3 * 3600),
    ("IST", 5 * 3600 + 1800),
    ("JST", 9 * 3600),
    ("AEST", 10 * 3600),
    ("AEDT", 11 * 3600),
];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// IANA zone; the offset follows daylight saving.
    Named(Tz),
    Fixed(FixedOffset),
}

/// A named timezone: an IANA zone such as `America/New_York`, a common
/// abbreviation, or a `±HH:MM` offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timezone {
    name: String,
    zone: Zone,
}

impl Timezone {
    pub fn utc() -> Self {
        Self {
            name: "UTC".to_string(),
            zone: Zone::Named(Tz::UTC),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset from UTC in effect at `instant`.
    pub fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self.zone {
            Zone::Named(tz) => tz.offset_from_utc_datetime(&instant.naive_utc()).fix(),
            Zone::Fixed(offset) => offset,
        }
    }

    pub fn is_utc(&self) -> bool {
        match self.zone {
            Zone::Named(tz) => matches!(tz.name(), "UTC" | "Etc/UTC" | "Etc/UCT" | "UCT" | "Zulu"),
            Zone::Fixed(offset) => offset.local_minus_utc() == 0,
        }
    }

    fn fixed(name: &str, seconds: i32) -> Option<Self> {
        Some(Self {
            name: name.to_string(),
            zone: Zone::Fixed(FixedOffset::east_opt(seconds)?),
        })
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Timezone {
    type Err = ScaffoldError;

    /// Tries the tz database first, then the abbreviation table, then a
    /// literal offset.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || ScaffoldError::InvalidTimezoneError {
            name: s.to_string(),
        };

        if let Ok(tz) = trimmed.parse::<Tz>() {
            return Ok(Self {
                name: tz.name().to_string(),
                zone: Zone::Named(tz),
            });
        }

        if let Some((name, seconds)) = ABBREVIATIONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        {
            return Self::fixed(name, *seconds).ok_or_else(invalid);
        }

        let caps = OFFSET.captures(trimmed).ok_or_else(invalid)?;
        let hours: i32 = caps["hours"].parse().map_err(|_| invalid())?;
        let minutes: i32 = caps
            .name("minutes")
            .map(|m| m.as_str().parse())
            .transpose()
            .map_err(|_| invalid())?
            .unwrap_or(0);
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }

        let mut seconds = hours * 3600 + minutes * 60;
        if &caps["sign"] == "-" {
            seconds = -seconds;
        }

        Self::fixed(trimmed, seconds).ok_or_else(invalid)
    }
}

/// Current time as an ISO 8601 string in `timezone`, millisecond precision.
/// UTC renders with a `Z` suffix, other zones with `±HH:MM`.
pub fn fresh_timestamp(timezone: &Timezone) -> String {
    format_timestamp(Utc::now(), timezone)
}

pub fn format_timestamp(instant: DateTime<Utc>, timezone: &Timezone) -> String {
    instant
        .with_timezone(&timezone.offset_at(instant))
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts year-only (`2017`), calendar (`2017-01-31`, `20170131`,
/// `2017-01`), week (`2017-W05-3`) and ordinal (`2017-031`) dates. A time
/// part needs a full date and may carry fractional seconds and an offset.
/// Field ranges are checked too, so `2017-02-30` is rejected.
pub fn is_valid_iso8601(value: &str) -> bool {
    let Some(caps) = ISO_8601.captures(value) else {
        return false;
    };

    let number = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = match caps["year"].parse::<i32>() {
        Ok(year) => year,
        Err(_) => return false,
    };
    let month = number("month").or_else(|| number("bmonth"));
    let day = number("day").or_else(|| number("bday"));
    let week = number("week");
    let weekday = number("wday");
    let ordinal = number("ordinal");
    let hour = number("hour");

    let full_date = day.is_some() || weekday.is_some() || ordinal.is_some();
    if hour.is_some() && !full_date {
        return false;
    }

    let date_ok = match (month, week, ordinal) {
        (Some(month), _, _) => NaiveDate::from_ymd_opt(year, month, day.unwrap_or(1)).is_some(),
        (_, Some(week), _) => {
            let weekday = WEEKDAYS[weekday.unwrap_or(1) as usize - 1];
            NaiveDate::from_isoywd_opt(year, week, weekday).is_some()
        }
        (_, _, Some(ordinal)) => NaiveDate::from_yo_opt(year, ordinal).is_some(),
        (None, None, None) => true,
    };
    if !date_ok {
        return false;
    }

    if let Some(hour) = hour {
        let minute = number("minute").unwrap_or(0);
        let second = number("second").unwrap_or(0);
        let midnight = hour == 24 && minute == 0 && second == 0;
        if !(midnight || (hour < 24 && minute < 60 && second < 60)) {
            return false;
        }
    }

    match caps.name("offset").map(|m| m.as_str()) {
        None | Some("Z") => true,
        Some(offset) => OFFSET.is_match(offset) && offset.parse::<Timezone>().is_ok(),
    }
}
