//! CF time handling
//!
//! Decodes `"<unit> since <reference>"` time coordinates in any of the CF
//! calendars used by CMIP6 and obs4MIPs output, and parses the period strings
//! (`"2000"`, `"2000-06"`, `"2000-06-15"`) used to request time spans.
//!
//! Dates are kept as plain calendar fields in [`CalendarDate`]. Two dates from
//! the same calendar order correctly by field comparison, which is all that span
//! selection and file naming need.

use crate::errors::{FetchError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian day number of 0001-01-01 (proleptic Gregorian) minus one.
const CE_EPOCH_JDN: i64 = 1_721_425;

/// First Gregorian day of the `standard` calendar (1582-10-15).
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

/// Largest offset from the reference date accepted when decoding, in days
/// (a little over two million years).
const MAX_DAY_OFFSET: f64 = 1.0e9;

/// A date in some CF calendar, with the time of day in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub seconds: f64,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            seconds: 0.0,
        }
    }

    /// `YYYYMM` with the year zero padded to four digits.
    pub fn yyyymm(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

/// CF calendars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// Julian before 1582-10-15, Gregorian from then on
    Standard,
    ProlepticGregorian,
    Julian,
    NoLeap,
    AllLeap,
    Day360,
}

impl Calendar {
    /// Parse the value of a `calendar` attribute.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Self::Standard),
            "proleptic_gregorian" => Ok(Self::ProlepticGregorian),
            "julian" => Ok(Self::Julian),
            "noleap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            other => Err(FetchError::TimeDecode(format!(
                "unsupported calendar '{}'",
                other
            ))),
        }
    }

    fn days_in_month(self, year: i32, month: u32) -> u32 {
        match self {
            Self::Day360 => 30,
            Self::NoLeap => NOLEAP_MONTH_DAYS[month as usize - 1],
            Self::AllLeap => ALL_LEAP_MONTH_DAYS[month as usize - 1],
            Self::Julian | Self::ProlepticGregorian | Self::Standard => {
                let leap = if self == Self::Julian
                    || (self == Self::Standard && year < 1583)
                {
                    year.rem_euclid(4) == 0
                } else {
                    (year.rem_euclid(4) == 0 && year.rem_euclid(100) != 0)
                        || year.rem_euclid(400) == 0
                };
                if leap {
                    ALL_LEAP_MONTH_DAYS[month as usize - 1]
                } else {
                    NOLEAP_MONTH_DAYS[month as usize - 1]
                }
            }
        }
    }

    /// Continuous day count for a date. Only differences between counts of the
    /// same calendar are meaningful.
    fn day_number(self, year: i32, month: u32, day: u32) -> Result<i64> {
        if !(1..=12).contains(&month) || day == 0 || day > self.days_in_month(year, month) {
            return Err(FetchError::TimeDecode(format!(
                "invalid date {:04}-{:02}-{:02} in {:?} calendar",
                year, month, day, self
            )));
        }

        let n = match self {
            Self::Day360 => fixed_year_day_number(year, month, day, 360, &DAY360_CUMULATIVE),
            Self::NoLeap => fixed_year_day_number(year, month, day, 365, &NOLEAP_CUMULATIVE),
            Self::AllLeap => fixed_year_day_number(year, month, day, 366, &ALL_LEAP_CUMULATIVE),
            Self::Julian => julian_to_jdn(year, month, day),
            Self::ProlepticGregorian => gregorian_to_jdn(year, month, day)?,
            Self::Standard => {
                if (year, month, day) < (1582, 10, 15) {
                    julian_to_jdn(year, month, day)
                } else {
                    gregorian_to_jdn(year, month, day)?
                }
            }
        };
        Ok(n)
    }

    fn date_from_day_number(self, n: i64) -> Result<(i32, u32, u32)> {
        match self {
            Self::Day360 => fixed_year_date(n, 360, &DAY360_CUMULATIVE),
            Self::NoLeap => fixed_year_date(n, 365, &NOLEAP_CUMULATIVE),
            Self::AllLeap => fixed_year_date(n, 366, &ALL_LEAP_CUMULATIVE),
            Self::Julian => jdn_to_julian(n),
            Self::ProlepticGregorian => jdn_to_gregorian(n),
            Self::Standard => {
                if n < GREGORIAN_REFORM_JDN {
                    jdn_to_julian(n)
                } else {
                    jdn_to_gregorian(n)
                }
            }
        }
    }
}

const NOLEAP_MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const ALL_LEAP_MONTH_DAYS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const NOLEAP_CUMULATIVE: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const ALL_LEAP_CUMULATIVE: [i64; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];
const DAY360_CUMULATIVE: [i64; 12] = [0, 30, 60, 90, 120, 150, 180, 210, 240, 270, 300, 330];

fn fixed_year_day_number(
    year: i32,
    month: u32,
    day: u32,
    year_len: i64,
    cumulative: &[i64; 12],
) -> i64 {
    i64::from(year) * year_len + cumulative[month as usize - 1] + i64::from(day) - 1
}

fn year_out_of_range(year: i64) -> FetchError {
    FetchError::TimeDecode(format!("year {} out of range", year))
}

fn fixed_year_date(n: i64, year_len: i64, cumulative: &[i64; 12]) -> Result<(i32, u32, u32)> {
    let year = n.div_euclid(year_len);
    let year = i32::try_from(year).map_err(|_| year_out_of_range(year))?;
    let day_of_year = n.rem_euclid(year_len);
    let month_index = cumulative
        .iter()
        .rposition(|&start| start <= day_of_year)
        .unwrap_or(0);
    let day = day_of_year - cumulative[month_index] + 1;
    Ok((year, month_index as u32 + 1, day as u32))
}

fn julian_to_jdn(year: i32, month: u32, day: u32) -> i64 {
    let a = (14 - i64::from(month)) / 12;
    let y = i64::from(year) + 4800 - a;
    let m = i64::from(month) + 12 * a - 3;
    i64::from(day) + (153 * m + 2) / 5 + 365 * y + y / 4 - 32_083
}

fn jdn_to_julian(jdn: i64) -> Result<(i32, u32, u32)> {
    let c = jdn + 32_082;
    let d = (4 * c + 3) / 1461;
    let e = c - (1461 * d) / 4;
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    let year = i32::try_from(year).map_err(|_| year_out_of_range(year))?;
    Ok((year, month as u32, day as u32))
}

fn gregorian_to_jdn(year: i32, month: u32, day: u32) -> Result<i64> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| i64::from(date.num_days_from_ce()) + CE_EPOCH_JDN)
        .ok_or_else(|| {
            FetchError::TimeDecode(format!(
                "date {:04}-{:02}-{:02} out of range",
                year, month, day
            ))
        })
}

fn jdn_to_gregorian(jdn: i64) -> Result<(i32, u32, u32)> {
    i32::try_from(jdn - CE_EPOCH_JDN)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|date| (date.year(), date.month(), date.day()))
        .ok_or_else(|| FetchError::TimeDecode(format!("day number {} out of range", jdn)))
}

/// Parsed `"<unit> since <reference>"` attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub seconds_per_unit: f64,
    pub reference: CalendarDate,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self> {
        let lowered = units.trim().to_ascii_lowercase();
        let (unit, reference) = lowered.split_once(" since ").ok_or_else(|| {
            FetchError::TimeDecode(format!("units '{}' are not '<unit> since <date>'", units))
        })?;

        let seconds_per_unit = match unit.trim() {
            "days" | "day" | "d" => SECONDS_PER_DAY,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            other => {
                return Err(FetchError::TimeDecode(format!(
                    "unsupported time unit '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            seconds_per_unit,
            reference: parse_reference_date(reference)?,
        })
    }
}

fn parse_reference_date(reference: &str) -> Result<CalendarDate> {
    let invalid = || FetchError::TimeDecode(format!("invalid reference date '{}'", reference));

    let trimmed = reference
        .trim()
        .trim_end_matches("utc")
        .trim_end_matches('z')
        .trim();
    let mut parts = trimmed.splitn(2, |c: char| c == ' ' || c == 't');
    let date_part = parts.next().ok_or_else(invalid)?;
    let time_part = parts.next().map(str::trim).unwrap_or("");

    let fields: Vec<&str> = date_part.split('-').collect();
    let (year, month, day) = match fields.as_slice() {
        [y] => (y.parse().map_err(|_| invalid())?, 1, 1),
        [y, m] => (
            y.parse().map_err(|_| invalid())?,
            m.parse().map_err(|_| invalid())?,
            1,
        ),
        [y, m, d] => (
            y.parse().map_err(|_| invalid())?,
            m.parse().map_err(|_| invalid())?,
            d.parse().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };

    let mut seconds = 0.0;
    if !time_part.is_empty() {
        // Drop a trailing numeric offset such as "+00:00"; only UTC is produced by CMOR.
        let clock = time_part.split(['+', ' ']).next().unwrap_or("");
        for (component, scale) in clock.split(':').zip([3_600.0, 60.0, 1.0]) {
            let value: f64 = component.parse().map_err(|_| invalid())?;
            seconds += value * scale;
        }
    }

    Ok(CalendarDate {
        year,
        month,
        day,
        seconds,
    })
}

/// Decode raw time values into calendar dates.
pub fn decode_times(values: &[f64], units: &str, calendar: Calendar) -> Result<Vec<CalendarDate>> {
    let units = TimeUnits::parse(units)?;
    let reference = units.reference;
    let reference_day =
        calendar.day_number(reference.year, reference.month, reference.day)?;

    values
        .iter()
        .map(|&value| {
            if !value.is_finite() {
                return Err(FetchError::TimeDecode(format!(
                    "non-finite time value {}",
                    value
                )));
            }
            let total = reference.seconds + value * units.seconds_per_unit;
            let day_offset = (total / SECONDS_PER_DAY).floor();
            let out_of_range = || {
                FetchError::TimeDecode(format!(
                    "time value {} is too far from the reference date",
                    value
                ))
            };
            if day_offset.abs() > MAX_DAY_OFFSET {
                return Err(out_of_range());
            }
            let seconds = total - day_offset * SECONDS_PER_DAY;
            let day_number = reference_day
                .checked_add(day_offset as i64)
                .ok_or_else(out_of_range)?;
            let (year, month, day) = calendar.date_from_day_number(day_number)?;
            Ok(CalendarDate {
                year,
                month,
                day,
                seconds,
            })
        })
        .collect()
}

/// A requested time span given as two period strings.
///
/// Both ends are inclusive at the granularity of the string: `("2000", "2025")`
/// covers 2000-01-01 up to the last instant of 2025.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct TimeSpan {
    pub start: String,
    pub end: String,
}

impl From<(String, String)> for TimeSpan {
    fn from((start, end): (String, String)) -> Self {
        Self { start, end }
    }
}

impl From<TimeSpan> for (String, String) {
    fn from(span: TimeSpan) -> Self {
        (span.start, span.end)
    }
}

impl TimeSpan {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// First instant covered by the span.
    pub fn lower_bound(&self) -> Result<CalendarDate> {
        Ok(parse_period(&self.start)?.0)
    }

    /// First instant after the span (exclusive).
    pub fn upper_bound(&self) -> Result<CalendarDate> {
        Ok(parse_period(&self.end)?.1)
    }

    /// Widen to cover both spans; each end keeps its original string.
    pub fn union(&self, other: &TimeSpan) -> Result<TimeSpan> {
        let start = if other.lower_bound()? < self.lower_bound()? {
            other.start.clone()
        } else {
            self.start.clone()
        };
        let end = if other.upper_bound()? > self.upper_bound()? {
            other.end.clone()
        } else {
            self.end.clone()
        };
        Ok(TimeSpan { start, end })
    }
}

/// Inclusive lower and exclusive upper bound of a period string.
///
/// The upper bound uses out-of-range fields (month 13, day 32, 86400 s) so it
/// sorts after every real date in the period without calendar arithmetic.
pub fn parse_period(period: &str) -> Result<(CalendarDate, CalendarDate)> {
    let invalid = || FetchError::InvalidTimeSpan {
        value: period.to_string(),
    };

    let fields: Vec<&str> = period.trim().split('-').collect();
    if fields.is_empty()
        || fields
            .iter()
            .any(|f| f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(invalid());
    }

    let year: i32 = fields[0].parse().map_err(|_| invalid())?;
    match fields.as_slice() {
        [_] => Ok((
            CalendarDate::new(year, 1, 1),
            CalendarDate::new(year, 13, 1),
        )),
        [_, m] => {
            let month: u32 = m.parse().map_err(|_| invalid())?;
            if !(1..=12).contains(&month) {
                return Err(invalid());
            }
            Ok((
                CalendarDate::new(year, month, 1),
                CalendarDate::new(year, month, 32),
            ))
        }
        [_, m, d] => {
            let month: u32 = m.parse().map_err(|_| invalid())?;
            let day: u32 = d.parse().map_err(|_| invalid())?;
            if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                return Err(invalid());
            }
            let mut upper = CalendarDate::new(year, month, day);
            upper.seconds = SECONDS_PER_DAY;
            Ok((CalendarDate::new(year, month, day), upper))
        }
        _ => Err(invalid()),
    }
}
