//! Date filters: `add_days`, `add_months`, `date_format`, `truncate_day`, ...
//!
//! Shifting filters parse their input in one of the supported layouts and
//! print the result back in that same layout, so `'2024-01-31' | add_days(1)`
//! stays a plain date while a timestamp stays a timestamp.

use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, SecondsFormat,
    TimeZone, Timelike, Utc,
};
use minijinja::{Environment, Error, ErrorKind};

/// Naive layouts tried in order, as (parse format, output format)
const NAIVE_LAYOUTS: [(&str, &str); 4] = [
    ("%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S"),
    ("%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"),
    ("%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.6f"),
    ("%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.6f"),
];

#[derive(Debug, Clone, Copy)]
enum Layout {
    Date,
    Naive(&'static str),
    Rfc3339 { fractional: bool },
}

#[derive(Debug, Clone, Copy)]
struct ParsedTime {
    value: DateTime<FixedOffset>,
    layout: Layout,
}

impl ParsedTime {
    fn parse(input: &str) -> Result<Self, Error> {
        let utc = FixedOffset::east_opt(0).ok_or_else(|| invalid(input))?;

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            let naive = date.and_hms_opt(0, 0, 0).ok_or_else(|| invalid(input))?;
            return Ok(Self {
                value: utc.from_utc_datetime(&naive),
                layout: Layout::Date,
            });
        }
        for (parse_fmt, out_fmt) in NAIVE_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, parse_fmt) {
                return Ok(Self {
                    value: utc.from_utc_datetime(&naive),
                    layout: Layout::Naive(out_fmt),
                });
            }
        }
        if let Ok(value) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self {
                value,
                layout: Layout::Rfc3339 {
                    fractional: input.contains('.'),
                },
            });
        }
        Err(invalid(input))
    }

    fn print(&self) -> String {
        match self.layout {
            Layout::Date => self.value.format("%Y-%m-%d").to_string(),
            Layout::Naive(fmt) => self.value.naive_local().format(fmt).to_string(),
            Layout::Rfc3339 { fractional } => {
                let precision = if fractional {
                    SecondsFormat::Micros
                } else {
                    SecondsFormat::Secs
                };
                if self.value.offset().local_minus_utc() == 0 {
                    self.value
                        .with_timezone(&Utc)
                        .to_rfc3339_opts(precision, true)
                } else {
                    self.value.to_rfc3339_opts(precision, false)
                }
            }
        }
    }

    fn map(
        mut self,
        f: impl FnOnce(DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>>,
    ) -> Result<String, Error> {
        self.value = f(self.value).ok_or_else(|| {
            Error::new(ErrorKind::InvalidOperation, "date arithmetic out of range")
        })?;
        Ok(self.print())
    }
}

fn invalid(input: &str) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("invalid date format, {input} given"),
    )
}

fn shift(input: &str, delta: Option<Duration>) -> Result<String, Error> {
    let delta = delta.ok_or_else(|| {
        Error::new(ErrorKind::InvalidOperation, "date offset out of range")
    })?;
    ParsedTime::parse(input)?.map(|t| t.checked_add_signed(delta))
}

fn shift_months(input: &str, months: i64) -> Result<String, Error> {
    let count = Months::new(u32::try_from(months.unsigned_abs()).map_err(|_| {
        Error::new(ErrorKind::InvalidOperation, "month offset out of range")
    })?);
    ParsedTime::parse(input)?.map(|t| {
        if months >= 0 {
            t.checked_add_months(count)
        } else {
            t.checked_sub_months(count)
        }
    })
}

fn add_days(value: &str, days: i64) -> Result<String, Error> {
    shift(value, Duration::try_days(days))
}

fn add_hours(value: &str, hours: i64) -> Result<String, Error> {
    shift(value, Duration::try_hours(hours))
}

fn add_minutes(value: &str, minutes: i64) -> Result<String, Error> {
    shift(value, Duration::try_minutes(minutes))
}

fn add_seconds(value: &str, seconds: i64) -> Result<String, Error> {
    shift(value, Duration::try_seconds(seconds))
}

fn add_milliseconds(value: &str, millis: i64) -> Result<String, Error> {
    shift(value, Duration::try_milliseconds(millis))
}

fn add_months(value: &str, months: i64) -> Result<String, Error> {
    shift_months(value, months)
}

fn add_years(value: &str, years: i64) -> Result<String, Error> {
    shift_months(value, years.saturating_mul(12))
}

/// Format the input with a strftime pattern (`%Y/%m/%d`)
fn date_format(value: &str, format: &str) -> Result<String, Error> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid format string '{format}' for date_format"),
        ));
    }
    let parsed = ParsedTime::parse(value)?;
    Ok(parsed.value.format(format).to_string())
}

fn truncate_year(value: &str) -> Result<String, Error> {
    ParsedTime::parse(value)?.map(|t| {
        t.with_ordinal(1)
            .and_then(|t| t.with_hour(0))
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
    })
}

fn truncate_month(value: &str) -> Result<String, Error> {
    ParsedTime::parse(value)?.map(|t| {
        t.with_day(1)
            .and_then(|t| t.with_hour(0))
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
    })
}

fn truncate_day(value: &str) -> Result<String, Error> {
    ParsedTime::parse(value)?.map(|t| {
        t.with_hour(0)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
    })
}

fn truncate_hour(value: &str) -> Result<String, Error> {
    ParsedTime::parse(value)?.map(|t| {
        t.with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
    })
}

/// Register every date filter on the environment
pub(crate) fn register(env: &mut Environment<'_>) {
    env.add_filter("add_days", add_days);
    env.add_filter("date_add", add_days);
    env.add_filter("add_hours", add_hours);
    env.add_filter("add_minutes", add_minutes);
    env.add_filter("add_seconds", add_seconds);
    env.add_filter("add_milliseconds", add_milliseconds);
    env.add_filter("add_months", add_months);
    env.add_filter("add_years", add_years);
    env.add_filter("date_format", date_format);
    env.add_filter("truncate_year", truncate_year);
    env.add_filter("truncate_month", truncate_month);
    env.add_filter("truncate_day", truncate_day);
    env.add_filter("truncate_hour", truncate_hour);
}

#[cfg(test)]
#[path = "filters_test.rs"]
mod tests;
