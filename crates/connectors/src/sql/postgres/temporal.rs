//! Raw decoding of PostgreSQL date/time/interval values and enum labels.
//!
//! The binary wire format is decoded by hand so that `infinity`, `-infinity`
//! and BC dates come out as the same text PostgreSQL itself prints, instead
//! of failing a conversion into a native temporal type.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::error::Error;
use tokio_postgres::types::{FromSql, Kind, Type};

type BoxError = Box<dyn Error + Sync + Send>;

/// Days from 0001-01-01 (CE day 1) to the PostgreSQL epoch, 2000-01-01.
const PG_EPOCH_CE_DAYS: i32 = 730_120;
/// Seconds from the Unix epoch to the PostgreSQL epoch.
const PG_EPOCH_UNIX_SECS: i64 = 946_684_800;
const MICROS_PER_SEC: i64 = 1_000_000;

/// A date, time or timestamp cell rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgTemporalText(pub String);

impl<'a> FromSql<'a> for PgTemporalText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let text = match *ty {
            Type::DATE => render_date(read_i32(raw)?)?,
            Type::TIME => render_time(read_i64(raw)?),
            Type::TIMETZ => {
                if raw.len() != 12 {
                    return Err(format!("invalid timetz length {}", raw.len()).into());
                }
                let micros = read_i64(&raw[..8])?;
                let west = read_i32(&raw[8..])?;
                format!("{}{}", render_time(micros), render_offset(-west))
            }
            Type::TIMESTAMP => render_timestamp(read_i64(raw)?, false)?,
            Type::TIMESTAMPTZ => render_timestamp(read_i64(raw)?, true)?,
            Type::INTERVAL => {
                if raw.len() != 16 {
                    return Err(format!("invalid interval length {}", raw.len()).into());
                }
                render_interval(read_i64(&raw[..8])?, read_i32(&raw[8..12])?, read_i32(&raw[12..])?)
            }
            _ => return Err(format!("unexpected temporal type {ty}").into()),
        };
        Ok(PgTemporalText(text))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::DATE
                | Type::TIME
                | Type::TIMETZ
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::INTERVAL
        )
    }
}

/// The label of a user-defined enum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgEnumLabel(pub String);

impl<'a> FromSql<'a> for PgEnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(PgEnumLabel(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

fn read_i32(raw: &[u8]) -> Result<i32, BoxError> {
    let bytes: [u8; 4] = raw
        .try_into()
        .map_err(|_| format!("expected 4 bytes, got {}", raw.len()))?;
    Ok(i32::from_be_bytes(bytes))
}

fn read_i64(raw: &[u8]) -> Result<i64, BoxError> {
    let bytes: [u8; 8] = raw
        .try_into()
        .map_err(|_| format!("expected 8 bytes, got {}", raw.len()))?;
    Ok(i64::from_be_bytes(bytes))
}

fn render_date(days: i32) -> Result<String, BoxError> {
    match days {
        i32::MAX => return Ok("infinity".to_string()),
        i32::MIN => return Ok("-infinity".to_string()),
        _ => {}
    }

    let date = days
        .checked_add(PG_EPOCH_CE_DAYS)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| format!("date {days} days from 2000-01-01 is out of range"))?;
    let (ymd, era) = split_era(&date);
    Ok(format!("{ymd}{era}"))
}

fn render_timestamp(micros: i64, with_zone: bool) -> Result<String, BoxError> {
    match micros {
        i64::MAX => return Ok("infinity".to_string()),
        i64::MIN => return Ok("-infinity".to_string()),
        _ => {}
    }

    let secs = micros.div_euclid(MICROS_PER_SEC) + PG_EPOCH_UNIX_SECS;
    let nanos = (micros.rem_euclid(MICROS_PER_SEC) * 1_000) as u32;
    let ts: NaiveDateTime = DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| format!("timestamp {micros} is out of range"))?
        .naive_utc();

    let (ymd, era) = split_era(&ts.date());
    let time = render_clock(
        i64::from(ts.hour()),
        ts.minute(),
        ts.second(),
        ts.nanosecond() / 1_000,
    );
    let zone = if with_zone { "+00" } else { "" };
    Ok(format!("{ymd} {time}{zone}{era}"))
}

fn render_time(micros: i64) -> String {
    let total_secs = micros / MICROS_PER_SEC;
    render_clock(
        total_secs / 3_600,
        ((total_secs / 60) % 60) as u32,
        (total_secs % 60) as u32,
        (micros % MICROS_PER_SEC) as u32,
    )
}

/// Renders an interval in the server's default `postgres` style, e.g.
/// `1 year 2 mons -3 days +04:05:06.5`.
fn render_interval(micros: i64, days: i32, months: i32) -> String {
    if (micros, days, months) == (i64::MAX, i32::MAX, i32::MAX) {
        return "infinity".to_string();
    }
    if (micros, days, months) == (i64::MIN, i32::MIN, i32::MIN) {
        return "-infinity".to_string();
    }

    let mut text = String::new();
    // a positive field following a negative one carries an explicit `+`
    let mut after_negative = false;
    let fields = [
        (i64::from(months / 12), "year"),
        (i64::from(months % 12), "mon"),
        (i64::from(days), "day"),
    ];
    for (value, unit) in fields {
        if value == 0 {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        let plus = if after_negative && value > 0 { "+" } else { "" };
        let plural = if value == 1 { "" } else { "s" };
        text.push_str(&format!("{plus}{value} {unit}{plural}"));
        after_negative = value < 0;
    }

    if text.is_empty() || micros != 0 {
        if !text.is_empty() {
            text.push(' ');
        }
        if micros < 0 {
            text.push('-');
        } else if after_negative {
            text.push('+');
        }
        let abs = micros.unsigned_abs();
        let total_secs = abs / MICROS_PER_SEC as u64;
        text.push_str(&render_clock(
            (total_secs / 3_600) as i64,
            ((total_secs / 60) % 60) as u32,
            (total_secs % 60) as u32,
            (abs % MICROS_PER_SEC as u64) as u32,
        ));
    }
    text
}

/// `HH:MM:SS` with a fractional part trimmed of trailing zeros.
fn render_clock(hours: i64, minutes: u32, seconds: u32, micros: u32) -> String {
    let mut text = format!("{hours:02}:{minutes:02}:{seconds:02}");
    if micros > 0 {
        let fraction = format!("{micros:06}");
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text
}

/// Renders a UTC offset in seconds east of Greenwich, e.g. `+05:30`, `-08`.
fn render_offset(east: i32) -> String {
    let sign = if east < 0 { '-' } else { '+' };
    let abs = east.unsigned_abs();
    let (hours, minutes, seconds) = (abs / 3_600, (abs / 60) % 60, abs % 60);
    match (minutes, seconds) {
        (0, 0) => format!("{sign}{hours:02}"),
        (m, 0) => format!("{sign}{hours:02}:{m:02}"),
        (m, s) => format!("{sign}{hours:02}:{m:02}:{s:02}"),
    }
}

/// Year-month-day text plus the ` BC` suffix for non-positive years, where
/// astronomical year 0 is 1 BC.
fn split_era(date: &NaiveDate) -> (String, &'static str) {
    let year = date.year();
    if year > 0 {
        (
            format!("{year:04}-{:02}-{:02}", date.month(), date.day()),
            "",
        )
    } else {
        (
            format!("{:04}-{:02}-{:02}", 1 - year, date.month(), date.day()),
            " BC",
        )
    }
}
