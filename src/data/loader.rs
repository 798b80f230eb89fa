//! CSV loading and row cleaning
//!
//! Every column is read as text and coerced afterwards: a value that does not
//! parse becomes missing instead of failing the load. Rows that cannot be used
//! are dropped and counted in a [`LoadReport`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use tracing::debug;

use super::types::{EquityTick, LoadReport, OptionSide, Quote, UnderlyingTick};
use crate::error::{SurfaceError, SurfaceResult};

const OPTION_COLUMNS: [&str; 7] = [
    "Timestamp",
    "StrikePrice",
    "LTP",
    "BuyPrice",
    "OpenInterest",
    "DTE",
    "OptionsType",
];

const EQUITY_COLUMNS: [&str; 3] = ["Timestamp", "LTP", "BuyPrice"];

const UNDERLYING_COLUMNS: [&str; 2] = ["Timestamp", "LTP"];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Raw option row exactly as it appears in the file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOptionRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
    #[serde(rename = "StrikePrice")]
    pub strike_price: Option<String>,
    #[serde(rename = "LTP")]
    pub ltp: Option<String>,
    #[serde(rename = "BuyPrice")]
    pub buy_price: Option<String>,
    #[serde(rename = "OpenInterest")]
    pub open_interest: Option<String>,
    #[serde(rename = "DTE")]
    pub dte: Option<String>,
    #[serde(rename = "OptionsType")]
    pub options_type: Option<String>,
    #[serde(rename = "IV", default)]
    pub iv: Option<String>,
}

/// Raw equity row exactly as it appears in the file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEquityRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
    #[serde(rename = "LTP")]
    pub ltp: Option<String>,
    #[serde(rename = "BuyPrice", default)]
    pub buy_price: Option<String>,
}

/// Parse a timestamp in any of the layouts seen in exchange tick dumps.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Coerce a text cell into a finite number; anything else is missing.
pub fn coerce_f64(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn coerce_count(raw: Option<&str>) -> Option<u64> {
    coerce_f64(raw)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
}

fn require_columns(headers: &StringRecord, required: &[&str]) -> SurfaceResult<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim() == *col))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SurfaceError::invalid_input(format!(
            "missing required columns: {}",
            missing.join(", ")
        )))
    }
}

/// Returns the deserialized rows and the number of records that could not be
/// decoded at all (bad UTF-8, unbalanced quoting).
fn read_rows<R, T>(reader: R, required: &[&str]) -> SurfaceResult<(Vec<T>, usize)>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    require_columns(rdr.headers()?, required)?;

    let mut rows = Vec::new();
    let mut malformed = 0;
    for result in rdr.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(_) => malformed += 1,
        }
    }
    Ok((rows, malformed))
}

fn with_malformed(mut report: LoadReport, malformed: usize) -> LoadReport {
    report.rows_read += malformed;
    report.dropped_malformed = malformed;
    report
}

/// Clean raw option rows into time-ordered quotes.
pub fn clean_option_rows(rows: Vec<RawOptionRow>) -> (Vec<Quote>, LoadReport) {
    let mut report = LoadReport {
        rows_read: rows.len(),
        ..LoadReport::default()
    };
    let mut quotes = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(ltp) = coerce_f64(row.ltp.as_deref()) else {
            report.dropped_missing_price += 1;
            continue;
        };
        let Some(strike) = coerce_f64(row.strike_price.as_deref()).filter(|k| *k > 0.0) else {
            report.dropped_missing_strike += 1;
            continue;
        };
        let Some(side) = row.options_type.as_deref().and_then(OptionSide::parse) else {
            report.dropped_bad_side += 1;
            continue;
        };
        let Some(timestamp) = row.timestamp.as_deref().and_then(parse_timestamp) else {
            report.dropped_bad_timestamp += 1;
            continue;
        };

        quotes.push(Quote {
            timestamp,
            strike,
            ltp,
            buy_price: coerce_f64(row.buy_price.as_deref()),
            open_interest: coerce_count(row.open_interest.as_deref()),
            dte: coerce_f64(row.dte.as_deref()),
            side,
            iv: coerce_f64(row.iv.as_deref()),
        });
    }

    quotes.sort_by_key(|q| q.timestamp);
    report.rows_kept = quotes.len();
    debug!(
        rows_read = report.rows_read,
        rows_kept = report.rows_kept,
        missing_price = report.dropped_missing_price,
        missing_strike = report.dropped_missing_strike,
        bad_side = report.dropped_bad_side,
        bad_timestamp = report.dropped_bad_timestamp,
        "cleaned option rows"
    );
    (quotes, report)
}

/// Clean raw equity rows into time-ordered ticks (both LTP and BuyPrice required).
pub fn clean_equity_rows(rows: Vec<RawEquityRow>) -> (Vec<EquityTick>, LoadReport) {
    let mut report = LoadReport {
        rows_read: rows.len(),
        ..LoadReport::default()
    };
    let mut ticks = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(ltp) = coerce_f64(row.ltp.as_deref()) else {
            report.dropped_missing_price += 1;
            continue;
        };
        let Some(buy_price) = coerce_f64(row.buy_price.as_deref()) else {
            report.dropped_missing_buy_price += 1;
            continue;
        };
        let Some(timestamp) = row.timestamp.as_deref().and_then(parse_timestamp) else {
            report.dropped_bad_timestamp += 1;
            continue;
        };
        ticks.push(EquityTick {
            timestamp,
            ltp,
            buy_price,
        });
    }

    ticks.sort_by_key(|t| t.timestamp);
    report.rows_kept = ticks.len();
    debug!(
        rows_read = report.rows_read,
        rows_kept = report.rows_kept,
        "cleaned equity rows"
    );
    (ticks, report)
}

/// Clean raw equity rows into an underlying price series (only LTP required).
pub fn clean_underlying_rows(rows: Vec<RawEquityRow>) -> (Vec<UnderlyingTick>, LoadReport) {
    let mut report = LoadReport {
        rows_read: rows.len(),
        ..LoadReport::default()
    };
    let mut ticks = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(price) = coerce_f64(row.ltp.as_deref()) else {
            report.dropped_missing_price += 1;
            continue;
        };
        let Some(timestamp) = row.timestamp.as_deref().and_then(parse_timestamp) else {
            report.dropped_bad_timestamp += 1;
            continue;
        };
        ticks.push(UnderlyingTick { timestamp, price });
    }

    ticks.sort_by_key(|t| t.timestamp);
    report.rows_kept = ticks.len();
    (ticks, report)
}

pub fn load_option_quotes<R: Read>(reader: R) -> SurfaceResult<(Vec<Quote>, LoadReport)> {
    let (rows, malformed) = read_rows::<_, RawOptionRow>(reader, &OPTION_COLUMNS)?;
    let (quotes, report) = clean_option_rows(rows);
    Ok((quotes, with_malformed(report, malformed)))
}

pub fn load_equity_ticks<R: Read>(reader: R) -> SurfaceResult<(Vec<EquityTick>, LoadReport)> {
    let (rows, malformed) = read_rows::<_, RawEquityRow>(reader, &EQUITY_COLUMNS)?;
    let (ticks, report) = clean_equity_rows(rows);
    Ok((ticks, with_malformed(report, malformed)))
}

pub fn load_underlying<R: Read>(reader: R) -> SurfaceResult<(Vec<UnderlyingTick>, LoadReport)> {
    let (rows, malformed) = read_rows::<_, RawEquityRow>(reader, &UNDERLYING_COLUMNS)?;
    let (ticks, report) = clean_underlying_rows(rows);
    Ok((ticks, with_malformed(report, malformed)))
}

pub fn load_option_quotes_from_path(
    path: impl AsRef<Path>,
) -> SurfaceResult<(Vec<Quote>, LoadReport)> {
    load_option_quotes(File::open(path.as_ref())?)
}

pub fn load_equity_ticks_from_path(
    path: impl AsRef<Path>,
) -> SurfaceResult<(Vec<EquityTick>, LoadReport)> {
    load_equity_ticks(File::open(path.as_ref())?)
}

pub fn load_underlying_from_path(
    path: impl AsRef<Path>,
) -> SurfaceResult<(Vec<UnderlyingTick>, LoadReport)> {
    load_underlying(File::open(path.as_ref())?)
}
