//! Bar-series CSV loader (deterministic).
//!
//! Required columns: `symbol,timeframe,timestamp,open,high,low,close,volume`.
//! `timestamp` is RFC 3339; `timeframe` matches [`Timeframe::parse`]. Rows
//! are validated through [`Bar::new`] so a malformed row (e.g. `high < low`)
//! is rejected rather than silently loaded.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use twe_schemas::{Bar, BarValidationError, Timeframe};

const REQUIRED_HEADERS: [&str; 8] =
    ["symbol", "timeframe", "timestamp", "open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    EmptyInput,
    MissingHeader(&'static str),
    BadTimestamp { line: usize, value: String },
    BadTimeframe { line: usize, value: String },
    BadNumber { line: usize, column: &'static str, value: String },
    BadBar { line: usize, reason: BarValidationError },
    Io(String),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::EmptyInput => write!(f, "empty input"),
            LoadError::MissingHeader(h) => write!(f, "missing header: {h}"),
            LoadError::BadTimestamp { line, value } => {
                write!(f, "bad timestamp at line {line}: {value}")
            }
            LoadError::BadTimeframe { line, value } => {
                write!(f, "bad timeframe at line {line}: {value}")
            }
            LoadError::BadNumber { line, column, value } => {
                write!(f, "bad number in column {column} at line {line}: {value}")
            }
            LoadError::BadBar { line, reason } => write!(f, "invalid bar at line {line}: {reason}"),
            LoadError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Load a bar series from a CSV file on disk.
pub fn load_csv_file(path: impl AsRef<Path>) -> Result<Vec<Bar>, LoadError> {
    let s = fs::read_to_string(path)?;
    parse_csv_bars(&s)
}

/// Parse a bar series from CSV content, sorted by `(symbol, timestamp)`
/// ascending so a multi-symbol file feeds the engine in the order it
/// requires without the caller having to sort first.
pub fn parse_csv_bars(csv: &str) -> Result<Vec<Bar>, LoadError> {
    let mut lines = csv.lines();

    let header_line = lines.next().ok_or(LoadError::EmptyInput)?;
    let header_line = header_line.trim().trim_start_matches('\u{feff}');
    if header_line.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let headers: Vec<String> = header_line.split(',').map(|s| s.trim().to_string()).collect();
    let mut idx: BTreeMap<String, usize> = BTreeMap::new();
    for (i, h) in headers.iter().enumerate() {
        idx.insert(h.clone(), i);
    }

    let mut cols = BTreeMap::new();
    for name in REQUIRED_HEADERS {
        let i = idx.get(name).copied().ok_or(LoadError::MissingHeader(name))?;
        cols.insert(name, i);
    }

    let mut out = Vec::new();
    for (line_idx0, raw) in lines.enumerate() {
        let line = line_idx0 + 2;
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = raw.split(',').map(|s| s.trim()).collect();
        let get = |name: &'static str| -> &str { fields.get(cols[name]).copied().unwrap_or("") };

        let symbol = get("symbol").to_string();
        let timeframe = Timeframe::parse(get("timeframe")).ok_or_else(|| LoadError::BadTimeframe {
            line,
            value: get("timeframe").to_string(),
        })?;
        let timestamp: DateTime<Utc> = get("timestamp")
            .parse()
            .map_err(|_| LoadError::BadTimestamp { line, value: get("timestamp").to_string() })?;

        let open = parse_f64(get("open"), "open", line)?;
        let high = parse_f64(get("high"), "high", line)?;
        let low = parse_f64(get("low"), "low", line)?;
        let close = parse_f64(get("close"), "close", line)?;
        let volume = get("volume")
            .parse::<u64>()
            .map_err(|_| LoadError::BadNumber { line, column: "volume", value: get("volume").to_string() })?;

        let bar = Bar::new(symbol, timeframe, timestamp, open, high, low, close, volume)
            .map_err(|reason| LoadError::BadBar { line, reason })?;
        out.push(bar);
    }

    out.sort_by(|a, b| a.symbol.cmp(&b.symbol).then_with(|| a.timestamp.cmp(&b.timestamp)));
    Ok(out)
}

fn parse_f64(s: &str, column: &'static str, line: usize) -> Result<f64, LoadError> {
    s.parse::<f64>().map_err(|_| LoadError::BadNumber { line, column, value: s.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_sorts_a_multi_symbol_series() {
        let csv = "symbol,timeframe,timestamp,open,high,low,close,volume\n\
                   2454,D1,2026-01-02T00:00:00Z,100,101,99,100.5,1000\n\
                   2330,D1,2026-01-02T00:00:00Z,50,51,49,50.5,2000\n\
                   2330,D1,2026-01-01T00:00:00Z,49,50,48,49.5,1500\n";
        let bars = parse_csv_bars(csv).expect("parse");
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, "2330");
        assert_eq!(bars[0].timestamp.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(bars[1].symbol, "2330");
        assert_eq!(bars[2].symbol, "2454");
    }

    #[test]
    fn missing_header_is_rejected() {
        let csv = "symbol,timestamp,open,high,low,close,volume\n2330,2026-01-01T00:00:00Z,1,2,1,1,1\n";
        assert_eq!(parse_csv_bars(csv), Err(LoadError::MissingHeader("timeframe")));
    }

    #[test]
    fn invalid_bar_geometry_is_rejected() {
        let csv = "symbol,timeframe,timestamp,open,high,low,close,volume\n\
                   2330,D1,2026-01-01T00:00:00Z,100,90,80,95,1000\n";
        let err = parse_csv_bars(csv).unwrap_err();
        assert!(matches!(err, LoadError::BadBar { line: 2, .. }));
    }
}
