use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::{BacktestError, Bar, Result};
use csv::StringRecord;
use tracing::debug;

/// Column positions of the OHLCV fields, located by header name
#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| BacktestError::CsvError(format!("Missing column '{}'", name)))
        };

        Ok(Self {
            date: find("date")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

/// Load bars from a headered CSV file
///
/// Columns are matched by name, so both `Date,Open,High,Low,Close,Volume`
/// and the `Date,Close,High,Low,Open,Volume` layout written by common
/// market-data downloaders are accepted. Rows with an empty price are skipped.
pub fn load_csv(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path)
        .map_err(|e| BacktestError::DataLoadError(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| BacktestError::CsvError(e.to_string()))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut bars = Vec::new();

    for (row, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| BacktestError::CsvError(e.to_string()))?;

        let prices = [columns.open, columns.high, columns.low, columns.close];
        if prices.iter().any(|&i| record.get(i).map_or(true, str::is_empty)) {
            debug!(row, "skipping row with missing price");
            continue;
        }

        let date = parse_date(field(&record, columns.date, "date")?)?;
        let open = parse_price(&record, columns.open, "open")?;
        let high = parse_price(&record, columns.high, "high")?;
        let low = parse_price(&record, columns.low, "low")?;
        let close = parse_price(&record, columns.close, "close")?;
        let volume = parse_volume(field(&record, columns.volume, "volume")?)?;

        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(bars)
}

/// Load bars from JSON file
pub fn load_json(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path)
        .map_err(|e| BacktestError::DataLoadError(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    let bars: Vec<Bar> = serde_json::from_reader(reader)?;
    Ok(bars)
}

/// Write bars as `date,open,high,low,close,volume` CSV
pub fn write_csv(path: &Path, bars: &[Bar]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| BacktestError::CsvError(e.to_string()))?;
    for bar in bars {
        writer
            .serialize(bar)
            .map_err(|e| BacktestError::CsvError(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn field<'a>(record: &'a StringRecord, index: usize, name: &str) -> Result<&'a str> {
    record
        .get(index)
        .ok_or_else(|| BacktestError::CsvError(format!("Missing {} value", name)))
}

fn parse_price(record: &StringRecord, index: usize, name: &str) -> Result<f64> {
    let raw = field(record, index, name)?;
    raw.parse()
        .map_err(|_| BacktestError::CsvError(format!("Invalid {} price: {}", name, raw)))
}

/// Volumes may be written as integers or as reals ("1234.5"); empty means zero
fn parse_volume(raw: &str) -> Result<f64> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(BacktestError::CsvError(format!("Invalid volume: {}", raw))),
    }
}

/// Parse a trading date from the formats found in daily-bar exports
fn parse_date(s: &str) -> Result<NaiveDate> {
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    // Timestamps with an exchange offset, e.g. "2024-01-15 00:00:00-05:00"
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.date_naive());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(BacktestError::CsvError(format!("Unable to parse date: {}", s)))
}
