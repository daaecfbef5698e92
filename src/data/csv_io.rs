//! Delimited table ingestion and serialization
//!
//! Readers and writers work on any `Read`/`Write`; locating files is left to
//! the caller. Header names are matched case-insensitively and normalized to
//! lowercase. The first column of every table is its time-of-day index.

use crate::config::MarketMode;
use crate::data::bar::{Bar, BarSequence, Column, DerivedColumn};
use crate::data::curve::ReferenceCurves;
use crate::error::{Result, StylizedFactsError};
use crate::types::{parse_time_of_day, Event, SessionId, TimeOfDay};
use csv::{ReaderBuilder, StringRecord, Writer};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Column names of a tick table
#[derive(Debug, Clone)]
pub struct TickFormat {
    pub price_column: String,
    pub volume_column: String,
    pub session_column: String,
}

impl TickFormat {
    /// Layout of simulator output (average event price, session id)
    pub fn synthetic() -> Self {
        Self {
            price_column: "event_price (avg)".to_string(),
            ..Self::default()
        }
    }
}

impl Default for TickFormat {
    fn default() -> Self {
        Self {
            price_column: "market_price".to_string(),
            volume_column: "event_volume".to_string(),
            session_column: "session_id".to_string(),
        }
    }
}

fn lowercase_headers(headers: &StringRecord) -> Vec<String> {
    headers.iter().map(|h| h.trim().to_lowercase()).collect()
}

/// Find column index by name
fn find_column(headers: &[String], name: &str) -> Result<usize> {
    let name = name.trim().to_lowercase();
    headers
        .iter()
        .position(|h| *h == name)
        .ok_or_else(|| StylizedFactsError::DataError(format!("Column '{}' not found", name)))
}

fn field<'r>(record: &'r StringRecord, idx: usize, row: usize) -> Result<&'r str> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| StylizedFactsError::DataError(format!("Row {} is missing field {}", row, idx)))
}

/// Parse a float; empty and `nan` cells become NaN
fn parse_number(s: &str, what: &str, row: usize) -> Result<f64> {
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .map_err(|_| StylizedFactsError::ParseError(format!("Invalid {} '{}' in row {}", what, s, row)))
}

fn parse_price(s: &str, what: &str, row: usize) -> Result<Option<f64>> {
    let v = parse_number(s, what, row)?;
    Ok((!v.is_nan()).then_some(v))
}

/// Read a tick table into events
///
/// Real-market rows are stamped with the parsed index time; synthetic rows
/// with the session id column (1 or 2).
pub fn read_ticks<R: Read>(reader: R, format: &TickFormat, mode: MarketMode) -> Result<Vec<Event>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = lowercase_headers(rdr.headers()?);
    let price_idx = find_column(&headers, &format.price_column)?;
    let volume_idx = find_column(&headers, &format.volume_column)?;
    let session_idx = match mode {
        MarketMode::Synthetic => Some(find_column(&headers, &format.session_column)?),
        MarketMode::Real => None,
    };

    let mut events = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let price = parse_number(field(&record, price_idx, row)?, "price", row)?;
        let volume = parse_number(field(&record, volume_idx, row)?, "volume", row)?;

        let event = match session_idx {
            Some(idx) => {
                let raw = field(&record, idx, row)?;
                let id = raw.parse::<f64>().map_err(|_| {
                    StylizedFactsError::ParseError(format!("Invalid session id '{}' in row {}", raw, row))
                })?;
                Event::in_session(SessionId::from_number(id as i64)?, price, volume)
            }
            None => Event::timed(parse_time_of_day(field(&record, 0, row)?)?, price, volume),
        };
        events.push(event);
    }

    log::debug!("Read {} tick events", events.len());
    Ok(events)
}

/// Read an OHLCV table; derived columns already present are kept
pub fn read_ohlcv<R: Read>(reader: R) -> Result<BarSequence> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = lowercase_headers(rdr.headers()?);

    let open_idx = find_column(&headers, "open")?;
    let high_idx = find_column(&headers, "high")?;
    let low_idx = find_column(&headers, "low")?;
    let close_idx = find_column(&headers, "close")?;
    let volume_idx = find_column(&headers, "volume")?;
    let events_idx = find_column(&headers, "num_events")?;
    let derived_idx: Vec<(DerivedColumn, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| DerivedColumn::from_name(h).map(|c| (c, i)))
        .collect();

    let mut bars = Vec::new();
    let mut derived: BTreeMap<DerivedColumn, Vec<f64>> = BTreeMap::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let time = parse_time_of_day(field(&record, 0, row)?)?;
        let num_events = parse_number(field(&record, events_idx, row)?, "num_events", row)?;

        bars.push(Bar {
            time,
            open: parse_price(field(&record, open_idx, row)?, "open", row)?,
            high: parse_price(field(&record, high_idx, row)?, "high", row)?,
            low: parse_price(field(&record, low_idx, row)?, "low", row)?,
            close: parse_price(field(&record, close_idx, row)?, "close", row)?,
            volume: parse_number(field(&record, volume_idx, row)?, "volume", row)?,
            num_events: if num_events.is_nan() { 0 } else { num_events as u64 },
        });

        for &(column, idx) in &derived_idx {
            let value = parse_number(field(&record, idx, row)?, column.name(), row)?;
            derived.entry(column).or_default().push(value);
        }
    }

    BarSequence::from_parts(bars, derived)
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn format_time(time: TimeOfDay) -> String {
    time.format("%H:%M:%S%.f").to_string()
}

/// Write a bar sequence with all attached derived columns
pub fn write_ohlcv<W: Write>(sequence: &BarSequence, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    let derived: Vec<DerivedColumn> = sequence.derived_columns().collect();

    let mut header = vec!["time".to_string()];
    header.extend(
        [
            Column::Open,
            Column::High,
            Column::Low,
            Column::Close,
            Column::Volume,
            Column::NumEvents,
        ]
        .iter()
        .map(|c| c.name().to_string()),
    );
    header.extend(derived.iter().map(|c| c.name().to_string()));
    wtr.write_record(&header)?;

    for (i, bar) in sequence.bars().iter().enumerate() {
        let mut record = vec![
            format_time(bar.time),
            format_optional(bar.open),
            format_optional(bar.high),
            format_optional(bar.low),
            format_optional(bar.close),
            bar.volume.to_string(),
            bar.num_events.to_string(),
        ];
        for column in &derived {
            let value = sequence.derived(*column).and_then(|v| v.get(i)).copied();
            record.push(format_optional(value));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read a reference curve table (one column per historical run)
pub fn read_reference_curves<R: Read>(reader: R) -> Result<ReferenceCurves> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let names: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut index = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        index.push(parse_time_of_day(field(&record, 0, row)?)?);
        for (col, column_values) in values.iter_mut().enumerate() {
            let raw = field(&record, col + 1, row)?;
            column_values.push(parse_number(raw, &names[col], row)?);
        }
    }

    ReferenceCurves::new(index, names.into_iter().zip(values).collect())
}

/// Write a reference curve table
pub fn write_reference_curves<W: Write>(curves: &ReferenceCurves, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    let mut header = vec!["time".to_string()];
    header.extend(curves.names().map(str::to_string));
    wtr.write_record(&header)?;

    for (i, time) in curves.index().iter().enumerate() {
        let mut record = vec![format_time(*time)];
        record.extend(curves.columns().iter().map(|(_, v)| v[i].to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_read_real_ticks() {
        let data = "time,Market_Price,event_volume\n\
                    09:00:00.357000,100.5,10\n\
                    09:00:01.000000,101.0,5\n";
        let events = read_ticks(data.as_bytes(), &TickFormat::default(), MarketMode::Real).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].price, 100.5);
        assert_eq!(
            events[0].time,
            Some(NaiveTime::from_hms_milli_opt(9, 0, 0, 357).unwrap())
        );
        assert!(events[0].session.is_none());
    }

    #[test]
    fn test_read_synthetic_ticks() {
        let data = "idx,event_price (avg),event_volume,session_id\n\
                    0,100.0,1,1\n\
                    1,100.2,3,2.0\n";
        let events =
            read_ticks(data.as_bytes(), &TickFormat::synthetic(), MarketMode::Synthetic).unwrap();
        assert_eq!(events[0].session, Some(SessionId::Session1));
        assert_eq!(events[1].session, Some(SessionId::Session2));
        assert_eq!(events[1].volume, 3.0);
    }

    #[test]
    fn test_read_ticks_bad_time() {
        let data = "time,market_price,event_volume\nnot-a-time,100.0,1\n";
        let result = read_ticks(data.as_bytes(), &TickFormat::default(), MarketMode::Real);
        assert!(matches!(result, Err(StylizedFactsError::ParseError(_))));
    }

    #[test]
    fn test_read_ohlcv_normalizes_headers() {
        let data = "Time,Open,High,Low,Close,Volume,Num_Events,Scaled_Volume\n\
                    09:00:00,100,101,99,100.5,10,2,0.5\n\
                    09:01:00,,,,100.5,0,0,0.0\n\
                    09:02:00,100.5,102,100,101,10,1,0.5\n";
        let seq = read_ohlcv(data.as_bytes()).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.bars()[1].open, None);
        assert_eq!(seq.bars()[1].close, Some(100.5));
        assert_eq!(seq.derived(DerivedColumn::ScaledVolume), Some(&[0.5, 0.0, 0.5][..]));
    }

    #[test]
    fn test_read_ohlcv_missing_column() {
        let data = "time,open,high,low,close,volume\n09:00:00,1,1,1,1,1\n";
        assert!(matches!(
            read_ohlcv(data.as_bytes()),
            Err(StylizedFactsError::DataError(_))
        ));
    }

    #[test]
    fn test_ohlcv_write_then_read() {
        let data = "time,open,high,low,close,volume,num_events\n\
                    09:00:00,100,101,99,100.5,10,2\n\
                    09:01:00,,,,100.5,0,0\n";
        let seq = read_ohlcv(data.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_ohlcv(&seq, &mut buf).unwrap();
        assert_eq!(read_ohlcv(buf.as_slice()).unwrap(), seq);
    }

    #[test]
    fn test_reference_curves_table() {
        let data = "time,run_a,run_b\n09:00:00,0.1,0.3\n09:01:00,1.0,1.0\n";
        let curves = read_reference_curves(data.as_bytes()).unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves.names().collect::<Vec<_>>(), vec!["run_a", "run_b"]);

        let mut buf = Vec::new();
        write_reference_curves(&curves, &mut buf).unwrap();
        assert_eq!(read_reference_curves(buf.as_slice()).unwrap(), curves);
    }
}
