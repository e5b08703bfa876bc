//! CSV export and import of data frames.
//!
//! Masked cells are written as empty fields and times as RFC 3339. On import
//! each column takes the narrowest type every non-empty field parses as:
//! integer, float, RFC 3339 time, then text.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use cf_dataset::{MaskedArray, Value};
use chrono::{DateTime, Utc};
use dsg::DataFrame;

/// Write a frame with a header row.
pub fn write_frame<W: Write>(frame: &DataFrame, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(frame.column_names())?;

    for row in 0..frame.len() {
        let record: Vec<String> = frame
            .columns()
            .iter()
            .map(|c| c.values.get(row).map(|v| format_cell(&v)).unwrap_or_default())
            .collect();
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Float(v) => format_float(*v as f64),
        Value::Double(v) => format_float(*v),
        other => other.to_string(),
    }
}

/// Whole floats keep a decimal point so they read back as floats.
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// Read a frame from CSV with a header row.
pub fn read_frame<R: Read>(reader: R) -> Result<DataFrame> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (i, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("reading CSV record {}", i + 1))?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, fields)| (name, infer_column(&fields)));
    Ok(DataFrame::from_columns(columns)?)
}

fn infer_column(fields: &[String]) -> MaskedArray {
    let present = || fields.iter().filter(|f| !f.is_empty());

    if present().all(|f| f.parse::<i64>().is_ok()) && present().next().is_some() {
        MaskedArray::Int64(fields.iter().map(|f| f.parse().ok()).collect())
    } else if present().all(|f| f.parse::<f64>().is_ok()) {
        MaskedArray::Double(fields.iter().map(|f| f.parse().ok()).collect())
    } else if present().all(|f| parse_time(f).is_some()) {
        MaskedArray::Time(fields.iter().map(|f| parse_time(f)).collect())
    } else {
        MaskedArray::Text(
            fields
                .iter()
                .map(|f| (!f.is_empty()).then(|| f.clone()))
                .collect(),
        )
    }
}

fn parse_time(field: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(field)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_infer_column_types() {
        let fields = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            infer_column(&fields(&["1", "", "3"])),
            MaskedArray::Int64(vec![Some(1), None, Some(3)])
        );
        assert_eq!(
            infer_column(&fields(&["1", "2.5"])),
            MaskedArray::Double(vec![Some(1.0), Some(2.5)])
        );
        assert_eq!(
            infer_column(&fields(&["", ""])),
            MaskedArray::Double(vec![None, None])
        );
        assert_eq!(
            infer_column(&fields(&["2020-01-01T00:00:00Z"])),
            MaskedArray::Time(vec![Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())])
        );
        assert_eq!(
            infer_column(&fields(&["buoy-a", ""])),
            MaskedArray::Text(vec![Some("buoy-a".to_string()), None])
        );
    }

    #[test]
    fn test_write_then_read() {
        let frame = DataFrame::from_columns([
            (
                "t",
                MaskedArray::Time(vec![
                    Some(Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap()),
                    Some(Utc.with_ymd_and_hms(1990, 1, 1, 1, 0, 0).unwrap()),
                ]),
            ),
            ("station", MaskedArray::Text(vec![Some("a".into()), Some("b".into())])),
            ("x", MaskedArray::Double(vec![Some(-70.0), Some(-70.5)])),
            ("temp", MaskedArray::Float(vec![Some(1.5), None])),
        ])
        .unwrap();

        let mut buf = Vec::new();
        write_frame(&frame, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("t,station,x,temp\n1990-01-01T00:00:00Z,a,-70.0,1.5\n"));
        assert!(text.ends_with(",\n"));

        let back = read_frame(buf.as_slice()).unwrap();
        assert_eq!(back.column("t"), frame.column("t"));
        assert_eq!(back.column("x"), frame.column("x"));
        assert_eq!(
            back.column("temp").unwrap(),
            &MaskedArray::Double(vec![Some(1.5), None])
        );
    }
}
