//! CSV export of buffered readings.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::{Reading, TS_FIELD};

// ---

/// Union of field names across `readings`, in first-seen order, then `ts`.
pub fn columns<'a, I>(readings: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Reading>,
{
    // ---
    let mut columns: Vec<String> = Vec::new();
    for reading in readings {
        for key in reading.fields.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns.push(TS_FIELD.to_string());
    columns
}

/// Serialize readings as CSV with a header row.
///
/// Absent fields are written as empty cells. Nested values are written as
/// compact JSON.
pub fn to_csv<'a, I>(readings: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Reading> + Clone,
{
    // ---
    let columns = columns(readings.clone());
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&columns)
        .context("Failed to write CSV header")?;

    for reading in readings {
        let row = columns.iter().map(|column| {
            if column == TS_FIELD {
                reading.ts.clone()
            } else {
                reading.get(column).map(cell).unwrap_or_default()
            }
        });
        writer
            .write_record(row)
            .with_context(|| format!("Failed to write CSV row for reading #{}", reading.seq))?;
    }

    writer.into_inner().context("Failed to flush CSV writer")
}

fn cell(value: &Value) -> String {
    // ---
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::decode_payload;
    use chrono::{FixedOffset, TimeZone, Utc};

    fn reading(seq: u64, body: &str, second: u32) -> Reading {
        // ---
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 1, 2, second).unwrap();
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        Reading::new(seq, decode_payload(body.as_bytes()), at, &offset)
    }

    #[test]
    fn test_heterogeneous_rows_use_column_union() {
        // ---
        let readings = vec![
            reading(0, r#"{"suhu": 25.5}"#, 1),
            reading(1, r#"{"suhu": 26, "ldr": 700}"#, 2),
            reading(2, "garbage", 3),
        ];

        let csv = String::from_utf8(to_csv(&readings).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "suhu,ldr,raw,ts");
        assert_eq!(lines[1], "25.5,,,08:02:01");
        assert_eq!(lines[2], "26,700,,08:02:02");
        assert_eq!(lines[3], ",,garbage,08:02:03");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_values_are_quoted_when_needed() {
        // ---
        let readings = vec![reading(0, r#"{"note": "hot, humid", "meta": {"a": 1}, "x": null}"#, 0)];

        let csv = String::from_utf8(to_csv(&readings).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "note,meta,x,ts");
        assert_eq!(lines[1], r#""hot, humid","{""a"":1}",,08:02:00"#);
    }

    #[test]
    fn test_empty_input_yields_header_only() {
        // ---
        let readings: Vec<Reading> = Vec::new();
        let csv = String::from_utf8(to_csv(&readings).unwrap()).unwrap();
        assert_eq!(csv, "ts\n");
    }
}
