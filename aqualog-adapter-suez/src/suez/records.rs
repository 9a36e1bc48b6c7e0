//! Daily reading parser
//!
//! The statistics endpoint answers with a JSON array of day rows,
//! most-recent-first: `[ "dd/mm/yyyy", usage_m3, index_m3, ... ]`. Readings
//! are converted to liters; rows with no usage yet are dropped.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

pub const LITERS_PER_CUBIC_METER: f64 = 1000.0;

/// One day of water consumption, in liters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConsumptionRecord {
    /// Calendar day the reading covers
    pub date: NaiveDate,
    /// Water used that day
    pub daily_usage_liters: f64,
    /// Meter index at the end of that day
    pub cumulative_index_liters: f64,
}

/// Failures while decoding a day-data payload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("payload is not an array of day rows")]
    WrongShape,

    #[error("day row {0} is not an array of at least three values")]
    BadRow(usize),

    #[error("unparsable date {0:?} in day row")]
    BadDate(String),

    #[error("non-numeric reading {0:?} in day row")]
    BadReading(String),
}

/// Decode one month of day rows into records, oldest first.
///
/// Rows with usage ≤ 0 are skipped: the provider publishes a zero row for
/// days it has not metered yet, so zero never means zero consumption.
pub fn parse_day_rows(payload: &str) -> Result<Vec<ConsumptionRecord>, ParseError> {
    let mut rows = match serde_json::from_str(payload)? {
        Value::Array(rows) => rows,
        _ => return Err(ParseError::WrongShape),
    };
    rows.reverse();

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let cells = row.as_array().ok_or(ParseError::BadRow(index))?;
        if cells.len() < 3 {
            return Err(ParseError::BadRow(index));
        }
        let date_text = cells[0].as_str().ok_or(ParseError::BadRow(index))?;
        let date = NaiveDate::parse_from_str(date_text, "%d/%m/%Y")
            .map_err(|_| ParseError::BadDate(date_text.to_string()))?;

        let daily_usage_liters = numeric(&cells[1])? * LITERS_PER_CUBIC_METER;
        let cumulative_index_liters = numeric(&cells[2])? * LITERS_PER_CUBIC_METER;
        if daily_usage_liters <= 0.0 {
            continue;
        }

        records.push(ConsumptionRecord {
            date,
            daily_usage_liters,
            cumulative_index_liters,
        });
    }
    Ok(records)
}

/// The portal serves readings both as JSON numbers and as strings.
fn numeric(value: &Value) -> Result<f64, ParseError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ParseError::BadReading(n.to_string())),
        Value::String(s) => s
            .parse()
            .map_err(|_| ParseError::BadReading(s.clone())),
        other => Err(ParseError::BadReading(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reverses_scales_and_drops_zero_rows() {
        let payload = r#"[["02/01/2024","1.5","100.0"],["01/01/2024","0","98.5"]]"#;
        let records = parse_day_rows(payload).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(record.daily_usage_liters, 1500.0);
        assert_eq!(record.cumulative_index_liters, 100_000.0);
    }

    #[test]
    fn test_parse_numeric_cells() {
        let payload = r#"[["15/06/2023", 0.42, 731.9]]"#;
        let records = parse_day_rows(payload).unwrap();
        assert_eq!(records[0].daily_usage_liters, 420.0);
        assert_eq!(records[0].cumulative_index_liters, 731_900.0);
    }

    #[test]
    fn test_parse_orders_oldest_first() {
        let payload = r#"[
            ["03/01/2024", "0.3", "101.8"],
            ["02/01/2024", "1.5", "101.5"],
            ["01/01/2024", "0.5", "100.0"]
        ]"#;
        let records = parse_day_rows(payload).unwrap();
        let days: Vec<u32> = records.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(days, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_day_rows("<html>login</html>"),
            Err(ParseError::NotJson(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_array_payload() {
        // valid JSON, wrong shape: the portal answers an object on errors
        assert!(matches!(
            parse_day_rows(r#"{"error":"session expired"}"#),
            Err(ParseError::WrongShape)
        ));
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let payload = r#"[["2024-01-02","1.5","100.0"]]"#;
        assert!(matches!(
            parse_day_rows(payload),
            Err(ParseError::BadDate(_))
        ));
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let payload = r#"[["02/01/2024","1.5"]]"#;
        assert!(matches!(parse_day_rows(payload), Err(ParseError::BadRow(0))));
    }

    #[test]
    fn test_parse_rejects_non_numeric_reading() {
        let payload = r#"[["02/01/2024","n/a","100.0"]]"#;
        assert!(matches!(
            parse_day_rows(payload),
            Err(ParseError::BadReading(_))
        ));
    }
}
