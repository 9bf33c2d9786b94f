//! The per-connection sample and its TSV record form.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::parser::format_decimal;

/// Record delimiter.
pub const DELIMITER: char = '\t';

/// Columns written before the field values: label, blank, time, blank.
pub const LEADING_COLUMNS: usize = 4;

/// One observation of one TCP connection at one poll instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Caller-supplied session tag, identical across a run.
    pub run_label: String,
    /// Local port that was queried.
    pub port: u16,
    /// Local `address:port` of the connection.
    pub local: String,
    /// Peer `address:port` of the connection.
    pub peer: String,
    /// Wall-clock seconds since the Unix epoch when the query returned.
    pub capture_time: f64,
    /// Values of the configured field list, `""` where absent.
    pub values: Vec<String>,
}

impl Sample {
    /// Render as one delimited record (no line terminator).
    ///
    /// Always `LEADING_COLUMNS + values.len()` columns.
    pub fn to_record(&self) -> String {
        let time = format_decimal(self.capture_time);
        let leading = [self.run_label.as_str(), "", time.as_str(), ""];
        let mut record = String::new();
        for (i, column) in leading
            .into_iter()
            .chain(self.values.iter().map(String::as_str))
            .enumerate()
        {
            if i > 0 {
                record.push(DELIMITER);
            }
            push_column(&mut record, column);
        }
        record
    }
}

/// Append a column, quoting it if it contains the delimiter, a quote, or a
/// line break.
fn push_column(out: &mut String, column: &str) {
    let needs_quotes = column
        .chars()
        .any(|c| c == DELIMITER || c == '"' || c == '\n' || c == '\r');
    if !needs_quotes {
        out.push_str(column);
        return;
    }
    out.push('"');
    out.push_str(&column.replace('"', "\"\""));
    out.push('"');
}

/// Current wall-clock time in floating-point seconds.
pub fn unix_seconds_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
