//! Tolerant parser for `ss -into` output.
//!
//! `ss` prints each established connection as two lines: an address line
//! (`Recv-Q Send-Q Local:Port Peer:Port [timer/ino/sk…]`) followed by an
//! indented TCP info line of whitespace-separated tokens. Each token is one of
//!
//! - `key:value` (e.g. `cwnd:10`, `rtt:0.25/0.12`), split on the first `:`,
//! - a throughput ending in `Kbps` or `Mbps`, folded into a synthetic
//!   [`RATE_FIELD`] expressed in Mbps,
//! - a bare flag (`cubic`, `sack`, `send`), stored with key == value.
//!
//! Header lines are recognised by content wherever they appear. Anything
//! that does not look like a connection is skipped; nothing here fails.

use std::collections::HashMap;

use log::trace;

/// Synthetic field holding the last throughput token of a block, in Mbps.
pub const RATE_FIELD: &str = "RATE";

/// First column of header lines `ss` may print.
const HEADER_MARKERS: &[&str] = &["Recv-Q", "State", "Netid"];

/// Field name → value for one connection. Later tokens overwrite earlier ones.
pub type FieldMap = HashMap<String, String>;

/// A single classified token from a TCP info line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `key:value`, split on the first colon.
    Pair { key: String, value: String },
    /// Throughput normalised to Mbps.
    Rate(String),
    /// Bare presence marker.
    Flag(String),
}

impl Token {
    /// Store this token in `map`, replacing any earlier value for the key.
    fn insert_into(self, map: &mut FieldMap) {
        match self {
            Token::Pair { key, value } => {
                map.insert(key, value);
            }
            Token::Rate(mbps) => {
                map.insert(RATE_FIELD.to_string(), mbps);
            }
            Token::Flag(name) => {
                map.insert(name.clone(), name);
            }
        }
    }
}

/// One connection's parsed output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionBlock {
    /// Local `address:port` column.
    pub local: String,
    /// Peer `address:port` column.
    pub peer: String,
    pub fields: FieldMap,
}

/// Classify a single whitespace-free token.
///
/// Returns `None` for malformed tokens (empty key, rate suffix without a
/// numeric prefix); callers skip those.
pub fn classify_token(token: &str) -> Option<Token> {
    if let Some((key, value)) = token.split_once(':') {
        if key.is_empty() {
            return None;
        }
        return Some(Token::Pair {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    if let Some(prefix) = token.strip_suffix("Kbps") {
        return kbps_to_mbps(prefix).map(Token::Rate);
    }

    if let Some(prefix) = token.strip_suffix("Mbps") {
        prefix.parse::<f64>().ok()?;
        return Some(Token::Rate(prefix.to_string()));
    }

    if token.is_empty() {
        return None;
    }
    Some(Token::Flag(token.to_string()))
}

/// Parse a TCP info line into a field map.
pub fn parse_tcp_info(line: &str) -> FieldMap {
    let mut map = FieldMap::new();
    for raw in line.split_whitespace() {
        match classify_token(raw) {
            Some(token) => token.insert_into(&mut map),
            None => trace!("skipping malformed token {raw:?}"),
        }
    }
    map
}

/// Look up `fields` in order. Absent fields become empty strings so every
/// record has the same width.
pub fn extract_fields(map: &FieldMap, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|f| map.get(f).cloned().unwrap_or_default())
        .collect()
}

/// Convert a plain decimal Kbps figure to Mbps by moving the decimal point
/// three places, so no binary rounding reaches the output
/// (`123.4` -> `0.1234`, `1000` -> `1.0`).
///
/// Returns `None` unless `kbps` is digits with at most one `.`.
fn kbps_to_mbps(kbps: &str) -> Option<String> {
    let (int_part, frac_part) = kbps.split_once('.').unwrap_or((kbps, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.len() + frac_part.len() == 0 || !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let padded = format!("{int_part:0>4}");
    let (whole, thousandths) = padded.split_at(padded.len() - 3);
    let whole = whole.trim_start_matches('0');
    let frac = format!("{thousandths}{frac_part}");
    let frac = frac.trim_end_matches('0');

    Some(format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if frac.is_empty() { "0" } else { frac }
    ))
}

fn is_header(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|first| HEADER_MARKERS.contains(&first))
}

fn is_queue_column(col: &str) -> bool {
    !col.is_empty() && col.bytes().all(|b| b.is_ascii_digit())
}

/// Extract `(local, peer)` from an address line.
///
/// Accepts lines with or without a leading state column
/// (`ESTAB 0 0 a b` as well as `0 0 a b`).
fn parse_address_line(line: &str) -> Option<(String, String)> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    let start = (0..=1).find(|&i| {
        cols.len() >= i + 4 && is_queue_column(cols[i]) && is_queue_column(cols[i + 1])
    })?;
    Some((cols[start + 2].to_string(), cols[start + 3].to_string()))
}

/// Parse complete `ss` output into connection blocks, in output order.
///
/// - header lines are skipped wherever they occur;
/// - a line that is neither header nor address line is skipped;
/// - an address line followed by another address line (no info line) is
///   dropped;
/// - a trailing address line with nothing after it is ignored.
pub fn parse_ss_output(text: &str) -> Vec<ConnectionBlock> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut blocks = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        if is_header(line) {
            idx += 1;
            continue;
        }

        let Some((local, peer)) = parse_address_line(line) else {
            trace!("skipping stray line {line:?}");
            idx += 1;
            continue;
        };

        let Some(info) = lines.get(idx + 1) else {
            break;
        };
        if is_header(info) || parse_address_line(info).is_some() {
            trace!("connection {local} -> {peer} has no info line");
            idx += 1;
            continue;
        }

        blocks.push(ConnectionBlock {
            local,
            peer,
            fields: parse_tcp_info(info),
        });
        idx += 2;
    }

    blocks
}

/// Shortest round-trip decimal, keeping one fractional digit for whole
/// numbers (`1.0`, `0.8`, `1712345678.25`).
pub fn format_decimal(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
