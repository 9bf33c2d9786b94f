pub mod parse;
pub mod probe;
pub mod record;

use std::time::Duration;

use cwndlog_core::{DEFAULT_FIELDS, EXTENDED_FIELDS, SsCommand, field_list};

/// Build the output field list from `--fields` / `--extended`.
pub fn resolve_fields(fields: Option<&str>, extended: bool) -> Vec<String> {
    if extended {
        return field_list(EXTENDED_FIELDS);
    }
    match fields {
        Some(list) => {
            let names: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                eprintln!("Warning: empty --fields, using {}", DEFAULT_FIELDS.join(","));
                field_list(DEFAULT_FIELDS)
            } else {
                names
            }
        }
        None => field_list(DEFAULT_FIELDS),
    }
}

/// Build the `ss` source, honouring `--ss-path`.
pub fn make_source(ss_path: Option<&str>) -> SsCommand {
    ss_path.map_or_else(SsCommand::new, SsCommand::with_program)
}

/// Parse a duration string like "20ms", "30s", "5m", "1h".
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (s, 1000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;

    value
        .checked_mul(multiplier)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration too large: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_duration tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("20ms"), Ok(Duration::from_millis(20)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    }

    #[test]
    fn test_parse_duration_bare_number_is_seconds() {
        assert_eq!(parse_duration("2"), Ok(Duration::from_secs(2)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    // -----------------------------------------------------------------------
    // resolve_fields tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_resolve_fields_default() {
        assert_eq!(resolve_fields(None, false), vec!["cwnd"]);
    }

    #[test]
    fn test_resolve_fields_list() {
        assert_eq!(
            resolve_fields(Some("cwnd, ssthresh,RATE"), false),
            vec!["cwnd", "ssthresh", "RATE"]
        );
    }

    #[test]
    fn test_resolve_fields_extended() {
        assert_eq!(resolve_fields(None, true).len(), EXTENDED_FIELDS.len());
    }

    #[test]
    fn test_resolve_fields_empty_list_falls_back() {
        assert_eq!(resolve_fields(Some(" , "), false), vec!["cwnd"]);
    }
}
