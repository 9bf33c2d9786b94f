//! StateQuerier: fetch socket state for one port and turn it into samples.

use crate::error::QueryError;
use crate::parser::{extract_fields, parse_ss_output};
use crate::sample::{Sample, unix_seconds_now};
use crate::source::SocketStateSource;

/// Fields recorded when none are configured.
pub const DEFAULT_FIELDS: &[&str] = &["cwnd"];

/// The full set of TCP info fields worth tracking for congestion-control
/// analysis.
pub const EXTENDED_FIELDS: &[&str] = &[
    "ts",
    "sack",
    "coupled",
    "wscale",
    "rto",
    "rtt",
    "mss",
    "cwnd",
    "ssthresh",
    "send",
    "RATE",
    "retrans",
    "unacked",
    "rcv_space",
];

/// Owned copy of a field preset.
pub fn field_list(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Queries a [`SocketStateSource`] and extracts a fixed field list.
///
/// Stateless between calls: repeating a query has no side effects.
pub struct StateQuerier<S> {
    source: S,
    fields: Vec<String>,
}

impl<S: SocketStateSource> StateQuerier<S> {
    pub fn new(source: S, fields: Vec<String>) -> Self {
        Self { source, fields }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Query one port. Zero established connections yields an empty vec.
    ///
    /// Invocation failures are returned as-is; this does not retry.
    pub fn query(&self, run_label: &str, port: u16) -> Result<Vec<Sample>, QueryError> {
        let text = self.source.query(port)?;
        let capture_time = unix_seconds_now();
        Ok(self.samples_from_text(run_label, port, &text, capture_time))
    }

    /// Parse already-captured tool output.
    pub fn samples_from_text(
        &self,
        run_label: &str,
        port: u16,
        text: &str,
        capture_time: f64,
    ) -> Vec<Sample> {
        parse_ss_output(text)
            .into_iter()
            .map(|block| Sample {
                run_label: run_label.to_string(),
                port,
                values: extract_fields(&block.fields, &self.fields),
                local: block.local,
                peer: block.peer,
                capture_time,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl SocketStateSource for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn query(&self, _port: u16) -> Result<String, QueryError> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    impl SocketStateSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn query(&self, port: u16) -> Result<String, QueryError> {
            Err(QueryError::Source(format!("no data for {port}")))
        }
    }

    const ONE_CONN: &str = "\
Recv-Q Send-Q Local Address:Port Peer Address:Port
0 0 10.0.0.1:4242 10.0.0.2:51234
\t cubic cwnd:10 ssthresh:20 send 5.2Mbps
";

    #[test]
    fn query_builds_samples() {
        let q = StateQuerier::new(Canned(ONE_CONN), field_list(&["cwnd", "RATE", "ssthresh"]));
        let samples = q.query("epoch-1", 4242).unwrap();
        assert_eq!(samples.len(), 1);
        let s = &samples[0];
        assert_eq!(s.run_label, "epoch-1");
        assert_eq!(s.port, 4242);
        assert_eq!(s.peer, "10.0.0.2:51234");
        assert_eq!(s.local, "10.0.0.1:4242");
        assert_eq!(s.values, vec!["10", "5.2", "20"]);
        assert!(s.capture_time > 0.0);
    }

    #[test]
    fn no_connections_is_empty_and_repeatable() {
        let q = StateQuerier::new(
            Canned("Recv-Q Send-Q Local Address:Port Peer Address:Port\n"),
            field_list(DEFAULT_FIELDS),
        );
        assert!(q.query("0", 4242).unwrap().is_empty());
        assert!(q.query("0", 4242).unwrap().is_empty());
    }

    #[test]
    fn source_failure_is_surfaced() {
        let q = StateQuerier::new(Broken, field_list(DEFAULT_FIELDS));
        assert!(q.query("0", 4242).is_err());
    }

    #[test]
    fn extended_fields_keep_width() {
        let q = StateQuerier::new(Canned(ONE_CONN), field_list(EXTENDED_FIELDS));
        let samples = q.query("0", 4242).unwrap();
        assert_eq!(samples[0].values.len(), EXTENDED_FIELDS.len());
        assert_eq!(samples[0].values[7], "10");
        assert_eq!(samples[0].values[0], "");
    }
}
