//! `cwndlog parse` - turn captured `ss -into` output into records offline.

use std::io::Read;

use cwndlog_core::{Sample, extract_fields, parse_ss_output};

pub fn run(input: &str, fields: Vec<String>, label: &str) {
    let text = match read_input(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error reading {input}: {e}");
            std::process::exit(1);
        }
    };

    for record in records(&text, &fields, label) {
        println!("{record}");
    }
}

fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
    }
}

/// Render every connection in `text` as a record. The port column comes from
/// the local address and the capture time is unknown (0).
fn records(text: &str, fields: &[String], label: &str) -> Vec<String> {
    parse_ss_output(text)
        .into_iter()
        .map(|block| {
            let port = block
                .local
                .rsplit(':')
                .next()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);
            Sample {
                run_label: label.to_string(),
                port,
                values: extract_fields(&block.fields, fields),
                local: block.local,
                peer: block.peer,
                capture_time: 0.0,
            }
            .to_record()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_from_capture() {
        let text = "\
Recv-Q Send-Q Local Address:Port Peer Address:Port
0 0 10.0.0.1:4242 10.0.0.2:1
\t cwnd:10 ssthresh:7 send 5.2Mbps
";
        let fields = vec!["cwnd".to_string(), "RATE".to_string(), "rtt".to_string()];
        assert_eq!(
            records(text, &fields, "cap"),
            vec!["cap\t\t0.0\t\t10\t5.2\t"]
        );
    }

    #[test]
    fn test_records_empty_capture() {
        assert!(records("", &["cwnd".to_string()], "0").is_empty());
    }
}
