use cwndlog_core::{SocketStateSource, StateQuerier};
use std::time::Instant;

use super::make_source;

pub fn run(port: u16, fields: Vec<String>, ss_path: Option<&str>) {
    let source = make_source(ss_path);
    println!("Probing port {port} via {}", source.program().display());
    println!("  Fields: {}", fields.join(","));
    println!();

    if !source.is_available() {
        eprintln!("{} not found.", source.program().display());
        std::process::exit(1);
    }

    let querier = StateQuerier::new(source, fields);
    let t0 = Instant::now();
    let samples = match querier.query("probe", port) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Query failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = t0.elapsed();

    if samples.is_empty() {
        println!("  No established connections.");
    }
    for s in &samples {
        let pairs: Vec<String> = querier
            .fields()
            .iter()
            .zip(&s.values)
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!("  {} -> {}  {}", s.local, s.peer, pairs.join(" "));
    }
    println!();
    println!("  Time: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
}
