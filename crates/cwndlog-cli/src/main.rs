//! CLI for cwndlog - sample TCP congestion windows to a TSV log.

mod commands;

use std::time::Duration;

use clap::{Parser, Subcommand};

use commands::parse_duration;

#[derive(Parser)]
#[command(name = "cwndlog")]
#[command(about = "cwndlog - high-frequency TCP congestion-window sampler")]
#[command(version = cwndlog_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample a contiguous range of local ports until Ctrl+C or --duration
    Record {
        /// First local (source) port to monitor
        #[arg(long, default_value = "4242")]
        first_port: u16,

        /// Number of contiguous ports (flows) starting at --first-port
        #[arg(long, default_value = "1")]
        flows: u16,

        /// Output TSV file, truncated at start
        #[arg(long, default_value = "cwnd_tcp.tr")]
        output: String,

        /// Run/epoch label stored in every record
        #[arg(long, default_value = "0")]
        label: String,

        /// Comma-separated TCP info fields to record (default: cwnd)
        #[arg(long, conflicts_with = "extended")]
        fields: Option<String>,

        /// Record the extended field set (rto, rtt, mss, cwnd, ssthresh, RATE, ...)
        #[arg(long)]
        extended: bool,

        /// Pause after each pass over all ports (e.g. "20ms", "1s")
        #[arg(long, default_value = "20ms", value_parser = parse_duration)]
        interval: Duration,

        /// Stop automatically after this long (e.g. "30s", "5m"); default: until Ctrl+C
        #[arg(long, value_parser = parse_duration)]
        duration: Option<Duration>,

        /// Path to the ss binary (default: ss from PATH)
        #[arg(long)]
        ss_path: Option<String>,

        /// Also write the run summary as JSON to this path
        #[arg(long)]
        summary: Option<String>,
    },

    /// Query one port once and print its records
    Probe {
        /// Local (source) port to query
        #[arg(long)]
        port: u16,

        /// Comma-separated TCP info fields (default: cwnd)
        #[arg(long, conflicts_with = "extended")]
        fields: Option<String>,

        /// Use the extended field set
        #[arg(long)]
        extended: bool,

        /// Path to the ss binary (default: ss from PATH)
        #[arg(long)]
        ss_path: Option<String>,
    },

    /// Parse saved `ss -into` output into records (offline)
    Parse {
        /// File containing captured ss output ("-" for stdin)
        input: String,

        /// Comma-separated TCP info fields (default: cwnd)
        #[arg(long, conflicts_with = "extended")]
        fields: Option<String>,

        /// Use the extended field set
        #[arg(long)]
        extended: bool,

        /// Run/epoch label stored in every record
        #[arg(long, default_value = "0")]
        label: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            first_port,
            flows,
            output,
            label,
            fields,
            extended,
            interval,
            duration,
            ss_path,
            summary,
        } => commands::record::run(commands::record::RecordCommandConfig {
            first_port,
            flows,
            output: &output,
            label: &label,
            fields: commands::resolve_fields(fields.as_deref(), extended),
            interval,
            duration,
            ss_path: ss_path.as_deref(),
            summary_path: summary.as_deref(),
        }),
        Commands::Probe {
            port,
            fields,
            extended,
            ss_path,
        } => commands::probe::run(
            port,
            commands::resolve_fields(fields.as_deref(), extended),
            ss_path.as_deref(),
        ),
        Commands::Parse {
            input,
            fields,
            extended,
            label,
        } => commands::parse::run(
            &input,
            commands::resolve_fields(fields.as_deref(), extended),
            &label,
        ),
    }
}
