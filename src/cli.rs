use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::capture::{Direction, LiveConfig, DEFAULT_SNAPLEN};
use crate::error::CapstatError;
use crate::output::OutputFormat;
use crate::session::SessionOptions;
use crate::stats::{StatsConfig, DEFAULT_REPORT_INTERVAL, DEFAULT_SAMPLE_INTERVAL};

#[derive(Parser, Debug)]
#[command(
    name = "capstat",
    version,
    about = "Capture raw frames, classify a sample and print rolling statistics"
)]
pub struct Cli {
    /// Network interface to capture on (e.g. eth0)
    #[arg(required_unless_present = "read", conflicts_with = "read")]
    pub interface: Option<String>,

    /// Replay a classic pcap file instead of capturing live
    #[arg(long, value_name = "FILE")]
    pub read: Option<PathBuf>,

    /// Classify every Nth frame
    #[arg(long, value_name = "N", default_value_t = DEFAULT_SAMPLE_INTERVAL, value_parser = validate_interval)]
    pub sample_every: u64,

    /// Print a statistics summary every Mth frame
    #[arg(long, value_name = "M", default_value_t = DEFAULT_REPORT_INTERVAL, value_parser = validate_interval)]
    pub summary_every: u64,

    /// Bytes kept per captured frame
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_SNAPLEN, value_parser = validate_snaplen)]
    pub snaplen: u32,

    /// Longest wait for a frame before checking for shutdown, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500, value_parser = validate_poll_timeout)]
    pub poll_timeout_ms: u64,

    /// Which traffic to capture relative to this host
    #[arg(long, default_value = "both")]
    pub direction: DirectionArg,

    /// Do not put the interface into promiscuous mode
    #[arg(long)]
    pub no_promisc: bool,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionArg {
    Rx,
    Tx,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Rx => Direction::Rx,
            DirectionArg::Tx => Direction::Tx,
            DirectionArg::Both => Direction::Both,
        }
    }
}

fn validate_interval(s: &str) -> Result<u64, String> {
    let val: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val == 0 {
        Err("interval must be at least 1 frame".to_string())
    } else {
        Ok(val)
    }
}

fn validate_snaplen(s: &str) -> Result<u32, String> {
    let val: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val < 64 {
        Err("snaplen must be at least 64 bytes".to_string())
    } else if val > 65535 {
        Err("snaplen must be at most 65535 bytes".to_string())
    } else {
        Ok(val)
    }
}

fn validate_poll_timeout(s: &str) -> Result<u64, String> {
    let val: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val < 10 {
        Err("poll timeout must be at least 10 ms".to_string())
    } else if val > 5000 {
        Err("poll timeout must be at most 5000 ms".to_string())
    } else {
        Ok(val)
    }
}

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Live(LiveConfig),
    File(PathBuf),
}

/// CLI configuration resolved into the types the library consumes.
#[derive(Debug, Clone)]
pub struct ResolvedCli {
    pub source: SourceConfig,
    pub stats: StatsConfig,
    pub session: SessionOptions,
}

impl Cli {
    pub fn resolve(self) -> Result<ResolvedCli, CapstatError> {
        let source = match (self.read, self.interface) {
            (Some(path), _) => SourceConfig::File(path),
            (None, Some(interface)) => SourceConfig::Live(LiveConfig {
                interface,
                snaplen: self.snaplen,
                promiscuous: !self.no_promisc,
                direction: self.direction.into(),
            }),
            (None, None) => {
                return Err(CapstatError::InvalidConfig(
                    "an interface or --read <FILE> is required".to_string(),
                ))
            }
        };
        Ok(ResolvedCli {
            source,
            stats: StatsConfig::new(self.sample_every, self.summary_every)?,
            session: SessionOptions {
                poll_timeout: Duration::from_millis(self.poll_timeout_ms),
                format: self.format,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    fn resolved(args: &[&str]) -> ResolvedCli {
        parse(args).unwrap().resolve().unwrap()
    }

    #[test]
    fn interface_only_uses_defaults() {
        let cli = resolved(&["capstat", "eth0"]);
        match cli.source {
            SourceConfig::Live(live) => {
                assert_eq!(live.interface, "eth0");
                assert_eq!(live.snaplen, 1536);
                assert!(live.promiscuous);
                assert_eq!(live.direction, Direction::Both);
            }
            other => panic!("expected live source, got {other:?}"),
        }
        assert_eq!(cli.stats, StatsConfig::default());
        assert_eq!(cli.session.poll_timeout, Duration::from_millis(500));
        assert_eq!(cli.session.format, OutputFormat::Text);
    }

    #[test]
    fn no_arguments_is_an_error() {
        assert!(parse(&["capstat"]).is_err());
    }

    #[test]
    fn two_interfaces_is_an_error() {
        assert!(parse(&["capstat", "eth0", "eth1"]).is_err());
    }

    #[test]
    fn read_replaces_interface() {
        let cli = resolved(&["capstat", "--read", "trace.pcap"]);
        assert!(matches!(cli.source, SourceConfig::File(ref p) if p == &PathBuf::from("trace.pcap")));
    }

    #[test]
    fn read_conflicts_with_interface() {
        assert!(parse(&["capstat", "eth0", "--read", "trace.pcap"]).is_err());
    }

    #[test]
    fn intervals() {
        let cli = resolved(&["capstat", "eth0", "--sample-every", "5", "--summary-every", "50"]);
        assert_eq!(cli.stats.sample_interval(), 5);
        assert_eq!(cli.stats.report_interval(), 50);
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(parse(&["capstat", "eth0", "--sample-every", "0"]).is_err());
        assert!(parse(&["capstat", "eth0", "--summary-every", "0"]).is_err());
    }

    #[test]
    fn snaplen_bounds() {
        assert!(parse(&["capstat", "eth0", "--snaplen", "63"]).is_err());
        assert!(parse(&["capstat", "eth0", "--snaplen", "65536"]).is_err());
        let cli = resolved(&["capstat", "eth0", "--snaplen", "9000"]);
        assert!(matches!(cli.source, SourceConfig::Live(ref l) if l.snaplen == 9000));
    }

    #[test]
    fn poll_timeout_bounds() {
        assert!(parse(&["capstat", "eth0", "--poll-timeout-ms", "5"]).is_err());
        assert!(parse(&["capstat", "eth0", "--poll-timeout-ms", "6000"]).is_err());
        let cli = resolved(&["capstat", "eth0", "--poll-timeout-ms", "100"]);
        assert_eq!(cli.session.poll_timeout, Duration::from_millis(100));
    }

    #[test]
    fn direction_and_promisc() {
        let cli = resolved(&["capstat", "eth0", "--direction", "rx", "--no-promisc"]);
        match cli.source {
            SourceConfig::Live(live) => {
                assert_eq!(live.direction, Direction::Rx);
                assert!(!live.promiscuous);
            }
            other => panic!("expected live source, got {other:?}"),
        }
        assert!(parse(&["capstat", "eth0", "--direction", "sideways"]).is_err());
    }

    #[test]
    fn json_format() {
        let cli = resolved(&["capstat", "eth0", "--format", "json"]);
        assert_eq!(cli.session.format, OutputFormat::Json);
        assert!(parse(&["capstat", "eth0", "--format", "xml"]).is_err());
    }
}
