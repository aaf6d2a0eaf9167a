//! CLI argument definitions for eventpost-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Eventpost log-shipping daemon.
///
/// Reads Windows Event XML from an external source command, normalizes
/// matched records, and forwards them as JSON lines to a TCP sink.
#[derive(Parser, Debug)]
#[command(name = "eventpost-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to eventpost.toml configuration file.
    #[arg(short, long, default_value = "/etc/eventpost/eventpost.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path() {
        let cli = DaemonCli::try_parse_from(["eventpost-daemon"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/eventpost/eventpost.toml"));
        assert!(!cli.validate);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let cli = DaemonCli::try_parse_from([
            "eventpost-daemon",
            "--config",
            "/tmp/custom.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/custom.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.validate);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(DaemonCli::try_parse_from(["eventpost-daemon", "--bogus"]).is_err());
    }
}
