//! CLI argument definitions for ondemand-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// On-demand container daemon for swag.
///
/// Tails the reverse-proxy access log, starts labeled containers when
/// their URLs are requested, and stops them again after a period of
/// inactivity.
#[derive(Parser, Debug)]
#[command(name = "ondemand-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to ondemand.toml configuration file.
    #[arg(short, long, default_value = "/config/ondemand.toml")]
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

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path() {
        let cli = DaemonCli::parse_from(["ondemand-daemon"]);
        assert_eq!(cli.config, PathBuf::from("/config/ondemand.toml"));
        assert!(!cli.validate);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn overrides_parse() {
        let cli = DaemonCli::parse_from([
            "ondemand-daemon",
            "--config",
            "/tmp/test.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
            "--pid-file",
            "/run/ondemand.pid",
        ]);
        assert_eq!(cli.config, PathBuf::from("/tmp/test.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.validate);
        assert_eq!(cli.pid_file.as_deref(), Some("/run/ondemand.pid"));
    }
}
