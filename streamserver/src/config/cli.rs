//! Command line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Tracks which followed channels are live and serves the latest snapshot.
#[derive(Parser, Debug, Clone)]
#[command(name = "streamserver", version, about, long_about = None)]
pub struct Args {
    /// Address to serve on; an empty value disables serving
    #[arg(short = 'a', long = "address", default_value = "http://0.0.0.0:8181")]
    pub address: String,

    /// OAuth redirect URI registered with the application
    #[arg(
        short = 'e',
        long = "redirect",
        default_value = "http://localhost:8181/oauth-callback"
    )]
    pub redirect_uri: String,

    /// Refresh interval (e.g. 300, 300s, 5m, 1h30m)
    #[arg(short = 'r', long = "refresh", default_value = "5m", value_parser = parse_duration)]
    pub refresh: Duration,

    /// Load cached credentials at startup
    #[arg(
        short = 'u',
        long = "use-cache",
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub use_cache: bool,

    /// Do not poll strims.gg
    #[arg(long = "no-secondary")]
    pub no_secondary: bool,

    /// Log every live/offline transition
    #[arg(long = "log-transitions")]
    pub log_transitions: bool,

    /// Directory for log files [default: <cache dir>/logs]
    #[arg(long = "log-dir", env = "STREAMSERVER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Configuration directory [default: platform config dir]
    #[arg(long = "config-dir", env = "STREAMSERVER_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Cache directory [default: platform cache dir]
    #[arg(long = "cache-dir", env = "STREAMSERVER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Parse a duration such as `300`, `45s`, `5m`, `1h` or `1h30m`.
///
/// A bare number is seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = input.parse::<u64>() {
        return non_zero(Duration::from_secs(secs));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("invalid duration unit '{}' in '{}'", c, input)),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("missing number before '{}' in '{}'", c, input))?;
        total = value
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| format!("duration '{}' is too large", input))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!("missing unit after '{}' in '{}'", digits, input));
    }

    non_zero(Duration::from_secs(total))
}

fn non_zero(duration: Duration) -> Result<Duration, String> {
    if duration.is_zero() {
        Err("duration must be greater than zero".to_string())
    } else {
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("300"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("300s"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("2m5s"), Ok(Duration::from_secs(125)));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("1h30").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["streamserver"]);

        assert_eq!(args.address, "http://0.0.0.0:8181");
        assert_eq!(args.redirect_uri, "http://localhost:8181/oauth-callback");
        assert_eq!(args.refresh, Duration::from_secs(300));
        assert!(args.use_cache);
        assert!(!args.no_secondary);
        assert!(!args.log_transitions);
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "streamserver",
            "-a",
            "",
            "-r",
            "90s",
            "-u=false",
            "--no-secondary",
            "--log-transitions",
        ]);

        assert_eq!(args.address, "");
        assert_eq!(args.refresh, Duration::from_secs(90));
        assert!(!args.use_cache);
        assert!(args.no_secondary);
        assert!(args.log_transitions);
    }
}
