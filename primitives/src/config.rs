//! Environment-derived configuration (spec 6). Loaded once at startup into
//! a value-typed `Config` and threaded by reference from then on (Design
//! Notes 9: "Global config singleton -> passed-in struct").

use std::{env, ops::RangeInclusive, path::Path, time::Duration};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Verbose,
}

impl LogLevel {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "verbose" => Some(Self::Verbose),
            _ => None,
        }
    }

    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            // tracing has no "verbose" directive; map to trace, the closest
            // finer-than-debug level it supports.
            LogLevel::Verbose => "trace",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    pub db_file: String,
    pub error_log_file: String,
    pub combined_log_file: String,
    pub poll_interval: Duration,
    pub max_age_dest: Duration,
    pub max_age_src: Duration,
    pub timeout_blocks: u64,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_retry_backoff: Duration,
    pub estimated_block_time: Duration,
    pub estimated_indexer_time: Duration,
}

impl Config {
    /// Loads every variable in spec 6's table, clamping out-of-range
    /// numeric values to the nearest bound and falling back to the default
    /// (with a logged warning) for non-numeric input.
    pub fn from_env() -> Self {
        Self {
            log_level: env_log_level("LOG_LEVEL", LogLevel::Debug),
            db_file: env_path("DB_FILE", "relayer.db"),
            error_log_file: env_path("ERROR_LOG_FILE", "error.log"),
            combined_log_file: env_path("COMBINED_LOG_FILE", "combined.log"),
            poll_interval: env_duration_ms("RELAY_POLL_INTERVAL", 5000, 1000..=60_000),
            max_age_dest: env_duration_secs("RELAY_MAX_AGE_DEST", 86_400, 60..=u64::MAX),
            max_age_src: env_duration_secs("RELAY_MAX_AGE_SRC", 86_400, 60..=u64::MAX),
            timeout_blocks: env_u64("RELAY_TIMEOUT_BLOCKS", 2, 0..=1000),
            timeout_seconds: env_u64("RELAY_TIMEOUT_SECONDS", 6, 0..=3600),
            max_retries: env_u64("NETWORK_MAX_RETRIES", 3, 0..=10) as u32,
            retry_backoff: env_duration_ms("NETWORK_RETRY_BACKOFF", 1000, 100..=10_000),
            max_retry_backoff: env_duration_ms("NETWORK_MAX_RETRY_BACKOFF", 30_000, 1_000..=120_000),
            estimated_block_time: env_duration_ms("ESTIMATED_BLOCK_TIME", 6000, 1_000..=60_000),
            estimated_indexer_time: env_duration_ms("ESTIMATED_INDEXER_TIME", 500, 0..=10_000),
        }
    }

    /// Per-request RPC deadline: `estimatedBlockTime * 10` (spec 5).
    pub fn rpc_deadline(&self) -> Duration {
        self.estimated_block_time * 10
    }
}

fn env_log_level(var: &str, default: LogLevel) -> LogLevel {
    match env::var(var) {
        Ok(raw) => LogLevel::parse(&raw).unwrap_or_else(|| {
            warn!(var, raw, "unrecognised log level, falling back to default");
            default
        }),
        Err(_) => default,
    }
}

/// `DB_FILE`/`ERROR_LOG_FILE`/`COMBINED_LOG_FILE` MUST resolve inside the
/// current working directory (spec 6).
fn env_path(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(raw) => match resolves_inside_cwd(&raw) {
            true => raw,
            false => {
                warn!(var, raw, "path escapes the working directory, falling back to default");
                default.to_string()
            }
        },
        Err(_) => default.to_string(),
    }
}

fn resolves_inside_cwd(raw: &str) -> bool {
    let path = Path::new(raw);
    if path.is_absolute() {
        return false;
    }
    // Any `..` component could walk back out of the working directory;
    // reject rather than trying to fully canonicalise a path that may not
    // exist yet.
    !path.components().any(|c| matches!(c, std::path::Component::ParentDir))
}

fn env_u64(var: &str, default: u64, range: RangeInclusive<u64>) -> u64 {
    match env::var(var) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) => clamp_u64(value, range),
            Err(_) => {
                warn!(var, raw, "non-numeric value, falling back to default");
                default
            }
        },
        Err(_) => default,
    }
}

fn clamp_u64(value: u64, range: RangeInclusive<u64>) -> u64 {
    value.clamp(*range.start(), *range.end())
}

fn env_duration_ms(var: &str, default_ms: u64, range: RangeInclusive<u64>) -> Duration {
    Duration::from_millis(env_u64(var, default_ms, range))
}

fn env_duration_secs(var: &str, default_secs: u64, range: RangeInclusive<u64>) -> Duration {
    Duration::from_secs(env_u64(var, default_secs, range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // env::set_var is process-global; serialise the tests that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn clamps_poll_interval_below_minimum() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("RELAY_POLL_INTERVAL", "10");
        let config = Config::from_env();
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        env::remove_var("RELAY_POLL_INTERVAL");
    }

    #[test]
    fn clamps_poll_interval_above_maximum() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("RELAY_POLL_INTERVAL", "999999");
        let config = Config::from_env();
        assert_eq!(config.poll_interval, Duration::from_millis(60_000));
        env::remove_var("RELAY_POLL_INTERVAL");
    }

    #[test]
    fn non_numeric_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("RELAY_TIMEOUT_BLOCKS", "not-a-number");
        let config = Config::from_env();
        assert_eq!(config.timeout_blocks, 2);
        env::remove_var("RELAY_TIMEOUT_BLOCKS");
    }

    #[test]
    fn unrecognised_log_level_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("LOG_LEVEL", "shout");
        let config = Config::from_env();
        assert_eq!(config.log_level, LogLevel::Debug);
        env::remove_var("LOG_LEVEL");
    }

    #[test]
    fn rejects_db_file_path_outside_cwd() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DB_FILE", "../escape.db");
        let config = Config::from_env();
        assert_eq!(config.db_file, "relayer.db");
        env::remove_var("DB_FILE");
    }

    #[test]
    fn rejects_absolute_db_file_path() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DB_FILE", "/etc/passwd");
        let config = Config::from_env();
        assert_eq!(config.db_file, "relayer.db");
        env::remove_var("DB_FILE");
    }

    #[test]
    fn accepts_relative_db_file_path() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("DB_FILE", "state/relayer.db");
        let config = Config::from_env();
        assert_eq!(config.db_file, "state/relayer.db");
        env::remove_var("DB_FILE");
    }
}
