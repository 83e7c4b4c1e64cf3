use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_MATCHES: usize = 40;
const DEFAULT_RATE_LIMIT_PER_MIN: u32 = 10;
const DEFAULT_STATS_BASE_URL: &str = "https://www.vlr.gg";
const DEFAULT_SLATE_URL: &str =
    "https://api.underdogfantasy.com/v1/over_under_lines?sport_id=val";
const DEFAULT_EXPORT_DIR: &str = "data";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Outbound fetch settings, passed explicitly into the fetcher rather than
/// living as module globals.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub fetch: FetchConfig,
    /// Upper bound on match pages fetched per player.
    pub max_matches: usize,
    pub stats_base_url: String,
    pub slate_url: String,
    pub rate_limit_per_min: u32,
    pub export_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse("PORT", DEFAULT_PORT);
        let timeout_secs =
            env_parse("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS).clamp(5, 60);
        let max_matches = env_parse("MAX_MATCHES", DEFAULT_MAX_MATCHES).clamp(1, 100);
        let rate_limit_per_min =
            env_parse("RATE_LIMIT_PER_MIN", DEFAULT_RATE_LIMIT_PER_MIN).clamp(1, 600);

        Self {
            port,
            fetch: FetchConfig {
                timeout: Duration::from_secs(timeout_secs),
                user_agent: env_string("FETCH_USER_AGENT", USER_AGENT),
            },
            max_matches,
            stats_base_url: env_string("STATS_BASE_URL", DEFAULT_STATS_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            slate_url: env_string("SLATE_URL", DEFAULT_SLATE_URL),
            rate_limit_per_min,
            export_dir: PathBuf::from(env_string("EXPORT_DIR", DEFAULT_EXPORT_DIR)),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
