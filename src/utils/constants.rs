/// Provider defaults
pub const DEFAULT_BASE_URL: &str = "http://api.climately.com";
pub const DEFAULT_EXPECTED_ENTRY: &str = "current.csv";
pub const USER_AGENT: &str = concat!("wetbulb-monitor/", env!("CARGO_PKG_VERSION"));

/// Upper bound on the inflated observation table (64 MiB)
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Pipeline defaults
pub const DEFAULT_TOP_K: usize = 50;
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Storage defaults
pub const DEFAULT_DATABASE_PATH: &str = "weather_data.db";
pub const WEATHER_TABLE: &str = "weather_data";

/// Read API defaults
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Stull (2011) validity envelope, for diagnostics only
pub const STULL_MIN_HUMIDITY: f64 = 5.0;
pub const STULL_MIN_TEMP: f64 = -20.0;
pub const STULL_MAX_TEMP: f64 = 50.0;

/// Configuration sources
pub const DEFAULT_CONFIG_FILE: &str = "wetbulb.toml";
pub const ENV_PREFIX: &str = "WETBULB";
pub const PROVIDER_API_KEY_VAR: &str = "CLIMATELY_API_KEY";
pub const DEFAULT_LOG_LEVEL: &str = "info";
