//! Application-wide constants and configuration values
//!
//! This module centralizes the magic numbers the lookup layer depends on
//! so the defaults in `Config` and the tests agree on a single source.

/// Default NEIS open API hub. Each dataset lives at `<hub>/<dataset>`.
pub const DEFAULT_API_DOMAIN: &str = "https://open.neis.go.kr/hub";

/// Default timeout for a single HTTP attempt in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 15;

/// Maximum number of idle connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 16;

/// Fixed offset used for "today" (KST, UTC+9). Korea has no DST.
pub const KST_OFFSET_SECONDS: i32 = 9 * 3600;

/// Response cache tuning
pub mod cache {
    /// TTL shared by every cached upstream response (5 minutes)
    pub const TTL_SECONDS: u64 = 300;

    /// Interval between background sweeps of expired entries
    pub const SWEEP_INTERVAL_SECONDS: u64 = 60;

    /// Upper bound on cached responses before least-recently-used eviction
    pub const MAX_ENTRIES: usize = 1000;
}

/// Retry configuration
pub mod retry {
    /// Maximum number of attempts (first try included) for one upstream call
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Ceiling on a single backoff delay (seconds)
    pub const MAX_DELAY_SECONDS: u64 = 8;
}

/// NEIS request parameters shared by every dataset
pub mod neis {
    /// Rows per page. 1000 is the largest page the hub accepts; longer
    /// results are fetched page by page up to `list_total_count`.
    pub const PAGE_SIZE: u32 = 1000;

    /// Upper bound on pages fetched for one query
    pub const MAX_PAGES: u32 = 20;

    /// Meal service code for lunch (1 = breakfast, 2 = lunch, 3 = dinner)
    pub const LUNCH_MEAL_CODE: &str = "2";

    /// Result code the hub uses when a query matches nothing
    pub const NO_DATA_CODE: &str = "INFO-200";

    /// Prefix of result codes that mean the hub rejected the request
    pub const ERROR_CODE_PREFIX: &str = "ERROR";
}

/// Environment variable names
pub mod env_vars {
    /// Environment variable for API domain override
    pub const API_DOMAIN: &str = "NEIS_API_DOMAIN";

    /// Environment variable for the NEIS API key
    pub const API_KEY: &str = "NEIS_API_KEY";

    /// Environment variable for log file path override
    pub const LOG_FILE: &str = "NEIS_LOG_FILE";

    /// Environment variable for per-attempt HTTP timeout in seconds
    pub const HTTP_TIMEOUT: &str = "NEIS_HTTP_TIMEOUT";
}
