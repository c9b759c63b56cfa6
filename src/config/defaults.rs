//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7878;

/// Deadline for a single observations request, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Deadline for a region or IP lookup, in milliseconds
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;

/// Observations lag real time by this many days
pub const DEFAULT_LAG_DAYS: u32 = 3;

/// Length of the rolling observation window in days
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Maximum number of results requested per observations call
pub const DEFAULT_RESULT_LIMIT: u32 = 1000;

/// Observations dataset (daily summaries)
pub const DEFAULT_DATASET: &str = "GHCND";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "trail-climate";
