//! Shared constants.

pub const APP_NAME: &str = "assetgen";

/// Number of hex characters of the config path digest used for the data directory name.
pub const CONFIG_ID_LEN: usize = 12;

/// Lock file name inside a config's data directory.
pub const LOCK_FILENAME: &str = "lock";

/// Durable build record file name inside a config's data directory.
pub const STATE_FILENAME: &str = "state.json";

/// Environment variable overriding the remote source download directory.
pub const DOWNLOADS_ENV: &str = "ASSETGEN_DOWNLOADS_DIRECTORY";

/// Directory under the home directory used for downloads when no override is set.
pub const DOWNLOADS_DIR_NAME: &str = ".assetgen";

/// Default profile name.
pub const DEFAULT_PROFILE: &str = "default";

/// Embed payloads above this many base64 bytes fall back to `url()`.
pub const DEFAULT_EMBED_DATA_LIMIT: u64 = 32_000;
