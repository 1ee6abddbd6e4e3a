use crate::error::{MayflyError, Result};
use serde::{Deserialize, Serialize};

/// Top-level application configuration loaded from a TOML file, env vars, or
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings (host, port, limits).
    #[serde(default)]
    pub server: ServerConfig,
    /// Index sizing, maintenance schedule, and snapshot behavior.
    #[serde(default)]
    pub index: IndexConfig,
    /// Update pipeline sizing and TTL policy.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Ranking model selection.
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Structured logging level and format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default: `"0.0.0.0"`.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to listen on. Default: `19980`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds. Default: `30`.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Maximum request body size in megabytes. Default: `16`.
    #[serde(default = "default_max_request_body_mb")]
    pub max_request_body_mb: usize,
    /// Default query `limit` when the client omits it. Default: `10`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Hard upper bound on the query `limit` parameter. Default: `10_000`.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

/// Index sizing, maintenance schedule, and snapshot behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Bucket presizing hint for the posting index. Default: `100_000`.
    #[serde(default = "default_initial_buckets")]
    pub initial_buckets: usize,
    /// Capacity cap on tracked (term, doc) deadline pairs. Default:
    /// `5_000_000`.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Seconds between maintenance applies. Default: `300`.
    #[serde(default = "default_apply_interval")]
    pub apply_interval_secs: u64,
    /// Seconds between empty-list compaction passes. Default: `300`.
    #[serde(default = "default_compaction_interval")]
    pub compaction_interval_secs: u64,
    /// Restore from the snapshot prefix at startup. Default: `false`.
    #[serde(default)]
    pub restore_on_startup: bool,
    /// Dump a snapshot on graceful exit. Default: `false`.
    #[serde(default)]
    pub dump_on_exit: bool,
    /// Path prefix for `<prefix>.idx` / `<prefix>.exp` snapshot files.
    #[serde(default)]
    pub snapshot_prefix: String,
}

/// Update pipeline sizing and TTL policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of update workers. Default: `4`.
    #[serde(default = "default_update_thread_num")]
    pub update_thread_num: usize,
    /// Bounded queue capacity, in jobs. Default: `2048`.
    #[serde(default = "default_update_queue_size")]
    pub update_queue_size: usize,
    /// TTL applied when a document omits one, in seconds. Default: `86_400`.
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: i64,
    /// Upper bound on client TTLs, in seconds. Default: one week.
    #[serde(default = "default_max_ttl")]
    pub max_ttl_secs: i64,
}

/// Ranking model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Model name: `"direct"` or `"feature_mapping"`. Default: `"direct"`.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-feature-space multipliers for the feature-mapping model.
    #[serde(default)]
    pub space_weights: Vec<SpaceWeight>,
}

/// One feature-space multiplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpaceWeight {
    /// Feature-space id (the high 32 bits of a term id).
    pub space: u32,
    /// Multiplier applied to contributions from this space.
    pub weight: f32,
}

/// Structured logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log verbosity filter (e.g. `"info"`, `"debug"`). Default: `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `"json"` or `"pretty"`. Default: `"json"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions — hardcoded defaults only.
// Env var overrides are applied in `apply_env_overrides()`.
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    19980
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_request_body_mb() -> usize {
    16
}
fn default_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    10_000
}
fn default_initial_buckets() -> usize {
    100_000
}
fn default_max_size() -> usize {
    5_000_000
}
fn default_apply_interval() -> u64 {
    300
}
fn default_compaction_interval() -> u64 {
    300
}
fn default_update_thread_num() -> usize {
    4
}
fn default_update_queue_size() -> usize {
    2048
}
fn default_ttl() -> i64 {
    86_400
}
fn default_max_ttl() -> i64 {
    604_800
}
fn default_model() -> String {
    "direct".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_request_body_mb: default_max_request_body_mb(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_buckets: default_initial_buckets(),
            max_size: default_max_size(),
            apply_interval_secs: default_apply_interval(),
            compaction_interval_secs: default_compaction_interval(),
            restore_on_startup: false,
            dump_on_exit: false,
            snapshot_prefix: String::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            update_thread_num: default_update_thread_num(),
            update_queue_size: default_update_queue_size(),
            default_ttl_secs: default_ttl(),
            max_ttl_secs: default_max_ttl(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            space_weights: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, falling back to defaults.
    /// After loading, env var overrides are applied so that:
    /// env var > TOML file > defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p).map_err(|e| {
                    MayflyError::Config(format!("failed to read config file {p}: {e}"))
                })?;
                toml::from_str(&content)
                    .map_err(|e| MayflyError::Config(format!("failed to parse config: {e}")))?
            }
            None => Config::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    fn validate(&self) -> Result<()> {
        if self.index.apply_interval_secs == 0 {
            return Err(MayflyError::Config(
                "index.apply_interval_secs must be positive".into(),
            ));
        }
        if self.pipeline.update_queue_size == 0 {
            return Err(MayflyError::Config(
                "pipeline.update_queue_size must be positive".into(),
            ));
        }
        if self.pipeline.max_ttl_secs < self.pipeline.default_ttl_secs {
            return Err(MayflyError::Config(
                "pipeline.max_ttl_secs must be at least default_ttl_secs".into(),
            ));
        }
        if (self.index.restore_on_startup || self.index.dump_on_exit)
            && self.index.snapshot_prefix.is_empty()
        {
            return Err(MayflyError::Config(
                "index.snapshot_prefix required when restore_on_startup or dump_on_exit is set"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides on top of file/default values.
    fn apply_env_overrides(&mut self) {
        // Server
        if let Ok(v) = std::env::var("MAYFLY_HOST") {
            self.server.host = v;
        }
        if let Some(v) = parse_env("MAYFLY_PORT") {
            self.server.port = v;
        }
        if let Some(v) = parse_env("MAYFLY_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v;
        }
        if let Some(v) = parse_env("MAYFLY_MAX_REQUEST_BODY_MB") {
            self.server.max_request_body_mb = v;
        }
        if let Some(v) = parse_env("MAYFLY_DEFAULT_LIMIT") {
            self.server.default_limit = v;
        }
        if let Some(v) = parse_env("MAYFLY_MAX_LIMIT") {
            self.server.max_limit = v;
        }

        // Index
        if let Some(v) = parse_env("MAYFLY_INITIAL_BUCKETS") {
            self.index.initial_buckets = v;
        }
        if let Some(v) = parse_env("MAYFLY_MAX_SIZE") {
            self.index.max_size = v;
        }
        if let Some(v) = parse_env("MAYFLY_APPLY_INTERVAL_SECS") {
            self.index.apply_interval_secs = v;
        }
        if let Some(v) = parse_env("MAYFLY_COMPACTION_INTERVAL_SECS") {
            self.index.compaction_interval_secs = v;
        }
        if let Ok(v) = std::env::var("MAYFLY_RESTORE_ON_STARTUP") {
            self.index.restore_on_startup = v == "true";
        }
        if let Ok(v) = std::env::var("MAYFLY_DUMP_ON_EXIT") {
            self.index.dump_on_exit = v == "true";
        }
        if let Ok(v) = std::env::var("MAYFLY_SNAPSHOT_PREFIX") {
            self.index.snapshot_prefix = v;
        }

        // Pipeline
        if let Some(v) = parse_env("MAYFLY_UPDATE_THREAD_NUM") {
            self.pipeline.update_thread_num = v;
        }
        if let Some(v) = parse_env("MAYFLY_UPDATE_QUEUE_SIZE") {
            self.pipeline.update_queue_size = v;
        }
        if let Some(v) = parse_env("MAYFLY_DEFAULT_TTL_SECS") {
            self.pipeline.default_ttl_secs = v;
        }
        if let Some(v) = parse_env("MAYFLY_MAX_TTL_SECS") {
            self.pipeline.max_ttl_secs = v;
        }

        // Ranking
        if let Ok(v) = std::env::var("MAYFLY_RANKING_MODEL") {
            self.ranking.model = v;
        }

        // Logging
        if let Ok(v) = std::env::var("MAYFLY_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("MAYFLY_LOG_FORMAT") {
            self.logging.format = v;
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 19980);
        assert_eq!(config.index.initial_buckets, 100_000);
        assert_eq!(config.index.max_size, 5_000_000);
        assert_eq!(config.index.apply_interval_secs, 300);
        assert_eq!(config.pipeline.update_thread_num, 4);
        assert_eq!(config.pipeline.update_queue_size, 2048);
        assert_eq!(config.pipeline.default_ttl_secs, 86_400);
        assert_eq!(config.pipeline.max_ttl_secs, 604_800);
        assert_eq!(config.ranking.model, "direct");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            [server]
            port = 8080

            [index]
            max_size = 1000
            restore_on_startup = true
            snapshot_prefix = "/var/lib/mayfly/snap"

            [ranking]
            model = "feature_mapping"
            space_weights = [{ space = 1, weight = 2.5 }]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.index.max_size, 1000);
        assert!(config.index.restore_on_startup);
        assert_eq!(config.index.snapshot_prefix, "/var/lib/mayfly/snap");
        assert_eq!(config.ranking.space_weights.len(), 1);
        assert_eq!(config.ranking.space_weights[0].space, 1);
        // Untouched sections keep defaults.
        assert_eq!(config.pipeline.update_queue_size, 2048);
    }

    #[test]
    fn test_validate_rejects_zero_apply_interval() {
        let mut config = Config::default();
        config.index.apply_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_snapshot_prefix() {
        let mut config = Config::default();
        config.index.dump_on_exit = true;
        assert!(config.validate().is_err());
        config.index.snapshot_prefix = "/tmp/snap".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ttl_ordering() {
        let mut config = Config::default();
        config.pipeline.max_ttl_secs = 10;
        config.pipeline.default_ttl_secs = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load(Some("/nonexistent/mayfly.toml")).is_err());
    }
}
