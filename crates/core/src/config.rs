use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub database: DatabaseConfig,
    pub eventlog: EventLogConfig,
    pub scoring: ScoringConfig,
    pub delivery: DeliveryConfig,
    pub resilience: ResilienceConfig,
    /// Size of the post-reply window (in days) after which a non-converted
    /// outreach is eligible for a beta-prior timeout increment. `0` disables
    /// the mechanism, matching the absence of any beta-update in the source
    /// this pipeline was distilled from (see the design notes on the beta
    /// posterior ambiguity).
    pub conversion_window_days: u32,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &[
    "PG_HOST",
    "KAFKA_BOOTSTRAP_SERVERS",
    "OPENAI_API_KEY",
    "LIGHTFIELD_API_KEY",
];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PIPELINE_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PIPELINE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            database: DatabaseConfig::from_env_profiled(p),
            eventlog: EventLogConfig::from_env_profiled(p),
            scoring: ScoringConfig::from_env_profiled(p),
            delivery: DeliveryConfig::from_env_profiled(p),
            resilience: ResilienceConfig::from_env_profiled(p),
            conversion_window_days: profiled_env_u32(p, "CONVERSION_WINDOW_DAYS", 0),
        }
    }

    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() {
            "default"
        } else {
            &self.profile
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  database:    backend={}, host={}, db={}",
            self.database.backend,
            self.database.host,
            self.database.database
        );
        tracing::info!(
            "  eventlog:    bootstrap_servers={}, group_prefix={}",
            self.eventlog.bootstrap_servers,
            self.eventlog.consumer_group_prefix
        );
        tracing::info!(
            "  scoring:     provider={}, configured={}",
            self.scoring.provider,
            self.scoring.is_configured()
        );
        tracing::info!(
            "  delivery:    simulate={}, configured={}",
            self.delivery.simulate,
            self.delivery.is_configured()
        );
        tracing::info!(
            "  resilience:  retry_max={}, breaker_threshold={}",
            self.resilience.retry_max_attempts,
            self.resilience.breaker_failure_threshold
        );
    }

    /// Return a redacted view safe for logs/diagnostics — never includes
    /// credentials.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "database": {
                "backend": self.database.backend,
                "host": self.database.host,
                "database": self.database.database,
                "configured": self.database.is_configured(),
            },
            "eventlog": {
                "bootstrap_servers": self.eventlog.bootstrap_servers,
                "consumer_group_prefix": self.eventlog.consumer_group_prefix,
            },
            "scoring": {
                "provider": self.scoring.provider,
                "configured": self.scoring.is_configured(),
            },
            "delivery": {
                "simulate": self.delivery.simulate,
                "configured": self.delivery.is_configured(),
            },
            "conversion_window_days": self.conversion_window_days,
        })
    }
}

// ── Database (relational store) ──────────────────────────────

/// "embedded" selects a single-file, single-writer backend (e.g. SQLite);
/// "server" selects a pooled connection to a shared PostgreSQL instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
    /// Path to the embedded single-file store, used when `backend = "embedded"`.
    pub embedded_path: String,
}

impl DatabaseConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            backend: profiled_env_or(p, "DB_BACKEND", "server"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u32(p, "PG_PORT", 5432) as u16,
            database: profiled_env_or(p, "PG_DATABASE", "pipeline"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
            embedded_path: profiled_env_or(p, "DB_EMBEDDED_PATH", "data/pipeline.db"),
        }
    }

    /// Build a `postgres://` connection string. The password is never
    /// logged verbatim — callers must mask it before printing.
    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    /// Same as `connection_string` but with the password masked, safe for
    /// log lines.
    pub fn masked_connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        format!(
            "postgres://{}:***@{}:{}/{}?sslmode={}",
            user, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.backend == "embedded" || self.username.is_some()
    }
}

// ── Event log (Kafka) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    pub bootstrap_servers: String,
    pub consumer_group_prefix: String,
    pub security_protocol: String,
    pub topic_leads_raw: String,
    pub topic_leads_scored: String,
    pub topic_outreach_events: String,
    pub poll_timeout_ms: u64,
    pub flush_timeout_ms: u64,
    /// Number of consecutive handler failures for a given record before it
    /// is routed to the dead-letter topic instead of redelivered forever.
    pub max_delivery_attempts: u32,
}

impl EventLogConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            bootstrap_servers: profiled_env_or(p, "KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            consumer_group_prefix: profiled_env_or(p, "KAFKA_GROUP_PREFIX", "pipeline"),
            security_protocol: profiled_env_or(p, "KAFKA_SECURITY_PROTOCOL", "PLAINTEXT"),
            topic_leads_raw: profiled_env_or(p, "TOPIC_LEADS_RAW", "leads.raw"),
            topic_leads_scored: profiled_env_or(p, "TOPIC_LEADS_SCORED", "leads.scored"),
            topic_outreach_events: profiled_env_or(p, "TOPIC_OUTREACH_EVENTS", "outreach.events"),
            poll_timeout_ms: profiled_env_u64(p, "KAFKA_POLL_TIMEOUT_MS", 1000),
            flush_timeout_ms: profiled_env_u64(p, "KAFKA_FLUSH_TIMEOUT_MS", 10_000),
            max_delivery_attempts: profiled_env_u32(p, "MAX_DELIVERY_ATTEMPTS", 3),
        }
    }
}

// ── Scoring adapter (LLM) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// "openai" or "mock"
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub mock: bool,
}

impl ScoringConfig {
    fn from_env_profiled(p: &str) -> Self {
        let api_key = profiled_env_opt(p, "SCORING_API_KEY").or_else(|| profiled_env_opt(p, "OPENAI_API_KEY"));
        let placeholder = api_key
            .as_deref()
            .map(|k| k.starts_with("your_"))
            .unwrap_or(true);
        Self {
            provider: profiled_env_or(p, "SCORING_PROVIDER", "openai"),
            mock: profiled_env_bool(p, "MOCK_SCORING", placeholder),
            api_key,
            model: profiled_env_or(p, "SCORING_MODEL", "gpt-4o-mini"),
            base_url: profiled_env_or(p, "SCORING_BASE_URL", "https://api.openai.com/v1"),
            temperature: profiled_env_f64(p, "SCORING_TEMPERATURE", 0.3) as f32,
            max_tokens: profiled_env_u32(p, "SCORING_MAX_TOKENS", 512),
            request_timeout_secs: profiled_env_u64(p, "SCORING_TIMEOUT_SECS", 30),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.mock && self.api_key.is_some()
    }
}

// ── Delivery adapter ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub simulate: bool,
}

impl DeliveryConfig {
    fn from_env_profiled(p: &str) -> Self {
        let api_key = profiled_env_opt(p, "LIGHTFIELD_API_KEY");
        let placeholder = api_key
            .as_deref()
            .map(|k| k.starts_with("your_"))
            .unwrap_or(true);
        Self {
            simulate: profiled_env_bool(p, "SIMULATE_DELIVERY", placeholder),
            api_key,
            base_url: profiled_env_or(p, "LIGHTFIELD_BASE_URL", "https://api.lightfield.ai/v1"),
            request_timeout_secs: profiled_env_u64(p, "DELIVERY_TIMEOUT_SECS", 30),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.simulate && self.api_key.is_some()
    }
}

// ── Resilience (retry + circuit breaker) ─────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_exponential_base: f64,
    pub breaker_failure_threshold: u32,
    pub breaker_recovery_timeout_secs: u64,
}

impl ResilienceConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            retry_max_attempts: profiled_env_u32(p, "RETRY_MAX_ATTEMPTS", 3),
            retry_initial_delay_ms: profiled_env_u64(p, "RETRY_INITIAL_DELAY_MS", 1_000),
            retry_max_delay_ms: profiled_env_u64(p, "RETRY_MAX_DELAY_MS", 60_000),
            retry_exponential_base: profiled_env_f64(p, "RETRY_EXPONENTIAL_BASE", 2.0),
            breaker_failure_threshold: profiled_env_u32(p, "BREAKER_FAILURE_THRESHOLD", 5),
            breaker_recovery_timeout_secs: profiled_env_u64(p, "BREAKER_RECOVERY_TIMEOUT_SECS", 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_prefix_overrides_bare_key() {
        std::env::set_var("PG_HOST", "bare-host");
        std::env::set_var("PROD_PG_HOST", "prod-host");
        let cfg = DatabaseConfig::from_env_profiled("PROD");
        assert_eq!(cfg.host, "prod-host");
        let cfg = DatabaseConfig::from_env_profiled("");
        assert_eq!(cfg.host, "bare-host");
        std::env::remove_var("PG_HOST");
        std::env::remove_var("PROD_PG_HOST");
    }

    #[test]
    fn connection_string_masks_password_in_masked_variant() {
        let cfg = DatabaseConfig {
            backend: "server".into(),
            host: "db.internal".into(),
            port: 5432,
            database: "pipeline".into(),
            username: Some("svc".into()),
            password: Some("super-secret".into()),
            ssl_mode: "require".into(),
            max_connections: 10,
            embedded_path: String::new(),
        };
        assert!(cfg.connection_string().contains("super-secret"));
        assert!(!cfg.masked_connection_string().contains("super-secret"));
        assert!(cfg.masked_connection_string().contains("***"));
    }

    #[test]
    fn scoring_defaults_to_mock_without_api_key() {
        std::env::remove_var("SCORING_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("MOCK_SCORING");
        let cfg = ScoringConfig::from_env_profiled("");
        assert!(cfg.mock);
        assert!(!cfg.is_configured());
    }
}
