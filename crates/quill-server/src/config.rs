//! Process configuration, loaded from `QUILL_*` environment variables
//! with sensible defaults. One struct covers the task service and both
//! workers; each binary reads the slice it needs.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP port for the task service.
    pub port: u16,
    /// SQLite database path.
    pub db_path: PathBuf,

    /// HMAC key for bearer credentials. Shared with trusted workers.
    pub signing_secret: String,
    /// Credential expiry.
    pub token_ttl_hours: i64,
    /// Argon2 memory cost in KiB.
    pub kdf_memory_kib: u32,
    /// Argon2 time cost (iterations).
    pub kdf_time_cost: u32,

    /// Reminder sweep period.
    pub scheduler_tick: Duration,
    /// Max reminder rows claimed per sweep.
    pub scheduler_batch: u32,

    pub recurrence_worker_enabled: bool,
    pub notification_worker_enabled: bool,
    /// When false, event publishes are no-ops and the recurrence and
    /// reminder pipelines degrade gracefully.
    pub event_bus_enabled: bool,

    /// Bound on the agent's planning loop.
    pub agent_max_tool_iterations: usize,
    /// Wall-clock budget for one agent turn.
    pub agent_turn_timeout: Duration,

    /// Permitted CORS origins; empty means allow any.
    pub cors_origins: Vec<String>,

    /// Pub/sub sidecar base URL and component name.
    pub sidecar_base_url: String,
    pub pubsub_name: String,

    /// Where workers reach the task service.
    pub task_core_base_url: String,
    /// Ports for the worker subscription endpoints.
    pub recurrence_worker_port: u16,
    pub notification_worker_port: u16,

    /// OpenAI-compatible endpoint for the agent.
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            db_path: PathBuf::from("quill.db"),
            signing_secret: String::new(),
            token_ttl_hours: 24,
            kdf_memory_kib: quill_auth::password::DEFAULT_MEMORY_COST_KIB,
            kdf_time_cost: quill_auth::password::DEFAULT_TIME_COST,
            scheduler_tick: Duration::from_secs(60),
            scheduler_batch: 200,
            recurrence_worker_enabled: true,
            notification_worker_enabled: true,
            event_bus_enabled: true,
            agent_max_tool_iterations: 8,
            agent_turn_timeout: Duration::from_secs(120),
            cors_origins: Vec::new(),
            sidecar_base_url: "http://localhost:3500".into(),
            pubsub_name: "pubsub".into(),
            task_core_base_url: "http://localhost:8000".into(),
            recurrence_worker_port: 8001,
            notification_worker_port: 8002,
            llm_base_url: "https://api.openai.com/v1".into(),
            llm_api_key: String::new(),
            llm_model: "gpt-4o-mini".into(),
        }
    }
}

impl AppConfig {
    /// Load from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("QUILL_PORT", defaults.port),
            db_path: std::env::var("QUILL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            signing_secret: env_string("QUILL_SIGNING_SECRET", &defaults.signing_secret),
            token_ttl_hours: env_parse("QUILL_TOKEN_TTL_HOURS", defaults.token_ttl_hours),
            kdf_memory_kib: env_parse("QUILL_KDF_MEMORY_KIB", defaults.kdf_memory_kib),
            kdf_time_cost: env_parse("QUILL_KDF_TIME_COST", defaults.kdf_time_cost),
            scheduler_tick: Duration::from_secs(env_parse(
                "QUILL_SCHEDULER_TICK_SECS",
                defaults.scheduler_tick.as_secs(),
            )),
            scheduler_batch: env_parse("QUILL_SCHEDULER_BATCH", defaults.scheduler_batch),
            recurrence_worker_enabled: env_bool(
                "QUILL_RECURRENCE_WORKER_ENABLED",
                defaults.recurrence_worker_enabled,
            ),
            notification_worker_enabled: env_bool(
                "QUILL_NOTIFICATION_WORKER_ENABLED",
                defaults.notification_worker_enabled,
            ),
            event_bus_enabled: env_bool("QUILL_EVENT_BUS_ENABLED", defaults.event_bus_enabled),
            agent_max_tool_iterations: env_parse(
                "QUILL_AGENT_MAX_TOOL_ITERATIONS",
                defaults.agent_max_tool_iterations,
            ),
            agent_turn_timeout: Duration::from_secs(env_parse(
                "QUILL_AGENT_TURN_TIMEOUT_SECS",
                defaults.agent_turn_timeout.as_secs(),
            )),
            cors_origins: std::env::var("QUILL_CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            sidecar_base_url: env_string("QUILL_SIDECAR_BASE_URL", &defaults.sidecar_base_url),
            pubsub_name: env_string("QUILL_PUBSUB_NAME", &defaults.pubsub_name),
            task_core_base_url: env_string(
                "QUILL_TASK_CORE_BASE_URL",
                &defaults.task_core_base_url,
            ),
            recurrence_worker_port: env_parse(
                "QUILL_RECURRENCE_WORKER_PORT",
                defaults.recurrence_worker_port,
            ),
            notification_worker_port: env_parse(
                "QUILL_NOTIFICATION_WORKER_PORT",
                defaults.notification_worker_port,
            ),
            llm_base_url: env_string("QUILL_LLM_BASE_URL", &defaults.llm_base_url),
            llm_api_key: env_string("QUILL_LLM_API_KEY", &defaults.llm_api_key),
            llm_model: env_string("QUILL_LLM_MODEL", &defaults.llm_model),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|raw| matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
