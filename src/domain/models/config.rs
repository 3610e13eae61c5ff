use serde::{Deserialize, Serialize};

/// Main configuration structure for strray
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Orchestration limits consulted at execution time
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulated-execution fallback configuration
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestrationConfig {
    /// Whether multi-agent orchestration is enabled at all. When false,
    /// execution forces single-agent delegation.
    #[serde(default = "default_multi_agent_enabled")]
    pub multi_agent_enabled: bool,

    /// Hard cap on concurrently executing agents per delegation (1-100)
    #[serde(default = "default_max_concurrent_agents")]
    pub max_concurrent_agents: usize,
}

const fn default_multi_agent_enabled() -> bool {
    true
}

const fn default_max_concurrent_agents() -> usize {
    5
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            multi_agent_enabled: default_multi_agent_enabled(),
            max_concurrent_agents: default_max_concurrent_agents(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional directory for rolling file output
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Simulated-execution fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationConfig {
    /// Base latency applied per simulated invocation, in milliseconds
    #[serde(default = "default_base_latency_ms")]
    pub base_latency_ms: u64,

    /// Cap on simulated latency, in milliseconds
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
}

const fn default_base_latency_ms() -> u64 {
    1000
}

const fn default_max_latency_ms() -> u64 {
    10_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_latency_ms: default_base_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
        }
    }
}
