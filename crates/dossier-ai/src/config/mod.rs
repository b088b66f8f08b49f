use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub genai: GenAiConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let genai_base_url = env::var("GENAI_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());
        let genai_model = env::var("GENAI_MODEL").unwrap_or_else(|_| "llama3:8b".to_string());
        let genai_timeout_secs = env::var("GENAI_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let render_concurrency = env::var("PIPELINE_RENDER_CONCURRENCY")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<usize>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidConcurrency)?;
        let persist_synthesized = env::var("PIPELINE_PERSIST_SYNTHESIZED")
            .map(|value| !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false"))
            .unwrap_or(true);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            genai: GenAiConfig {
                base_url: genai_base_url,
                model: genai_model,
                timeout_secs: genai_timeout_secs,
            },
            pipeline: PipelineConfig {
                render_concurrency,
                persist_synthesized,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the external generative text service.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl GenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Knobs for the extraction and generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded parallelism for extraction and render workers.
    pub render_concurrency: usize,
    /// Persist synthesized values back as answers so repeated runs agree.
    pub persist_synthesized: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            render_concurrency: 3,
            persist_synthesized: true,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidConcurrency,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "GENAI_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidConcurrency => {
                write!(f, "PIPELINE_RENDER_CONCURRENCY must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("GENAI_BASE_URL");
        env::remove_var("GENAI_MODEL");
        env::remove_var("GENAI_TIMEOUT_SECS");
        env::remove_var("PIPELINE_RENDER_CONCURRENCY");
        env::remove_var("PIPELINE_PERSIST_SYNTHESIZED");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.genai.base_url, "http://localhost:11434");
        assert_eq!(config.genai.timeout(), Duration::from_secs(60));
        assert_eq!(config.pipeline.render_concurrency, 3);
        assert!(config.pipeline.persist_synthesized);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rejects_zero_render_concurrency() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PIPELINE_RENDER_CONCURRENCY", "0");
        let error = AppConfig::load().expect_err("zero workers rejected");
        assert!(matches!(error, ConfigError::InvalidConcurrency));
    }

    #[test]
    fn persist_synthesized_flag_parses_false() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PIPELINE_PERSIST_SYNTHESIZED", "false");
        let config = AppConfig::load().expect("config loads");
        assert!(!config.pipeline.persist_synthesized);
    }
}
