use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub matching: MatchingSettings,
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
        let ansi = environment == AppEnvironment::Development;

        let matching = MatchingSettings::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            matching,
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
    /// Colored output, enabled for local development only.
    pub ansi: bool,
}

/// Request defaults for the ranked job feed.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingSettings {
    pub default_radius_miles: f64,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_radius_miles: 25.0,
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl MatchingSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_radius_miles = match env::var("MATCH_DEFAULT_RADIUS_MILES") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|radius| (1.0..=100.0).contains(radius))
                .ok_or(ConfigError::InvalidRadius)?,
            Err(_) => defaults.default_radius_miles,
        };

        let default_limit = parse_limit("MATCH_DEFAULT_LIMIT", defaults.default_limit)?;
        let max_limit = parse_limit("MATCH_MAX_LIMIT", defaults.max_limit)?;
        if default_limit > max_limit {
            return Err(ConfigError::InvalidLimit {
                variable: "MATCH_DEFAULT_LIMIT",
            });
        }

        Ok(Self {
            default_radius_miles,
            default_limit,
            max_limit,
        })
    }
}

fn parse_limit(variable: &'static str, fallback: usize) -> Result<usize, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit >= 1)
            .ok_or(ConfigError::InvalidLimit { variable }),
        Err(_) => Ok(fallback),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRadius,
    InvalidLimit { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRadius => {
                write!(f, "MATCH_DEFAULT_RADIUS_MILES must be a number between 1 and 100")
            }
            ConfigError::InvalidLimit { variable } => {
                write!(f, "{variable} must be a positive integer within MATCH_MAX_LIMIT")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidRadius
            | ConfigError::InvalidLimit { .. } => None,
        }
    }
}
