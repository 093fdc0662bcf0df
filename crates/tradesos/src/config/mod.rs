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
    pub matching: MatchingConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            matching: MatchingConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Knobs for coverage matching, tiered dispatch and arrival estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// How long standard-tier trades wait behind premium-tier trades.
    pub premium_first_access: Duration,
    /// Enables the `radius_km` coverage criterion.
    pub radius_filter: bool,
    /// When false, dispatch partitions recipients but sends nothing.
    pub notifications_enabled: bool,
    pub travel_speed_kmh: f64,
    /// Public origin used for links inside notification bodies.
    pub base_url: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            premium_first_access: Duration::from_secs(3 * 60),
            radius_filter: false,
            notifications_enabled: true,
            travel_speed_kmh: 30.0,
            base_url: "http://localhost:5000".to_string(),
        }
    }
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let premium_first_access = match env::var("PREMIUM_FIRST_ACCESS_MINUTES") {
            Ok(raw) => {
                let minutes = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidWindow)?;
                Duration::from_secs(u64::from(minutes) * 60)
            }
            Err(_) => defaults.premium_first_access,
        };

        let travel_speed_kmh = match env::var("AVG_TRAVEL_SPEED_KMH") {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(speed) if speed.is_finite() && speed > 0.0 => speed,
                _ => return Err(ConfigError::InvalidTravelSpeed),
            },
            Err(_) => defaults.travel_speed_kmh,
        };

        Ok(Self {
            premium_first_access,
            radius_filter: env_flag("ENABLE_RADIUS_FILTER", defaults.radius_filter),
            notifications_enabled: env_flag(
                "ENABLE_EMAIL_NOTIFICATIONS",
                defaults.notifications_enabled,
            ),
            travel_speed_kmh,
            base_url: env::var("BASE_URL").unwrap_or(defaults.base_url),
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "on" | "yes"
        ),
        Err(_) => default,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWindow,
    InvalidTravelSpeed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWindow => write!(
                f,
                "PREMIUM_FIRST_ACCESS_MINUTES must be a whole number of minutes"
            ),
            ConfigError::InvalidTravelSpeed => {
                write!(f, "AVG_TRAVEL_SPEED_KMH must be a positive number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidWindow
            | ConfigError::InvalidTravelSpeed => None,
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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PREMIUM_FIRST_ACCESS_MINUTES",
            "ENABLE_RADIUS_FILTER",
            "ENABLE_EMAIL_NOTIFICATIONS",
            "AVG_TRAVEL_SPEED_KMH",
            "BASE_URL",
        ] {
            env::remove_var(name);
        }
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
        assert_eq!(config.matching, MatchingConfig::default());
        assert_eq!(
            config.matching.premium_first_access,
            Duration::from_secs(180)
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_matching_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PREMIUM_FIRST_ACCESS_MINUTES", "5");
        env::set_var("ENABLE_RADIUS_FILTER", "TRUE");
        env::set_var("ENABLE_EMAIL_NOTIFICATIONS", "off");
        env::set_var("AVG_TRAVEL_SPEED_KMH", "45.5");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.matching.premium_first_access,
            Duration::from_secs(300)
        );
        assert!(config.matching.radius_filter);
        assert!(!config.matching.notifications_enabled);
        assert_eq!(config.matching.travel_speed_kmh, 45.5);
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PREMIUM_FIRST_ACCESS_MINUTES", "three");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InvalidWindow)));
    }

    #[test]
    fn rejects_zero_travel_speed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AVG_TRAVEL_SPEED_KMH", "0");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InvalidTravelSpeed)));
    }
}
