//! Real-time client configuration

use std::env;
use std::time::Duration;

use url::Url;

use crate::reconnect::{Backoff, ReconnectPolicy};
use crate::stomp::HeartBeat;

/// Default messaging endpoint (raw WebSocket leg of the SockJS endpoint)
pub const DEFAULT_URL: &str = "ws://localhost:8080/ws/websocket";

/// Real-time client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    // Endpoint
    pub url: Url,
    pub connect_timeout: Duration,

    // STOMP
    pub heart_beat: HeartBeat,
    pub topic_prefix: String,
    pub app_prefix: String,

    // Reconnect
    pub reconnect: ReconnectPolicy,
}

impl Default for RealtimeConfig {
    #[allow(clippy::expect_used)] // DEFAULT_URL is a constant known to parse
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_URL).expect("default realtime URL is valid"),
            connect_timeout: Duration::from_secs(10),
            heart_beat: HeartBeat::new(4000, 4000),
            topic_prefix: "/topic".to_string(),
            app_prefix: "/app".to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl RealtimeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let url = match env::var("REALTIME_URL") {
            Ok(raw) => parse_url(&raw)?,
            Err(_) => defaults.url,
        };

        let delay = env_millis("REALTIME_RECONNECT_DELAY_MS", defaults.reconnect.delay)?;
        let max_attempts = env_parse(
            "REALTIME_MAX_RECONNECT_ATTEMPTS",
            defaults.reconnect.max_attempts,
        )?;
        let backoff = match env::var("REALTIME_BACKOFF") {
            Ok(raw) => match raw
                .parse::<Backoff>()
                .map_err(|_| ConfigError::Invalid("REALTIME_BACKOFF", raw))?
            {
                Backoff::Exponential { .. } => Backoff::Exponential {
                    max_delay: env_millis(
                        "REALTIME_MAX_BACKOFF_MS",
                        crate::reconnect::DEFAULT_MAX_BACKOFF,
                    )?,
                },
                fixed => fixed,
            },
            Err(_) => defaults.reconnect.backoff,
        };

        Ok(Self {
            url,
            connect_timeout: env_millis("REALTIME_CONNECT_TIMEOUT_MS", defaults.connect_timeout)?,

            heart_beat: HeartBeat::new(
                env_parse(
                    "REALTIME_HEARTBEAT_OUTGOING_MS",
                    defaults.heart_beat.outgoing_ms,
                )?,
                env_parse(
                    "REALTIME_HEARTBEAT_INCOMING_MS",
                    defaults.heart_beat.incoming_ms,
                )?,
            ),
            topic_prefix: env::var("REALTIME_TOPIC_PREFIX").unwrap_or(defaults.topic_prefix),
            app_prefix: env::var("REALTIME_APP_PREFIX").unwrap_or(defaults.app_prefix),

            reconnect: ReconnectPolicy {
                delay,
                max_attempts,
                backoff,
            },
        })
    }

    pub fn with_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.url = parse_url(url)?;
        Ok(self)
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_heart_beat(mut self, heart_beat: HeartBeat) -> Self {
        self.heart_beat = heart_beat;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Value for the STOMP `host` header
    pub fn stomp_host(&self) -> String {
        match (self.url.host_str(), self.url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => "localhost".to_string(),
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        _ => Err(ConfigError::InvalidUrl(raw.to_string())),
    }
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

fn env_millis(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    env_parse(name, default.as_millis() as u64).map(Duration::from_millis)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
    #[error("Invalid realtime URL (expected ws:// or wss://): {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (they modify shared env vars)
    static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "REALTIME_URL",
        "REALTIME_RECONNECT_DELAY_MS",
        "REALTIME_MAX_RECONNECT_ATTEMPTS",
        "REALTIME_BACKOFF",
        "REALTIME_MAX_BACKOFF_MS",
        "REALTIME_HEARTBEAT_OUTGOING_MS",
        "REALTIME_HEARTBEAT_INCOMING_MS",
        "REALTIME_CONNECT_TIMEOUT_MS",
        "REALTIME_TOPIC_PREFIX",
        "REALTIME_APP_PREFIX",
    ];

    fn cleanup_config() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        let config = RealtimeConfig::from_env().unwrap();
        assert_eq!(config.url.as_str(), DEFAULT_URL);
        assert_eq!(config.reconnect, ReconnectPolicy::default());
        assert_eq!(config.heart_beat, HeartBeat::new(4000, 4000));
        assert_eq!(config.topic_prefix, "/topic");
        assert_eq!(config.app_prefix, "/app");
        assert_eq!(config.stomp_host(), "localhost:8080");
    }

    #[test]
    fn test_overrides() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        env::set_var("REALTIME_URL", "wss://resolveit.example.edu/ws/websocket");
        env::set_var("REALTIME_RECONNECT_DELAY_MS", "500");
        env::set_var("REALTIME_MAX_RECONNECT_ATTEMPTS", "8");
        env::set_var("REALTIME_BACKOFF", "exponential");
        env::set_var("REALTIME_MAX_BACKOFF_MS", "10000");
        env::set_var("REALTIME_HEARTBEAT_OUTGOING_MS", "0");

        let config = RealtimeConfig::from_env().unwrap();
        assert_eq!(config.stomp_host(), "resolveit.example.edu");
        assert_eq!(config.reconnect.delay, Duration::from_millis(500));
        assert_eq!(config.reconnect.max_attempts, 8);
        assert_eq!(
            config.reconnect.backoff,
            Backoff::Exponential {
                max_delay: Duration::from_millis(10000)
            }
        );
        assert_eq!(config.heart_beat, HeartBeat::new(0, 4000));

        cleanup_config();
    }

    #[test]
    fn test_invalid_values_rejected() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        env::set_var("REALTIME_URL", "http://localhost:8080/ws");
        assert!(matches!(
            RealtimeConfig::from_env(),
            Err(ConfigError::InvalidUrl(_))
        ));
        env::remove_var("REALTIME_URL");

        env::set_var("REALTIME_MAX_RECONNECT_ATTEMPTS", "many");
        assert!(matches!(
            RealtimeConfig::from_env(),
            Err(ConfigError::Invalid("REALTIME_MAX_RECONNECT_ATTEMPTS", _))
        ));
        env::remove_var("REALTIME_MAX_RECONNECT_ATTEMPTS");

        env::set_var("REALTIME_BACKOFF", "linear");
        assert!(matches!(
            RealtimeConfig::from_env(),
            Err(ConfigError::Invalid("REALTIME_BACKOFF", _))
        ));

        cleanup_config();
    }
}
