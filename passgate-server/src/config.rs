//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::time::Duration;

use passgate_core::AuthorityConfig;
use ring::rand::{SecureRandom, SystemRandom};
use url::Url;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),
    #[error("Failed to generate token secret")]
    SecretGeneration,
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in KB (default: 64)
    pub body_limit_kb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Interval of the expiry sweeper (default: disabled)
    pub sweep_interval_secs: Option<u64>,
    /// Relying party, lifetimes and token secret for the authority
    pub authority: AuthorityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_kb: 64,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            sweep_interval_secs: None,
            authority: AuthorityConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("PORT").unwrap_or(3001);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let sweep_interval_secs = env_parse::<u64>("SWEEP_INTERVAL_SECS").filter(|s| *s > 0);

        Ok(Self {
            port,
            host,
            allowed_origins,
            body_limit_kb: env_parse("BODY_LIMIT_KB").unwrap_or(64),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(30),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC").unwrap_or(10),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(20),
            sweep_interval_secs,
            authority: authority_from_env()?,
        })
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Relying party and lifetime settings
///
/// Environment variables:
/// - `RP_ID` - Relying Party ID (default: "localhost")
/// - `RP_NAME` - RP display name (default: "Passkey Demo")
/// - `RP_ORIGIN` - RP origin URL (default: "http://localhost:3001")
/// - `JWT_SECRET` - HS256 signing key (default: random per process)
/// - `CODE_TTL_SECS`, `TOKEN_TTL_SECS`, `CHALLENGE_TTL_SECS` (0 disables)
fn authority_from_env() -> Result<AuthorityConfig, ConfigError> {
    let defaults = AuthorityConfig::default();

    let rp_id = std::env::var("RP_ID").unwrap_or(defaults.rp_id);
    let rp_name = std::env::var("RP_NAME").unwrap_or(defaults.rp_name);
    let rp_origin = std::env::var("RP_ORIGIN").unwrap_or(defaults.origin);
    let origin = normalize_origin(&rp_origin)?;

    let token_secret = match std::env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret.into_bytes(),
        _ => {
            tracing::warn!(
                "JWT_SECRET not set: using a random per-process secret, tokens will not survive restarts"
            );
            random_secret()?
        }
    };

    let challenge_ttl = match env_parse::<i64>("CHALLENGE_TTL_SECS") {
        Some(0) => None,
        Some(secs) if secs > 0 => Some(chrono::Duration::seconds(secs)),
        _ => defaults.challenge_ttl,
    };

    Ok(AuthorityConfig {
        rp_id,
        rp_name,
        origin,
        code_ttl: env_parse::<i64>("CODE_TTL_SECS")
            .filter(|s| *s > 0)
            .map(chrono::Duration::seconds)
            .unwrap_or(defaults.code_ttl),
        token_ttl: env_parse::<i64>("TOKEN_TTL_SECS")
            .filter(|s| *s > 0)
            .map(chrono::Duration::seconds)
            .unwrap_or(defaults.token_ttl),
        challenge_ttl,
        token_secret,
        require_user_verification: defaults.require_user_verification,
    })
}

/// Parse an origin URL and render it the way browsers report it in client data
fn normalize_origin(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidOrigin(format!("{}: {}", raw, e)))?;
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Ok(origin.ascii_serialization()),
        url::Origin::Opaque(_) => Err(ConfigError::InvalidOrigin(format!(
            "{}: not a tuple origin",
            raw
        ))),
    }
}

fn random_secret() -> Result<Vec<u8>, ConfigError> {
    let mut secret = vec![0u8; 32];
    SystemRandom::new()
        .fill(&mut secret)
        .map_err(|_| ConfigError::SecretGeneration)?;
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3001);
        assert!(!config.rate_limit_enabled);
        assert!(config.sweep_interval().is_none());
        assert_eq!(config.authority.rp_id, "localhost");
        assert_eq!(config.authority.origin, "http://localhost:3001");
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            host: [0, 0, 0, 0],
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            normalize_origin("http://localhost:3001/").unwrap(),
            "http://localhost:3001"
        );
        assert_eq!(
            normalize_origin("https://example.com:443").unwrap(),
            "https://example.com"
        );
        assert!(normalize_origin("not a url").is_err());
        assert!(normalize_origin("data:text/plain,hi").is_err());
    }

    #[test]
    fn test_random_secret_is_fresh() {
        let a = random_secret().unwrap();
        let b = random_secret().unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
