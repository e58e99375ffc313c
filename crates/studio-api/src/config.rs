//! HTTP server settings.

use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Sustained requests per second allowed from one client IP
    pub rate_limit_rps: u32,
    pub rate_limit_burst: u32,
    pub request_timeout: Duration,
    pub max_body_size: usize,
    /// "production" hides internal error details from responses
    pub environment: String,
    /// HS256 secret Supabase signs access tokens with
    pub jwt_secret: String,
    /// Expected `aud` claim
    pub jwt_audience: String,
    /// Shared secret for HeyGen callback signatures; unchecked when unset
    pub heygen_webhook_secret: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            environment: "development".to_string(),
            jwt_secret: String::new(),
            jwt_audience: "authenticated".to_string(),
            heygen_webhook_secret: None,
        }
    }
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(d.host),
            port: parsed("API_PORT", d.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or(d.cors_origins),
            rate_limit_rps: parsed("RATE_LIMIT_RPS", d.rate_limit_rps),
            rate_limit_burst: parsed("RATE_LIMIT_BURST", d.rate_limit_burst),
            request_timeout: Duration::from_secs(parsed(
                "REQUEST_TIMEOUT",
                d.request_timeout.as_secs(),
            )),
            max_body_size: parsed("MAX_BODY_SIZE", d.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(d.environment),
            jwt_secret: std::env::var("SUPABASE_JWT_SECRET").unwrap_or_default(),
            jwt_audience: std::env::var("SUPABASE_JWT_AUDIENCE").unwrap_or(d.jwt_audience),
            heygen_webhook_secret: std::env::var("HEYGEN_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.jwt_audience, "authenticated");
        assert!(config.heygen_webhook_secret.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_is_case_insensitive() {
        let config = ApiConfig {
            environment: "Production".to_string(),
            ..Default::default()
        };
        assert!(config.is_production());
    }
}
