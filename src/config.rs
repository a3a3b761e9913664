// src/config.rs
use std::env;
use std::time::Duration;

/// Outbound call timeout shared by all integrations.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry settings declared alongside the webhook contract. Call sites
/// attempt each integration exactly once; these are reported via
/// `/api/status` so operators can see the configured values.
pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// URL set for the four webhook integrations, resolved once at startup and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub environment: String,
    pub news_finder: String,
    pub content_creation: String,
    pub news_rejection: String,
    pub linkedin_remaking: String,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl WebhookConfig {
    /// Resolve the active URL set from `WEBHOOK_ENV` (production /
    /// development / mock, defaulting to development), with per-endpoint
    /// env-var overrides.
    pub fn from_env() -> Self {
        let environment = env::var("WEBHOOK_ENV").unwrap_or_else(|_| "development".to_string());
        let [news, content, rejection, linkedin] = default_urls(&environment);

        let config = Self {
            environment: environment.clone(),
            news_finder: env::var("WEBHOOK_NEWS_FINDER").unwrap_or_else(|_| news.to_string()),
            content_creation: env::var("WEBHOOK_CONTENT_CREATION")
                .unwrap_or_else(|_| content.to_string()),
            news_rejection: env::var("WEBHOOK_NEWS_REJECTION")
                .unwrap_or_else(|_| rejection.to_string()),
            linkedin_remaking: env::var("WEBHOOK_LINKEDIN_REMAKING")
                .unwrap_or_else(|_| linkedin.to_string()),
            timeout: WEBHOOK_TIMEOUT,
            retry_attempts: RETRY_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        };

        tracing::info!(
            "Webhook configuration resolved for '{}' environment (timeout {}s)",
            config.environment,
            config.timeout.as_secs()
        );
        config
    }
}

fn default_urls(environment: &str) -> [&'static str; 4] {
    match environment {
        "production" => [
            "https://hooks.research-agent.app/api/news",
            "https://hooks.research-agent.app/api/content",
            "https://hooks.research-agent.app/api/rejection",
            "https://hooks.research-agent.app/api/linkedin",
        ],
        "mock" => [
            "https://mockapi.io/api/v1/research/news",
            "https://mockapi.io/api/v1/research/content",
            "https://mockapi.io/api/v1/research/rejection",
            "https://mockapi.io/api/v1/research/linkedin",
        ],
        _ => [
            "http://localhost:3001/api/news",
            "http://localhost:3001/api/content",
            "http://localhost:3001/api/rejection",
            "http://localhost:3001/api/linkedin",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_environment_falls_back_to_development_urls() {
        let [news, ..] = default_urls("staging");
        assert!(news.starts_with("http://localhost:3001"));
    }

    #[test]
    fn named_environments_have_distinct_url_sets() {
        assert_ne!(default_urls("production"), default_urls("mock"));
        assert_ne!(default_urls("production"), default_urls("development"));
    }
}
