// src/webhooks.rs
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::WebhookConfig;
use crate::format;

/// Marker sent with every outbound payload so receivers can attribute calls.
const SOURCE_TAG: &str = "research-agent";

/// Envelope keys a webhook may wrap its real payload in, checked in order.
const ENVELOPE_KEYS: [&str; 5] = ["output", "news", "post", "insights", "content"];

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{endpoint} request failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
}

/// Client for the four research integrations. Every call is attempted
/// exactly once with the configured timeout.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    config: WebhookConfig,
}

impl WebhookClient {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// News lookup. Infallible by design: when the integration is down the
    /// conversation still has to advance, so failures yield a canned
    /// insights body parameterized by the keyword.
    pub async fn fetch_news_insights(&self, keywords: &str) -> String {
        let payload = json!({
            "keywords": keywords,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "source": SOURCE_TAG,
        });

        match self.call("news finder", &self.config.news_finder, payload).await {
            Ok(insights) => insights,
            Err(e) => {
                tracing::warn!("News webhook failed, using fallback response: {}", e);
                fallback_news_insights(keywords)
            }
        }
    }

    /// Draft a LinkedIn post from accepted news insights.
    pub async fn create_content(&self, news: &str) -> Result<String, WebhookError> {
        let payload = json!({
            "news": news,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "source": SOURCE_TAG,
        });
        self.call("content creation", &self.config.content_creation, payload)
            .await
    }

    /// Regenerate news insights from decline feedback.
    pub async fn reject_news(&self, news: &str, feedback: &str) -> Result<String, WebhookError> {
        let payload = json!({
            "news": news,
            "feedback": feedback,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "source": SOURCE_TAG,
        });
        self.call("news rejection", &self.config.news_rejection, payload)
            .await
    }

    /// Rework a declined LinkedIn draft from decline feedback.
    pub async fn remake_post(&self, post: &str, feedback: &str) -> Result<String, WebhookError> {
        let payload = json!({
            "post": post,
            "feedback": feedback,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "source": SOURCE_TAG,
        });
        self.call("linkedin remaking", &self.config.linkedin_remaking, payload)
            .await
    }

    async fn call(
        &self,
        endpoint: &'static str,
        url: &str,
        payload: Value,
    ) -> Result<String, WebhookError> {
        tracing::debug!("Calling {} webhook at {}", endpoint, url);

        let response = self
            .client
            .post(url)
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|source| WebhookError::Request { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("{} webhook returned {}", endpoint, status);
            return Err(WebhookError::Status { endpoint, status });
        }

        let body = response
            .text()
            .await
            .map_err(|source| WebhookError::Request { endpoint, source })?;

        // Bodies are usually JSON but some hooks answer with bare text.
        let value = serde_json::from_str(&body).unwrap_or(Value::String(body));
        Ok(format::format_payload(&unwrap_envelope(value)))
    }
}

/// Peel known envelope keys off the response body. Nested envelopes unwrap
/// all the way down; anything else is returned as-is for the formatter.
fn unwrap_envelope(value: Value) -> Value {
    if let Value::Object(ref map) = value {
        for key in ENVELOPE_KEYS {
            if let Some(inner) = map.get(key) {
                return unwrap_envelope(inner.clone());
            }
        }
    }
    value
}

/// Canned news insights used when the lookup integration is unavailable.
pub fn fallback_news_insights(keywords: &str) -> String {
    format!(
        "🔍 **Research Insights for: {keywords}**\n\n\
         **Market Analysis:**\n\
         • Current trends in {keywords} show significant growth potential\n\
         • Key players are investing heavily in this space\n\
         • Consumer demand is increasing by 15-20% annually\n\n\
         **Key Opportunities:**\n\
         • Emerging technologies are creating new possibilities\n\
         • Market gaps present untapped potential\n\
         • Strategic partnerships could accelerate growth\n\n\
         **Risk Factors:**\n\
         • Regulatory changes may impact the sector\n\
         • Competition is intensifying rapidly\n\
         • Economic conditions could affect adoption\n\n\
         **Recommendations:**\n\
         • Focus on innovation and differentiation\n\
         • Build strong customer relationships\n\
         • Monitor market trends closely\n\
         • Consider strategic partnerships\n\n\
         *Note: This is a sample response. For real-time data, please ensure webhook configuration is properly set up.*"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_keys_are_unwrapped_in_order() {
        let value = json!({"output": "inner text", "news": "ignored"});
        assert_eq!(unwrap_envelope(value), json!("inner text"));
    }

    #[test]
    fn nested_envelopes_unwrap_fully() {
        let value = json!({"output": {"post": {"content": "the draft"}}});
        assert_eq!(unwrap_envelope(value), json!("the draft"));
    }

    #[test]
    fn non_envelope_bodies_pass_through() {
        let value = json!({"headline": "rates cut", "sentiment": "bullish"});
        assert_eq!(unwrap_envelope(value.clone()), value);
    }

    #[test]
    fn fallback_contains_keyword_and_all_sections() {
        let body = fallback_news_insights("solar storage");
        assert!(body.contains("solar storage"));
        for section in [
            "Market Analysis",
            "Key Opportunities",
            "Risk Factors",
            "Recommendations",
        ] {
            assert!(body.contains(section), "missing section {:?}", section);
        }
    }

    #[test]
    fn fallback_is_already_well_formed() {
        let body = fallback_news_insights("fintech");
        assert_eq!(format::format_text(&body), format::format_text(&format::format_text(&body)));
    }
}
