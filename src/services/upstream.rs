// src/services/upstream.rs
//
// Thin client for the OpenRouter chat-completions API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AppConfig;
use crate::message::ChatMessage;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Authenticated handle on the upstream API. Construction fails gracefully
/// when no credential is configured.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    api_key: String,
    base: String,
    referer: String,
    title: String,
}

impl UpstreamClient {
    pub fn from_config(http: Client, config: &AppConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            http,
            api_key,
            base: config.upstream_base.clone(),
            referer: config.http_referer.clone(),
            title: config.x_title.clone(),
        })
    }

    /// One chat-completions round trip. Transport failures, error statuses,
    /// and empty bodies all collapse to `None`; the detail is logged rather
    /// than surfaced to the caller.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Option<String> {
        let url = format!("{}/chat/completions", self.base);
        let payload = CompletionRequest { model, messages };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .timeout(UPSTREAM_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(model, error = %err, "upstream request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(model, %status, "upstream returned error status");
            return None;
        }

        let body: CompletionResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                warn!(model, error = %err, "upstream returned unparseable body");
                return None;
            }
        };

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_choices_yield_no_content() {
        let body: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(body.choices.is_empty());

        let body: CompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(body.choices[0].message.content.is_none());
    }

    #[test]
    fn content_is_extracted_from_first_choice() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "Hello"}}, {"message": {"content": "other"}}]}"#,
        )
        .unwrap();
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        assert_eq!(content.as_deref(), Some("Hello"));
    }
}
