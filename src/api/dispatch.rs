//! Network dispatch for both backend protocols.
//!
//! One round-trip per send, no streaming. Every failure mode on this path
//! (refused connection, timeout, non-2xx status, undecodable body) becomes a
//! [`DispatchOutcome::Failure`] with displayable text; nothing here returns
//! an `Err` to the engine, because the assistant turn slot always expects a
//! string.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::{
    outcome_from_local, outcome_from_remote, DispatchOutcome, LocalChatRequest, LocalChatResponse,
    LocalModelsResponse, RemoteChatRequest, RemoteChatResponse, WireMessage,
};
use crate::core::providers::ProviderDescriptor;
use crate::utils::url::endpoint_url;

const REMOTE_CHAT_PATH: &str = "chat/completions";
const LOCAL_CHAT_PATH: &str = "api/chat";
const LOCAL_MODELS_PATH: &str = "api/tags";

/// Seam between the engine and the network. Engine tests script this with a
/// mock; production wires in [`ChatClient`].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send the full history as context and return the normalized outcome.
    /// `model` is ignored by providers that do not require model selection.
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        model: &str,
        history: Vec<WireMessage>,
    ) -> DispatchOutcome;

    /// Ask the local backend which models it serves. Empty on any failure;
    /// the catalog treats empty as "no change".
    async fn discover_local_models(&self, provider: &ProviderDescriptor) -> Vec<String>;
}

#[derive(Clone, Default)]
pub struct ChatClient {
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn send_remote(
        &self,
        provider: &ProviderDescriptor,
        model: &str,
        history: Vec<WireMessage>,
    ) -> DispatchOutcome {
        let chat_url = endpoint_url(&provider.base_url, REMOTE_CHAT_PATH);
        let request = RemoteChatRequest {
            messages: history,
            model: provider.requires_model.then(|| model.to_string()),
        };

        let mut http_request = self
            .http
            .post(&chat_url)
            .header("Content-Type", "application/json");
        if let Some(api_key) = &provider.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {api_key}"));
        }

        debug!(provider = %provider.id, %chat_url, "dispatching remote chat request");
        let response = match http_request.json(&request).send().await {
            Ok(response) => response,
            Err(err) => return DispatchOutcome::transport_failure(err),
        };

        if !response.status().is_success() {
            return failure_from_status(response).await;
        }

        match response.json::<RemoteChatResponse>().await {
            Ok(payload) => outcome_from_remote(payload),
            Err(err) => DispatchOutcome::transport_failure(err),
        }
    }

    async fn send_local(
        &self,
        provider: &ProviderDescriptor,
        model: &str,
        history: Vec<WireMessage>,
    ) -> DispatchOutcome {
        let chat_url = endpoint_url(&provider.base_url, LOCAL_CHAT_PATH);
        let request = LocalChatRequest {
            model: model.to_string(),
            messages: history,
            stream: false,
        };

        debug!(provider = %provider.id, %chat_url, "dispatching local chat request");
        let response = match self
            .http
            .post(&chat_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return DispatchOutcome::transport_failure(err),
        };

        if !response.status().is_success() {
            return failure_from_status(response).await;
        }

        match response.json::<LocalChatResponse>().await {
            Ok(payload) => outcome_from_local(payload),
            Err(err) => DispatchOutcome::transport_failure(err),
        }
    }
}

#[async_trait]
impl Dispatcher for ChatClient {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        model: &str,
        history: Vec<WireMessage>,
    ) -> DispatchOutcome {
        if provider.local {
            self.send_local(provider, model, history).await
        } else {
            self.send_remote(provider, model, history).await
        }
    }

    async fn discover_local_models(&self, provider: &ProviderDescriptor) -> Vec<String> {
        let models_url = endpoint_url(&provider.base_url, LOCAL_MODELS_PATH);
        debug!(provider = %provider.id, %models_url, "listing local models");

        let response = match self.http.get(&models_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "local model listing failed");
                return Vec::new();
            }
            Err(err) => {
                warn!(%err, "local backend unreachable for model listing");
                return Vec::new();
            }
        };

        match response.json::<LocalModelsResponse>().await {
            Ok(payload) => payload.models.into_iter().map(|m| m.name).collect(),
            Err(err) => {
                warn!(%err, "could not decode local model listing");
                Vec::new()
            }
        }
    }
}

/// Turn a non-2xx response into a displayable failure, pulling the
/// server-reported message out of the body when one is recognizable.
async fn failure_from_status(response: reqwest::Response) -> DispatchOutcome {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    let detail = extract_error_summary(&body).unwrap_or(body);
    DispatchOutcome::transport_failure(format!(
        "API request failed with status {status}: {detail}"
    ))
}

/// Best-effort extraction of an error message from a JSON error body.
/// Handles `{"error":{"message":…}}`, `{"error":"…"}`, and `{"message":"…"}`.
fn extract_error_summary(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        })?;

    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
