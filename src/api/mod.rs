//! Wire payloads for the two chat-completion protocols and the
//! normalization functions that reduce both to a [`DispatchOutcome`].
//!
//! Remote providers speak the OpenAI-compatible shape
//! (`choices[].message.content`, `error.message`); the local backend speaks
//! the Ollama shape (`message.content`, bare `error` string). The two
//! schemas stay deliberately separate and meet only at the outcome level, so
//! adding a backend means adding a normalizer plus a catalog entry and
//! nothing upstream changes.

use serde::{Deserialize, Serialize};

use crate::core::message::Message;

pub mod dispatch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct RemoteChatRequest {
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteChoice {
    pub message: WireMessage,
}

#[derive(Debug, Deserialize)]
pub struct RemoteApiError {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoteChatResponse {
    #[serde(default)]
    pub choices: Vec<RemoteChoice>,
    pub error: Option<RemoteApiError>,
}

#[derive(Debug, Serialize)]
pub struct LocalChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocalChatResponse {
    pub message: Option<WireMessage>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocalModelInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LocalModelsResponse {
    pub models: Vec<LocalModelInfo>,
}

/// Normalized result of one dispatch. The assistant turn slot always wants
/// renderable text, so failures carry display text rather than an error
/// type, and nothing past the dispatch boundary ever propagates an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success(String),
    Failure(String),
}

impl DispatchOutcome {
    /// Wrap a transport-level diagnostic (timeout, refused connection,
    /// non-2xx status, undecodable body) as a displayable failure.
    pub fn transport_failure(diagnostic: impl std::fmt::Display) -> Self {
        DispatchOutcome::Failure(format!("Error: {diagnostic}"))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Success(_))
    }

    /// The text that lands in the transcript either way.
    pub fn into_text(self) -> String {
        match self {
            DispatchOutcome::Success(text) | DispatchOutcome::Failure(text) => text,
        }
    }
}

const EMPTY_REMOTE_RESPONSE: &str = "Error: received an empty or invalid response.";
const EMPTY_LOCAL_RESPONSE: &str =
    "Error: received an empty or invalid response from the local backend.";

/// Map a transcript to wire form. Pure and total: every author maps to a
/// role, order is preserved, nothing is filtered.
pub fn wire_history(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|msg| WireMessage {
            role: msg.author.wire_role().to_string(),
            content: msg.text.clone(),
        })
        .collect()
}

/// Normalize an OpenAI-compatible response body.
pub fn outcome_from_remote(response: RemoteChatResponse) -> DispatchOutcome {
    if let Some(choice) = response.choices.into_iter().next() {
        return DispatchOutcome::Success(choice.message.content);
    }
    match response.error {
        Some(err) => DispatchOutcome::Failure(err.message),
        None => DispatchOutcome::Failure(EMPTY_REMOTE_RESPONSE.to_string()),
    }
}

/// Normalize a local-backend (Ollama-style) response body.
pub fn outcome_from_local(response: LocalChatResponse) -> DispatchOutcome {
    if let Some(message) = response.message {
        return DispatchOutcome::Success(message.content);
    }
    match response.error {
        Some(err) => DispatchOutcome::Failure(err),
        None => DispatchOutcome::Failure(EMPTY_LOCAL_RESPONSE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_history_maps_authors_in_order() {
        let transcript = vec![
            Message::user("Hello"),
            Message::assistant("Hi there!"),
            Message::user("How are you?"),
        ];
        let wire = wire_history(&transcript);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[0].content, "Hello");
        assert_eq!(wire[1].role, "assistant");
        assert_eq!(wire[2].role, "user");
    }

    #[test]
    fn wire_history_of_empty_transcript_is_empty() {
        assert!(wire_history(&[]).is_empty());
    }

    #[test]
    fn remote_first_choice_wins() {
        let response: RemoteChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}},
                {"message":{"role":"assistant","content":"ignored"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            outcome_from_remote(response),
            DispatchOutcome::Success("hi".to_string())
        );
    }

    #[test]
    fn remote_error_message_becomes_failure() {
        let response: RemoteChatResponse =
            serde_json::from_str(r#"{"error":{"message":"bad key"}}"#).unwrap();
        assert_eq!(
            outcome_from_remote(response),
            DispatchOutcome::Failure("bad key".to_string())
        );
    }

    #[test]
    fn remote_empty_body_becomes_generic_failure() {
        let response: RemoteChatResponse = serde_json::from_str("{}").unwrap();
        let outcome = outcome_from_remote(response);
        assert!(!outcome.is_success());
        assert_eq!(outcome.into_text(), EMPTY_REMOTE_RESPONSE);
    }

    #[test]
    fn local_message_content_becomes_success() {
        let response: LocalChatResponse = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":"howdy"}}"#,
        )
        .unwrap();
        assert_eq!(
            outcome_from_local(response),
            DispatchOutcome::Success("howdy".to_string())
        );
    }

    #[test]
    fn local_error_string_becomes_failure() {
        let response: LocalChatResponse =
            serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        assert_eq!(
            outcome_from_local(response),
            DispatchOutcome::Failure("model not found".to_string())
        );
    }

    #[test]
    fn local_empty_body_becomes_generic_failure() {
        let outcome = outcome_from_local(LocalChatResponse::default());
        assert_eq!(outcome.into_text(), EMPTY_LOCAL_RESPONSE);
    }

    #[test]
    fn request_model_is_omitted_when_absent() {
        let request = RemoteChatRequest {
            messages: vec![],
            model: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("model"));

        let request = RemoteChatRequest {
            messages: vec![],
            model: Some("gpt-4o".to_string()),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""model":"gpt-4o""#));
    }

    #[test]
    fn transport_failures_are_prefixed() {
        let outcome = DispatchOutcome::transport_failure("connection refused");
        assert_eq!(outcome.into_text(), "Error: connection refused");
    }

    #[test]
    fn unknown_response_fields_are_ignored() {
        let response: RemoteChatResponse = serde_json::from_str(
            r#"{"id":"cmpl-1","object":"chat.completion",
                "choices":[{"index":0,"finish_reason":"stop",
                "message":{"role":"assistant","content":"ok"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            outcome_from_remote(response),
            DispatchOutcome::Success("ok".to_string())
        );
    }
}
