//! Gemini `generateContent` wire types and conversions.

use relay_domain::{Role, Turn};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

/// Sampling parameters sent as `generationConfig`; unset fields are left to
/// the model's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One `safetySettings` entry, e.g. `HARM_CATEGORY_HARASSMENT` / `BLOCK_NONE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Part {
    #[serde(default)]
    pub text: String,
    /// Set on reasoning summaries, which are not part of the answer
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

impl GenerateRequest {
    /// Build the request body from a conversation context.
    ///
    /// Consecutive turns of the same role are merged into one content entry
    /// with several parts, since a failed request leaves two user turns in
    /// a row.
    pub fn from_turns(turns: &[Turn]) -> Self {
        let mut contents: Vec<Content> = Vec::new();
        for turn in turns {
            let role = wire_role(turn.role());
            let part = Part {
                text: turn.context_text().into_owned(),
                thought: false,
            };
            match contents.last_mut() {
                Some(last) if last.role == role => last.parts.push(part),
                _ => contents.push(Content {
                    role: role.to_string(),
                    parts: vec![part],
                }),
            }
        }
        Self {
            contents,
            generation_config: None,
            safety_settings: Vec::new(),
        }
    }

    pub fn with_generation_config(mut self, config: &GenerationConfig) -> Self {
        self.generation_config = (!config.is_empty()).then(|| config.clone());
        self
    }

    pub fn with_safety_settings(mut self, settings: &[SafetySetting]) -> Self {
        self.safety_settings = settings.to_vec();
        self
    }
}

// ============================================================================
// Response
// ============================================================================

/// One streamed `GenerateContentResponse` chunk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    pub block_reason: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub message: String,
}

/// Finish reasons meaning the answer was cut off by the provider.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

impl GenerateResponse {
    /// Answer text carried by this chunk (first candidate, thoughts skipped).
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .map(|p| p.text.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Why the provider refused to answer, if it did.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Some(reason);
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
            .map(str::to_string)
    }
}

/// Extract the human-readable message of an error response body.
pub(crate) fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ if body.trim().is_empty() => "empty error response".to_string(),
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::MediaRef;

    #[test]
    fn test_request_maps_roles_and_merges_runs() {
        let turns = vec![
            Turn::user("first"),
            Turn::user("second"),
            Turn::assistant("answer"),
            Turn::media(Role::User, MediaRef::new("file-1"), Some("a cat".into())),
        ];

        let request = GenerateRequest::from_turns(&turns);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "first" }, { "text": "second" }] },
                    { "role": "model", "parts": [{ "text": "answer" }] },
                    { "role": "user", "parts": [{ "text": "[image] a cat" }] }
                ]
            })
        );
    }

    #[test]
    fn test_request_carries_generation_and_safety_settings() {
        let generation = GenerationConfig {
            temperature: Some(0.5),
            top_k: Some(40),
            max_output_tokens: Some(1024),
            ..Default::default()
        };
        let safety = vec![SafetySetting {
            category: "HARM_CATEGORY_HARASSMENT".to_string(),
            threshold: "BLOCK_NONE".to_string(),
        }];

        let request = GenerateRequest::from_turns(&[Turn::user("hi")])
            .with_generation_config(&generation)
            .with_safety_settings(&safety);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
                "generationConfig": { "temperature": 0.5, "topK": 40, "maxOutputTokens": 1024 },
                "safetySettings": [
                    { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" }
                ]
            })
        );
    }

    #[test]
    fn test_request_omits_unset_settings() {
        let request = GenerateRequest::from_turns(&[Turn::user("hi")])
            .with_generation_config(&GenerationConfig::default())
            .with_safety_settings(&[]);
        let body = serde_json::to_value(&request).unwrap();

        assert!(body.get("generationConfig").is_none());
        assert!(body.get("safetySettings").is_none());
    }

    #[test]
    fn test_response_text_skips_thoughts() {
        let chunk: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[
                {"text":"thinking...","thought":true},
                {"text":"Hel"},
                {"text":"lo"}
            ]}}]}"#,
        )
        .unwrap();

        assert_eq!(chunk.text(), "Hello");
        assert!(chunk.block_reason().is_none());
    }

    #[test]
    fn test_final_chunk_without_content() {
        let chunk: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"STOP"}]}"#).unwrap();
        assert_eq!(chunk.text(), "");
        assert!(chunk.block_reason().is_none());
    }

    #[test]
    fn test_block_reasons() {
        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(blocked.block_reason().as_deref(), Some("SAFETY"));

        let cut: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"RECITATION"}]}"#).unwrap();
        assert_eq!(cut.block_reason().as_deref(), Some("RECITATION"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(api_error_message(""), "empty error response");
    }
}
