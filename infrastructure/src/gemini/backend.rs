//! Gemini streaming backend
//!
//! Implements [`GenerativeBackend`] on top of
//! `models/{model}:streamGenerateContent?alt=sse`. The HTTP response body is
//! pumped by a background task into the mpsc channel behind the returned
//! [`StreamHandle`]; dropping the handle stops the task and closes the HTTP
//! response, even while the body is stalled.

use super::error::GeminiError;
use super::sse::SseDecoder;
use super::types::{
    GenerateRequest, GenerateResponse, GenerationConfig, SafetySetting, api_error_message,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_application::{BackendError, GenerativeBackend, StreamHandle};
use relay_domain::{StreamEvent, Turn};
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the delta channel between the HTTP reader and the consumer
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Gemini API adapter.
pub struct GeminiBackend {
    client: Client,
    api_base: String,
    api_key: String,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl GeminiBackend {
    pub fn new(client: Client, api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            generation_config: GenerationConfig::default(),
            safety_settings: Vec::new(),
        }
    }

    /// Sampling parameters sent with every request.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    /// Safety thresholds sent with every request.
    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    fn build_request(&self, context: &[Turn]) -> GenerateRequest {
        GenerateRequest::from_turns(context)
            .with_generation_config(&self.generation_config)
            .with_safety_settings(&self.safety_settings)
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base, model
        )
    }

    async fn open_stream(
        &self,
        model: &str,
        context: &[Turn],
    ) -> Result<reqwest::Response, GeminiError> {
        let request = self.build_request(context);
        let response = self
            .client
            .post(self.stream_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status,
                message: api_error_message(&body),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn stream_completion(
        &self,
        model: &str,
        context: &[Turn],
    ) -> Result<StreamHandle, BackendError> {
        debug!("Gemini: streaming {} with {} turns", model, context.len());
        let response = self.open_stream(model, context).await.map_err(|e| {
            warn!("Gemini request to {} failed: {}", model, e);
            BackendError::from(e)
        })?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(pump_events(response.bytes_stream(), tx));
        Ok(StreamHandle::new(rx))
    }
}

/// Outcome of one decoded SSE payload.
#[derive(Debug, PartialEq)]
enum Chunk {
    Text(String),
    Failed(String),
}

fn decode_chunk(data: &str) -> Chunk {
    match serde_json::from_str::<GenerateResponse>(data) {
        Ok(response) => match response.block_reason() {
            Some(reason) => Chunk::Failed(GeminiError::Blocked(reason).to_string()),
            None => Chunk::Text(response.text()),
        },
        Err(e) => Chunk::Failed(GeminiError::Decode(e.to_string()).to_string()),
    }
}

/// Forward every SSE payload of `body` as stream events.
///
/// Ends with exactly one terminal event unless the receiver is gone.
async fn pump_events<S, E>(body: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!("Gemini stream receiver dropped, closing response");
                return;
            }
            next = body.next() => next,
        };
        let payloads = match next {
            Some(Ok(chunk)) => decoder.feed(&chunk),
            Some(Err(e)) => {
                warn!("Gemini stream interrupted: {}", e);
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
            None => break,
        };
        if !forward(&payloads, &tx).await {
            return;
        }
    }

    if forward(&decoder.finish(), &tx).await {
        let _ = tx.send(StreamEvent::Completed).await;
    }
}

/// Send decoded payloads; `false` once the stream has ended for any reason.
async fn forward(payloads: &[String], tx: &mpsc::Sender<StreamEvent>) -> bool {
    for data in payloads {
        let event = match decode_chunk(data) {
            Chunk::Text(text) if text.is_empty() => continue,
            Chunk::Text(text) => StreamEvent::Delta(text),
            Chunk::Failed(message) => {
                warn!("Gemini stream failed: {}", message);
                let _ = tx.send(StreamEvent::Error(message)).await;
                return false;
            }
        };
        if tx.send(event).await.is_err() {
            debug!("Gemini stream receiver dropped, stopping");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn body(chunks: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, Infallible>> {
        futures::stream::iter(chunks.into_iter().map(|s| Ok(Bytes::from(s))))
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_stream_url() {
        let backend = GeminiBackend::new(
            Client::new(),
            "https://generativelanguage.googleapis.com/v1beta/",
            "key",
        );
        assert_eq!(
            backend.stream_url("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn test_pump_forwards_deltas_then_completes() {
        let (tx, rx) = mpsc::channel(16);
        pump_events(
            body(vec![
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"He\"}]}}]}\r\n\r\n",
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"llo!\"}]}}]}\r\n",
                "\r\ndata: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\r\n\r\n",
            ]),
            tx,
        )
        .await;

        assert_eq!(
            collect(rx).await,
            vec![
                StreamEvent::Delta("He".to_string()),
                StreamEvent::Delta("llo!".to_string()),
                StreamEvent::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_pump_reports_blocked_answer() {
        let (tx, rx) = mpsc::channel(16);
        pump_events(
            body(vec![
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Par\"}]}}]}\n\n",
                "data: {\"candidates\":[{\"finishReason\":\"SAFETY\"}]}\n\n",
            ]),
            tx,
        )
        .await;

        let events = collect(rx).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Delta("Par".to_string()));
        assert!(matches!(&events[1], StreamEvent::Error(m) if m.contains("SAFETY")));
    }

    #[tokio::test]
    async fn test_pump_reports_malformed_payload() {
        let (tx, rx) = mpsc::channel(16);
        pump_events(body(vec!["data: {not json\n\n"]), tx).await;

        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(matches!(events[0], StreamEvent::Error(_)));
    }

    #[tokio::test]
    async fn test_pump_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // Must return instead of blocking on a full channel
        pump_events(
            body(vec![
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}\n\n",
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"b\"}]}}]}\n\n",
            ]),
            tx,
        )
        .await;
    }

    #[tokio::test]
    async fn test_pump_stops_on_drop_while_body_stalls() {
        let (tx, mut rx) = mpsc::channel(16);
        let stalled = body(vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hi\"}]}}]}\n\n",
        ])
        .chain(futures::stream::pending());
        let pump = tokio::spawn(pump_events(stalled, tx));

        assert_eq!(rx.recv().await, Some(StreamEvent::Delta("Hi".to_string())));
        drop(rx);

        tokio::time::timeout(std::time::Duration::from_millis(500), pump)
            .await
            .expect("pump should stop once the receiver is gone")
            .unwrap();
    }

    #[test]
    fn test_build_request_applies_settings() {
        let backend = GeminiBackend::new(Client::new(), "https://example.test", "key")
            .with_generation_config(GenerationConfig {
                temperature: Some(1.0),
                ..Default::default()
            })
            .with_safety_settings(vec![SafetySetting {
                category: "HARM_CATEGORY_HATE_SPEECH".to_string(),
                threshold: "BLOCK_ONLY_HIGH".to_string(),
            }]);

        let request = backend.build_request(&[Turn::user("hi")]);
        assert_eq!(request.generation_config.unwrap().temperature, Some(1.0));
        assert_eq!(request.safety_settings.len(), 1);
    }

    #[test]
    fn test_decode_chunk() {
        assert_eq!(
            decode_chunk(r#"{"candidates":[{"content":{"parts":[{"text":"x"}]}}]}"#),
            Chunk::Text("x".to_string())
        );
        assert!(matches!(decode_chunk("42"), Chunk::Failed(_)));
    }
}
