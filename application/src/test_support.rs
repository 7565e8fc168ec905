//! Test doubles for the application ports.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::generative_backend::{BackendError, GenerativeBackend, StreamHandle};
use crate::ports::image_pipeline::{ImageError, ImagePipeline};
use crate::ports::messaging::{MessageHandle, MessagingClient, TransportError};
use async_trait::async_trait;
use relay_domain::{ConversationId, MediaRef, StreamEvent, Turn};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One outward call recorded by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publish {
    Send(String),
    Edit(i64, String),
    Photo(Option<String>),
}

#[derive(Default)]
struct MessengerState {
    publishes: Vec<(ConversationId, Publish)>,
    texts: HashMap<i64, String>,
    next_id: i64,
    failing_sends: usize,
    failing_edits: usize,
    hanging_edits: bool,
    hung_edits: usize,
}

/// In-memory messaging platform that records every call.
#[derive(Default)]
pub struct RecordingMessenger {
    state: Mutex<MessengerState>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_sends(&self, n: usize) {
        self.state.lock().unwrap().failing_sends = n;
    }

    pub fn fail_next_edits(&self, n: usize) {
        self.state.lock().unwrap().failing_edits = n;
    }

    /// Every later edit call never resolves.
    pub fn hang_edits(&self) {
        self.state.lock().unwrap().hanging_edits = true;
    }

    /// Number of edit calls that were left hanging.
    pub fn hung_edits(&self) -> usize {
        self.state.lock().unwrap().hung_edits
    }

    pub fn publishes(&self) -> Vec<Publish> {
        self.state
            .lock()
            .unwrap()
            .publishes
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn publishes_for(&self, conversation_id: ConversationId) -> Vec<Publish> {
        self.state
            .lock()
            .unwrap()
            .publishes
            .iter()
            .filter(|(id, _)| *id == conversation_id)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Current text of a message, after all successful edits.
    pub fn message_text(&self, message_id: i64) -> Option<String> {
        self.state.lock().unwrap().texts.get(&message_id).cloned()
    }

    /// Every text ever sent or edited in.
    pub fn all_texts(&self) -> Vec<String> {
        self.publishes()
            .into_iter()
            .filter_map(|p| match p {
                Publish::Send(text) | Publish::Edit(_, text) => Some(text),
                Publish::Photo(_) => None,
            })
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.publishes()
            .iter()
            .filter(|p| matches!(p, Publish::Send(_)))
            .count()
    }
}

#[async_trait]
impl MessagingClient for RecordingMessenger {
    async fn send_message(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> Result<MessageHandle, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(TransportError::Network("connection reset".to_string()));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.texts.insert(id, text.to_string());
        state
            .publishes
            .push((conversation_id, Publish::Send(text.to_string())));
        Ok(MessageHandle::new(conversation_id, id))
    }

    async fn edit_message(&self, handle: &MessageHandle, text: &str) -> Result<(), TransportError> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            if state.hanging_edits {
                state.hung_edits += 1;
            }
            state.hanging_edits
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_edits > 0 {
            state.failing_edits -= 1;
            return Err(TransportError::Rejected("Too Many Requests".to_string()));
        }
        state.texts.insert(handle.message_id, text.to_string());
        state.publishes.push((
            handle.conversation_id,
            Publish::Edit(handle.message_id, text.to_string()),
        ));
        Ok(())
    }

    async fn send_photo(
        &self,
        conversation_id: ConversationId,
        _image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MediaRef, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state
            .publishes
            .push((conversation_id, Publish::Photo(caption.map(str::to_string))));
        Ok(MediaRef::new(format!("photo-{}", id)))
    }

    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, TransportError> {
        Ok(media.as_str().as_bytes().to_vec())
    }
}

/// Backend answering each call with the next scripted result.
///
/// `Ok(events)` is replayed as a finished stream; a channel receiver handed
/// over with [`ScriptedBackend::push_live`] lets the test drive the stream.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<StreamHandle, BackendError>>>,
    calls: Mutex<Vec<(String, Vec<Turn>)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_events(&self, events: Vec<StreamEvent>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(StreamHandle::from_events(events)));
    }

    pub fn push_deltas(&self, deltas: &[&str]) {
        let mut events: Vec<StreamEvent> = deltas
            .iter()
            .map(|d| StreamEvent::Delta(d.to_string()))
            .collect();
        events.push(StreamEvent::Completed);
        self.push_events(events);
    }

    pub fn push_error(&self, error: BackendError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Returns the sender side of a stream the test feeds by hand.
    pub fn push_live(&self) -> mpsc::Sender<StreamEvent> {
        let (tx, rx) = mpsc::channel(64);
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(StreamHandle::new(rx)));
        tx
    }

    /// `(model, context)` of every call so far.
    pub fn calls(&self) -> Vec<(String, Vec<Turn>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn stream_completion(
        &self,
        model: &str,
        context: &[Turn],
    ) -> Result<StreamHandle, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), context.to_vec()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Rejected("no scripted response".to_string())))
    }
}

/// Image pipeline returning fixed bytes, or a fixed error.
pub struct StaticImagePipeline {
    pub result: Result<Vec<u8>, ImageError>,
    pub prompts: Mutex<Vec<(String, bool)>>,
}

impl StaticImagePipeline {
    pub fn new(result: Result<Vec<u8>, ImageError>) -> Self {
        Self {
            result,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImagePipeline for StaticImagePipeline {
    async fn generate(
        &self,
        _conversation_id: ConversationId,
        prompt: &str,
        source: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ImageError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), source.is_some()));
        self.result.clone()
    }
}

/// Conversation logger that keeps event types in memory.
#[derive(Default)]
pub struct MemoryConversationLogger {
    pub events: Mutex<Vec<(&'static str, ConversationId, serde_json::Value)>>,
}

impl MemoryConversationLogger {
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.0).collect()
    }
}

impl ConversationLogger for MemoryConversationLogger {
    fn log(&self, event: ConversationEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.conversation_id, event.payload));
    }
}
