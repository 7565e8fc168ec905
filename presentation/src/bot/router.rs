//! Command router
//!
//! Maps inbound platform events to conversation controller calls and turns
//! their outcomes into the short notices users see. [`route`] is the pure
//! mapping; [`CommandRouter::dispatch`] executes it.

use super::command::{self, Command};
use relay_application::{
    ChatKind, ConversationController, ImageError, InboundEvent, InboundPayload, MessagingClient,
    RequestError, RequestMode, RequestOutcome,
};
use relay_domain::{ConversationId, MediaRef};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const GREETING: &str = "Welcome, you can ask me questions now.\n\
    In private chats just write; in groups use /gemini <question>.\n\
    /switch changes the default model and /clear forgets the conversation.";
pub const BUSY_NOTICE: &str =
    "Still working on your previous request, please wait for it to finish.";
pub const CLEARED_NOTICE: &str = "History cleared.";
pub const EDIT_NEEDS_PHOTO: &str = "Send a photo with /edit <instructions> as its caption.";
pub const IMAGE_UNAVAILABLE: &str = "Image generation is not available on this bot.";

/// What to do with one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Greet,
    Request { input: String, mode: RequestMode },
    Draw { prompt: String },
    EditPhoto { prompt: String, media: MediaRef },
    /// Reply with a fixed notice and do nothing else.
    Notice(&'static str),
}

/// Decide how an event is handled; `None` means it is ignored.
///
/// `bot_username` is this bot's own username. Commands carrying an
/// `@botname` suffix for any other bot are ignored.
pub fn route(event: &InboundEvent, bot_username: Option<&str>) -> Option<Route> {
    match &event.payload {
        InboundPayload::Text(text) => route_text(text, event.chat_kind, bot_username),
        InboundPayload::Photo { media, caption } => {
            route_photo(media, caption.as_deref(), event.chat_kind, bot_username)
        }
    }
}

fn request(input: &str, mode: RequestMode) -> Option<Route> {
    Some(Route::Request {
        input: input.to_string(),
        mode,
    })
}

fn route_text(text: &str, chat_kind: ChatKind, bot_username: Option<&str>) -> Option<Route> {
    let Some(command) = Command::parse(text) else {
        return match chat_kind {
            ChatKind::Private => request(text, RequestMode::Chat),
            ChatKind::Group => None,
        };
    };
    if !command.is_addressed_to(bot_username) {
        return None;
    }

    match command.name {
        command::START => Some(Route::Greet),
        command::GEMINI => request(command.args, RequestMode::Chat),
        command::GEMINI_PRO => request(command.args, RequestMode::ChatSecondary),
        command::CLEAR => request("", RequestMode::ClearHistory),
        command::SWITCH => request("", RequestMode::SwitchModel),
        command::DRAW => Some(Route::Draw {
            prompt: command.args.to_string(),
        }),
        command::EDIT => Some(Route::Notice(EDIT_NEEDS_PHOTO)),
        // Unknown commands are plain questions in private chats
        _ => match chat_kind {
            ChatKind::Private => request(text, RequestMode::Chat),
            ChatKind::Group => None,
        },
    }
}

fn route_photo(
    media: &MediaRef,
    caption: Option<&str>,
    chat_kind: ChatKind,
    bot_username: Option<&str>,
) -> Option<Route> {
    let caption = caption?;
    let prompt = match Command::parse(caption) {
        Some(command) if !command.is_addressed_to(bot_username) => return None,
        Some(command) if command.name == command::EDIT => command.args,
        _ if chat_kind == ChatKind::Private => caption.trim(),
        _ => return None,
    };
    Some(Route::EditPhoto {
        prompt: prompt.to_string(),
        media: media.clone(),
    })
}

fn usage_hint(route: &Route) -> &'static str {
    match route {
        Route::Request {
            mode: RequestMode::ChatSecondary,
            ..
        } => "Usage: /gemini_pro <question>",
        Route::Draw { .. } => "Usage: /draw <description of the picture>",
        Route::EditPhoto { .. } => EDIT_NEEDS_PHOTO,
        _ => "Usage: /gemini <question>",
    }
}

/// Executes routes against the conversation controller.
pub struct CommandRouter {
    controller: Arc<ConversationController>,
    messenger: Arc<dyn MessagingClient>,
    bot_username: Option<String>,
}

impl CommandRouter {
    pub fn new(controller: Arc<ConversationController>, messenger: Arc<dyn MessagingClient>) -> Self {
        Self {
            controller,
            messenger,
            bot_username: None,
        }
    }

    /// Set the username reported by the platform for this bot.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Handle one inbound event to completion.
    ///
    /// Every failure is reported to the user or logged here; nothing is
    /// returned to the polling loop.
    pub async fn dispatch(&self, event: InboundEvent) {
        let conversation_id = event.conversation_id;
        let Some(route) = route(&event, self.bot_username.as_deref()) else {
            debug!("Ignoring event in conversation {}", conversation_id);
            return;
        };

        let result = match &route {
            Route::Greet => {
                self.notify(conversation_id, GREETING).await;
                return;
            }
            Route::Notice(text) => {
                self.notify(conversation_id, text).await;
                return;
            }
            Route::Request { input, mode } => {
                self.controller
                    .handle_request(conversation_id, input, *mode)
                    .await
            }
            Route::Draw { prompt } => {
                self.controller
                    .handle_image(conversation_id, prompt, None)
                    .await
            }
            Route::EditPhoto { prompt, media } => {
                self.controller
                    .handle_image(conversation_id, prompt, Some(media.clone()))
                    .await
            }
        };

        match result {
            Ok(outcome) => self.confirm(conversation_id, outcome).await,
            Err(e) => self.report(conversation_id, &route, e).await,
        }
    }

    async fn confirm(&self, conversation_id: ConversationId, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::HistoryCleared => self.notify(conversation_id, CLEARED_NOTICE).await,
            RequestOutcome::ModelSwitched(choice) => {
                let text = format!(
                    "Now using {} ({}).",
                    self.controller.models().resolve(choice),
                    choice
                );
                self.notify(conversation_id, &text).await;
            }
            RequestOutcome::Answered(_) | RequestOutcome::ImageSent(_) => {}
        }
    }

    async fn report(&self, conversation_id: ConversationId, route: &Route, error: RequestError) {
        match error {
            RequestError::ConversationBusy => self.notify(conversation_id, BUSY_NOTICE).await,
            RequestError::EmptyInput => self.notify(conversation_id, usage_hint(route)).await,
            // The controller already told the user
            RequestError::Backend(_) | RequestError::Timeout | RequestError::Cancelled => {}
            RequestError::Image(ImageError::Unavailable) => {
                self.notify(conversation_id, IMAGE_UNAVAILABLE).await
            }
            RequestError::Image(e) => {
                let text = format!("Could not create the image: {}", e);
                self.notify(conversation_id, &text).await;
            }
            RequestError::Transport(e) => {
                warn!(
                    "Image delivery for conversation {} failed: {}",
                    conversation_id, e
                );
                self.notify(conversation_id, "Could not transfer the image, please try again.")
                    .await;
            }
        }
    }

    async fn notify(&self, conversation_id: ConversationId, text: &str) {
        match self.messenger.send_message(conversation_id, text).await {
            Ok(_) => info!("Sent notice to conversation {}", conversation_id),
            Err(e) => warn!(
                "Failed to send notice to conversation {}: {}",
                conversation_id, e
            ),
        }
    }
}
