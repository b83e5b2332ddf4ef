//! State of the conversation screen and the view model it renders from.
//!
//! The GTK layer owns a [`ConversationScreen`] on the main thread. A submit is
//! split around the network call: [`ConversationScreen::begin_submit`] hands
//! out the payload, the request runs elsewhere, and
//! [`ConversationScreen::finish_submit`] folds the outcome back in.

use chrono::{DateTime, Local, TimeZone, Utc};
use log::{debug, error, warn};
use serde_json::Value;
use std::fmt::Display;

use crate::api::client::SubmitError;
use crate::api::models::{Conversation, OutgoingMessage};
use crate::api::reply::{normalize_response, reply_text};
use crate::launch::LaunchParams;
use crate::storage::{ConversationStore, KeyValueStore, StorageError, StorageScope};

pub const SUBMIT_ERROR_MESSAGE: &str = "Error occurred while sending the message.";
pub const SEND_LABEL: &str = "Send";
pub const SENDING_LABEL: &str = "Sending...";

/// Reply supplied at launch, shown until the first successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct Greeting {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// A request handed out by `begin_submit` and not yet resolved.
#[derive(Debug)]
pub struct PendingSubmit {
    payload: OutgoingMessage,
}

impl PendingSubmit {
    pub fn payload(&self) -> &OutgoingMessage {
        &self.payload
    }
}

pub struct ConversationScreen<S> {
    phone_number: String,
    draft: String,
    greeting: Option<Greeting>,
    has_interacted: bool,
    conversations: Vec<Conversation>,
    is_loading: bool,
    error: Option<String>,
    store_error: Option<StorageError>,
    store: ConversationStore<S>,
}

impl<S: KeyValueStore> ConversationScreen<S> {
    /// Identity and greeting come from `params`, the thread from `store`.
    /// Nothing is written back during setup.
    pub fn init(params: LaunchParams, store: S, now: DateTime<Utc>) -> Self {
        Self::init_scoped(params, store, StorageScope::Global, now)
    }

    pub fn init_scoped(params: LaunchParams, store: S, scope: StorageScope, now: DateTime<Utc>) -> Self {
        let greeting = params.response_message.as_deref().map(|raw| Greeting {
            text: normalize_response(raw),
            received_at: now,
        });
        let store = ConversationStore::with_scope(store, scope);
        let conversations = store.load(&params.phone_number);
        debug!(
            "Loaded {} conversations for {:?}",
            conversations.len(),
            params.phone_number
        );
        Self {
            phone_number: params.phone_number,
            draft: String::new(),
            greeting,
            has_interacted: false,
            conversations,
            is_loading: false,
            error: None,
            store_error: None,
            store,
        }
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn greeting(&self) -> Option<&Greeting> {
        self.greeting.as_ref()
    }

    pub fn has_interacted(&self) -> bool {
        self.has_interacted
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn store(&self) -> &ConversationStore<S> {
        &self.store
    }

    /// `None` while another request is in flight. Empty drafts are still sent.
    pub fn begin_submit(&mut self) -> Option<PendingSubmit> {
        if self.is_loading {
            return None;
        }
        self.is_loading = true;
        let payload = OutgoingMessage {
            phone_number: self.phone_number.clone(),
            message: self.draft.trim().to_string(),
        };
        debug!("Sending {} chars for {:?}", payload.message.len(), payload.phone_number);
        Some(PendingSubmit { payload })
    }

    pub fn finish_submit(
        &mut self,
        pending: PendingSubmit,
        outcome: Result<Value, SubmitError>,
        now: DateTime<Utc>,
    ) {
        match outcome {
            Ok(status) => {
                let reply = reply_text(&status);
                if !self.has_interacted {
                    self.greeting = None;
                    self.has_interacted = true;
                }
                self.conversations.push(Conversation::new(pending.payload.message, reply, now));
                self.error = None;
                self.persist();
            }
            Err(e) => {
                error!("Error occurred ({}): {e}", e.kind());
                self.error = Some(SUBMIT_ERROR_MESSAGE.to_string());
            }
        }
        self.is_loading = false;
        self.draft.clear();
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.phone_number, &self.conversations) {
            warn!("Failed to persist conversations: {e}");
            self.store_error = Some(e);
        }
    }

    /// The last write failure, if one happened since the previous call.
    pub fn take_store_error(&mut self) -> Option<StorageError> {
        self.store_error.take()
    }

    pub fn view(&self) -> ScreenView {
        self.view_in(&Local)
    }

    /// Same as [`view`](Self::view) with timestamps shown in `tz`.
    pub fn view_in<Tz>(&self, tz: &Tz) -> ScreenView
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let greeting = self
            .greeting
            .as_ref()
            .filter(|_| !self.has_interacted)
            .map(|g| Bubble {
                text: normalize_response(&g.text),
                timestamp: format_timestamp(&g.received_at, tz),
            });
        let threads = self
            .conversations
            .iter()
            .rev()
            .map(|conv| Thread {
                replies: conv
                    .replies()
                    .map(|(text, at)| Bubble {
                        text: normalize_response(text),
                        timestamp: format_timestamp(at, tz),
                    })
                    .collect(),
                sent: Bubble {
                    text: conv.sent_message.clone(),
                    timestamp: format_timestamp(&conv.sent_timestamp, tz),
                },
            })
            .collect();
        ScreenView {
            profile_line: format!("Phone Number: {}", self.phone_number),
            greeting,
            threads,
            draft: self.draft.clone(),
            show_placeholder: self.draft.is_empty(),
            send_label: if self.is_loading { SENDING_LABEL } else { SEND_LABEL },
            send_enabled: !self.is_loading,
            error: self.error.clone(),
        }
    }
}

pub fn format_timestamp<Tz>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub text: String,
    pub timestamp: String,
}

/// One conversation as rendered: replies first, then the sent message.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub replies: Vec<Bubble>,
    pub sent: Bubble,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenView {
    pub profile_line: String,
    pub greeting: Option<Bubble>,
    /// Newest first.
    pub threads: Vec<Thread>,
    pub draft: String,
    /// The input hint is drawn only over an empty draft.
    pub show_placeholder: bool,
    pub send_label: &'static str,
    pub send_enabled: bool,
    pub error: Option<String>,
}
