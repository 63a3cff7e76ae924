//! Persisted chat turn orchestration
//!
//! Composes the store, context assembly, and the gateway into one turn:
//! append the user message, replay prior history, complete, append the
//! reply. There is no per-conversation lock: concurrent turns on the same
//! conversation interleave at the storage layer, last write wins on
//! `updated_at`. A gateway failure is not rolled back, so the conversation
//! keeps the unanswered trailing user turn and a retry is just "send
//! again".

use std::sync::Arc;

use thiserror::Error;

use crate::context;
use crate::conversation::Role;
use crate::gateway::{ChatBackend, CompletionRequest, GatewayError};
use crate::store::{Store, StoreError, TokenUsage};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Outcome of one persisted turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub text: String,
    pub model: String,
    pub tokens_used: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

pub struct ConversationService {
    store: Arc<Store>,
    backend: Arc<dyn ChatBackend>,
}

impl ConversationService {
    pub fn new(store: Arc<Store>, backend: Arc<dyn ChatBackend>) -> Self {
        Self { store, backend }
    }

    /// Run one chat turn against an existing conversation.
    ///
    /// The write-then-read order is load-bearing: the user message is
    /// persisted first, then history is read and the trailing just-written
    /// row dropped, and `assemble` appends the fresh copy. Reordering
    /// either duplicates or omits the new turn.
    pub async fn send_message(
        &self,
        conversation_id: i64,
        text: &str,
        system_prompt: Option<String>,
        model: Option<String>,
    ) -> Result<ChatTurn, ServiceError> {
        if self.store.get_conversation(conversation_id).await?.is_none() {
            return Err(StoreError::ConversationNotFound(conversation_id).into());
        }

        self.store
            .append_message(conversation_id, Role::User, text, None, None)
            .await?;

        let mut history = self.store.history(conversation_id).await?;
        history.pop();

        let mut request = CompletionRequest::new(context::assemble(&history, text));
        request.system_prompt = system_prompt;
        request.model = model;

        let completion = match self.backend.complete(request).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!(
                    conversation_id,
                    error = %e,
                    "completion failed; user message retained without a reply"
                );
                return Err(e.into());
            }
        };

        self.store
            .append_message(
                conversation_id,
                Role::Assistant,
                &completion.text,
                Some(&completion.model),
                Some(TokenUsage {
                    tokens_used: i64::from(completion.total_tokens()),
                    input_tokens: i64::from(completion.input_tokens),
                    output_tokens: i64::from(completion.output_tokens),
                }),
            )
            .await?;

        Ok(ChatTurn {
            tokens_used: completion.total_tokens(),
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            text: completion.text,
            model: completion.model,
        })
    }
}
