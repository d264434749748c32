//! A conversational session that streams each reply from a chat provider.
//!
//! Every turn appends the user's utterance to the history, sends the whole
//! history to the provider, and commits the assistant's reply only once the
//! provider's stream has ended. The future returned by
//! [`ChatSession::send_with_observer`] resolves at that point and no earlier.
//!
//! Dropping that future cancels the turn: the provider stream is dropped with
//! it, nothing is committed, and the session accepts a new turn.

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::chat_completions::{
    ChatCompletion, ChatCompletionMessage, ChatCompletionRequest, ChatCompletionRequestBuilder,
    Role,
};
use crate::config::SessionConfig;
use crate::delta::{ChatDelta, DeltaAccumulator};
use crate::history::ConversationHistory;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    TurnInFlight,
    /// The last turn failed. A new turn may start as from `Idle`.
    Failed,
}

pub struct ChatSession {
    client: Box<dyn ChatCompletion>,
    config: SessionConfig,
    inner: Mutex<SessionInner>,
}

/// History and turn state share one lock so a state check and the history
/// access it guards cannot interleave with a turn starting.
struct SessionInner {
    history: ConversationHistory,
    state: SessionState,
}

impl SessionInner {
    fn ensure_no_turn_in_flight(&self) -> Result<()> {
        match self.state {
            SessionState::TurnInFlight => Err(Error::ConcurrentTurnError),
            SessionState::Idle | SessionState::Failed => Ok(()),
        }
    }
}

impl ChatSession {
    pub fn new(client: Box<dyn ChatCompletion>, config: SessionConfig) -> Self {
        Self {
            client,
            inner: Mutex::new(SessionInner {
                history: ConversationHistory::initialize(config.system_prompt()),
                state: SessionState::Idle,
            }),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state
    }

    /// A copy of the conversation so far. Unavailable while a turn is streaming.
    pub fn history(&self) -> Result<Vec<ChatCompletionMessage>> {
        let inner = lock(&self.inner);
        inner.ensure_no_turn_in_flight()?;
        Ok(inner.history.snapshot())
    }

    /// Forgets every exchanged message, keeping the configured system prompt.
    pub fn clear(&self) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.ensure_no_turn_in_flight()?;
        inner.history.clear();
        debug!("conversation history cleared");
        Ok(())
    }

    pub async fn send(&self, utterance: &str) -> Result<String> {
        self.send_with_observer(utterance, |_: &str| {}).await
    }

    /// Runs one turn and returns the assistant's final text.
    ///
    /// `observer` receives each non-empty fragment as it arrives, before any
    /// finish-reason annotation is applied. It is not called once this future
    /// has resolved.
    pub async fn send_with_observer<F>(&self, utterance: &str, mut observer: F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        if utterance.is_empty() {
            return Err(Error::EmptyUtteranceError);
        }

        let turn = TurnGuard::begin(&self.inner)?;

        let request = {
            let mut inner = lock(&self.inner);
            inner.history.append(Role::User, utterance)?;
            ChatCompletionRequestBuilder::default()
                .model(self.config.deployment_id())
                .messages(inner.history.snapshot())
                .stream(true)
                .build()?
        };

        let drained = self.drain(&request, &mut observer);
        let outcome = match self.config.turn_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, drained)
                .await
                .unwrap_or(Err(Error::TurnTimeoutError(timeout))),
            None => drained.await,
        };

        match outcome {
            Ok(text) => {
                lock(&self.inner)
                    .history
                    .append(Role::Assistant, text.as_str())?;
                turn.complete();
                Ok(text)
            }
            Err(err) => {
                warn!(error = %err, "turn failed, no assistant message committed");
                Err(err)
            }
        }
    }

    async fn drain<F>(&self, request: &ChatCompletionRequest, observer: &mut F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let mut stream = self
            .client
            .stream_chat_completions(request)
            .await
            .map_err(Error::provider)?;

        let mut accumulator = DeltaAccumulator::new();
        while let Some(chunk) = stream.next().await {
            let delta = ChatDelta::from(chunk.map_err(Error::provider)?);
            if delta.is_empty() {
                continue;
            }
            if let Some(fragment) = accumulator.observe(&delta)? {
                observer(fragment);
            }
        }
        drop(stream);

        info!(
            deployment_id = %request.model,
            finish_reason = ?accumulator.finish_reason(),
            bytes = accumulator.text().len(),
            "turn completed"
        );
        Ok(accumulator.finalize())
    }
}

/// Marks the session busy for the lifetime of one turn.
///
/// Dropped without [`TurnGuard::complete`], whether by an error or by the
/// turn future being dropped, it leaves the session `Failed`.
struct TurnGuard<'a> {
    inner: &'a Mutex<SessionInner>,
    completed: bool,
}

impl<'a> TurnGuard<'a> {
    fn begin(inner: &'a Mutex<SessionInner>) -> Result<Self> {
        let mut current = lock(inner);
        current.ensure_no_turn_in_flight()?;
        current.state = SessionState::TurnInFlight;
        Ok(Self {
            inner,
            completed: false,
        })
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        lock(self.inner).state = if self.completed {
            SessionState::Idle
        } else {
            SessionState::Failed
        };
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
