//! Run driver: one user turn from posted message to rendered reply.
//!
//! A turn moves through [`TurnStage`]s in order. Polling is bounded by a
//! single wall-clock deadline; when it elapses the run is cancelled once,
//! best effort, and the turn is reported as failed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;

use crate::citations;
use crate::config::{Config, PollingPolicy};
use crate::error_taxonomy::ErrorEnvelope;
use crate::gateway::{AssistantGateway, GatewayError};
use crate::logging;
use crate::models::{
    AttachmentTool, MessageAttachment, MessageOrder, NewMessage, Role, Run, RunError, RunStatus,
    ThreadMessage,
};
use crate::session::Session;
use crate::ui_text::ReplyLocale;

/// Messages fetched by the single retry after a completed run shows no reply.
const RETRY_MESSAGE_LIMIT: u32 = 5;

// === Stages & Errors ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    New,
    ThreadReady,
    MessageSent,
    RunCreated,
    Polling,
    Terminal,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnStage::New => "new",
            TurnStage::ThreadReady => "thread_ready",
            TurnStage::MessageSent => "message_sent",
            TurnStage::RunCreated => "run_created",
            TurnStage::Polling => "polling",
            TurnStage::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// The local deadline elapsed before the run settled.
#[derive(Debug, Clone, Error)]
#[error("run {run_id} did not finish within {:.1}s", timeout.as_secs_f64())]
pub struct RunTimeoutError {
    pub run_id: String,
    pub timeout: Duration,
}

/// The gateway reported a non-successful terminal status.
#[derive(Debug, Clone, Error)]
#[error(
    "run ended with status {status}{}",
    .last_error
        .as_ref()
        .map(|e| format!(": {} ({})", e.message, e.code))
        .unwrap_or_default()
)]
pub struct RunFailedError {
    pub status: RunStatus,
    pub last_error: Option<RunError>,
}

/// The run asked for tool outputs, which this client never provides.
#[derive(Debug, Clone, Error)]
#[error("run {run_id} requires an action this client does not support")]
pub struct UnsupportedActionError {
    pub run_id: String,
}

/// A gateway call failed partway through a turn.
#[derive(Debug, Error)]
#[error("failed to {action} (stage {stage}): {source}")]
pub struct TurnError {
    pub stage: TurnStage,
    pub action: &'static str,
    #[source]
    pub source: GatewayError,
}

impl TurnError {
    fn at(stage: TurnStage, action: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| Self {
            stage,
            action,
            source,
        }
    }
}

// === Outcomes ===

#[derive(Debug)]
pub enum TurnOutcome {
    /// Rendered replies, already appended to the session history.
    Replied(Vec<String>),
    /// The run completed but produced no assistant message.
    NoVisibleResponse,
    ActionRequired(UnsupportedActionError),
    RunFailed(RunFailedError),
    TimedOut(RunTimeoutError),
    GatewayFailure(TurnError),
    /// Another turn is still in flight; nothing was sent.
    Busy,
}

impl TurnOutcome {
    /// Localized warning or error line for the presentation layer.
    #[must_use]
    pub fn notice(&self, locale: ReplyLocale) -> Option<String> {
        match self {
            TurnOutcome::Replied(_) => None,
            TurnOutcome::NoVisibleResponse => Some(locale.no_visible_response_notice().to_string()),
            TurnOutcome::ActionRequired(_) => Some(locale.action_required_notice().to_string()),
            TurnOutcome::RunFailed(err) => {
                Some(locale.run_failed_notice(err.status, err.last_error.as_ref()))
            }
            TurnOutcome::TimedOut(_) => Some(locale.timeout_notice().to_string()),
            TurnOutcome::GatewayFailure(_) => Some(locale.api_error_entry().to_string()),
            TurnOutcome::Busy => Some(locale.busy_notice().to_string()),
        }
    }

    #[must_use]
    pub fn error_envelope(&self) -> Option<ErrorEnvelope> {
        match self {
            TurnOutcome::ActionRequired(err) => Some(err.into()),
            TurnOutcome::RunFailed(err) => Some(err.into()),
            TurnOutcome::TimedOut(err) => Some(err.into()),
            TurnOutcome::GatewayFailure(err) => {
                let mut envelope = ErrorEnvelope::from(&err.source);
                envelope.message = err.to_string();
                Some(envelope)
            }
            TurnOutcome::Replied(_) | TurnOutcome::NoVisibleResponse | TurnOutcome::Busy => None,
        }
    }
}

enum PollResult {
    Settled(Run),
    TimedOut,
}

// === Driver ===

pub struct RunDriver {
    gateway: Arc<dyn AssistantGateway>,
    assistant_id: String,
    instructions: String,
    policy: PollingPolicy,
    locale: ReplyLocale,
}

impl RunDriver {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn AssistantGateway>,
        assistant_id: impl Into<String>,
        instructions: impl Into<String>,
        policy: PollingPolicy,
        locale: ReplyLocale,
    ) -> Self {
        Self {
            gateway,
            assistant_id: assistant_id.into(),
            instructions: instructions.into(),
            policy,
            locale,
        }
    }

    pub fn from_config(gateway: Arc<dyn AssistantGateway>, config: &Config) -> Result<Self> {
        Ok(Self::new(
            gateway,
            config.assistant_id()?,
            config.instructions(),
            config.polling_policy(),
            config.locale(),
        ))
    }

    #[must_use]
    pub fn gateway(&self) -> &dyn AssistantGateway {
        self.gateway.as_ref()
    }

    #[must_use]
    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    #[must_use]
    pub fn locale(&self) -> ReplyLocale {
        self.locale
    }

    /// Send `prompt` as one turn and record the result in `session`.
    ///
    /// The user entry is appended first. Failures add exactly one synthetic
    /// assistant entry; warnings add none. The busy flag is cleared on return.
    pub async fn submit_turn(&self, session: &mut Session, prompt: &str) -> TurnOutcome {
        if session.begin_turn().is_err() {
            logging::warn("Turn rejected: another turn is in flight");
            return TurnOutcome::Busy;
        }
        session.push(Role::User, prompt);

        let outcome = match self.drive(session, prompt).await {
            Ok(outcome) => outcome,
            Err(err) => {
                logging::error(format!("Turn aborted: {err}"));
                let entry = match err.source {
                    GatewayError::Api { .. } | GatewayError::Http(_) => {
                        self.locale.api_error_entry()
                    }
                    GatewayError::Decode(_) | GatewayError::Io(_) => {
                        self.locale.unexpected_error_entry()
                    }
                };
                session.push(Role::Assistant, entry);
                TurnOutcome::GatewayFailure(err)
            }
        };

        session.end_turn();
        outcome
    }

    async fn drive(&self, session: &mut Session, prompt: &str) -> Result<TurnOutcome, TurnError> {
        let thread_id = self.ensure_thread(session).await?;
        transition(TurnStage::ThreadReady, &thread_id);

        let message = NewMessage {
            role: Role::User,
            content: prompt.to_string(),
            attachments: session
                .documents()
                .iter()
                .map(|doc| MessageAttachment {
                    file_id: doc.document_id.clone(),
                    tools: vec![AttachmentTool::file_search()],
                })
                .collect(),
        };
        self.gateway
            .create_message(&thread_id, &message)
            .await
            .map_err(TurnError::at(TurnStage::ThreadReady, "post the user message"))?;
        transition(
            TurnStage::MessageSent,
            &format!("{} attachment(s)", message.attachments.len()),
        );

        let run = self
            .gateway
            .create_run(&thread_id, &self.assistant_id, &self.instructions)
            .await
            .map_err(TurnError::at(TurnStage::MessageSent, "create the run"))?;
        transition(TurnStage::RunCreated, &run.id);

        let run_id = run.id.clone();
        let settled = match self.wait_for_run(run).await? {
            PollResult::Settled(run) => run,
            PollResult::TimedOut => {
                transition(TurnStage::Terminal, "failed (local timeout)");
                session.push(
                    Role::Assistant,
                    self.locale.run_failed_entry(RunStatus::Failed),
                );
                return Ok(TurnOutcome::TimedOut(RunTimeoutError {
                    run_id,
                    timeout: self.policy.run_timeout,
                }));
            }
        };
        transition(TurnStage::Terminal, settled.status.as_str());

        match settled.status {
            RunStatus::Completed => self.collect_replies(session, &thread_id, &run_id).await,
            RunStatus::RequiresAction => {
                logging::warn(format!("Run {run_id} requires an unsupported action"));
                Ok(TurnOutcome::ActionRequired(UnsupportedActionError { run_id }))
            }
            status => {
                logging::error(format!("Run {run_id} ended with status {status}"));
                session.push(Role::Assistant, self.locale.run_failed_entry(status));
                Ok(TurnOutcome::RunFailed(RunFailedError {
                    status,
                    last_error: settled.last_error,
                }))
            }
        }
    }

    async fn ensure_thread(&self, session: &mut Session) -> Result<String, TurnError> {
        if let Some(thread_id) = session.thread_id() {
            return Ok(thread_id.to_string());
        }
        let thread = self
            .gateway
            .create_thread()
            .await
            .map_err(TurnError::at(TurnStage::New, "create the thread"))?;
        logging::info(format!("Created thread {}", thread.id));
        session.set_thread_id(thread.id.clone());
        Ok(thread.id)
    }

    async fn wait_for_run(&self, run: Run) -> Result<PollResult, TurnError> {
        let thread_id = run.thread_id.clone();
        let run_id = run.id.clone();
        transition(TurnStage::Polling, run.status.as_str());

        match tokio::time::timeout(self.policy.run_timeout, self.poll_until_settled(run)).await {
            Ok(result) => result.map(PollResult::Settled),
            Err(_) => {
                logging::warn(format!(
                    "Run {run_id} exceeded {:.1}s; cancelling",
                    self.policy.run_timeout.as_secs_f64()
                ));
                if let Err(err) = self.gateway.cancel_run(&thread_id, &run_id).await {
                    logging::warn(format!("Cancel request for run {run_id} failed: {err}"));
                }
                Ok(PollResult::TimedOut)
            }
        }
    }

    async fn poll_until_settled(&self, mut run: Run) -> Result<Run, TurnError> {
        while !run.status.stops_polling() {
            tokio::time::sleep(self.policy.poll_interval).await;
            run = self
                .gateway
                .get_run(&run.thread_id, &run.id)
                .await
                .map_err(TurnError::at(TurnStage::Polling, "check the run status"))?;
            logging::info(format!("Run {} status: {}", run.id, run.status));
        }
        Ok(run)
    }

    async fn collect_replies(
        &self,
        session: &mut Session,
        thread_id: &str,
        run_id: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let mut replies = self
            .run_messages(thread_id, run_id, MessageOrder::Asc, None)
            .await?;
        if replies.is_empty() {
            logging::info(format!(
                "No reply for run {run_id} yet; retrying in {:.1}s",
                self.policy.message_retry_delay.as_secs_f64()
            ));
            tokio::time::sleep(self.policy.message_retry_delay).await;
            replies = self
                .run_messages(thread_id, run_id, MessageOrder::Desc, Some(RETRY_MESSAGE_LIMIT))
                .await?;
            replies.reverse();
        }

        if replies.is_empty() {
            logging::warn(format!("Run {run_id} completed without a visible reply"));
            return Ok(TurnOutcome::NoVisibleResponse);
        }

        let mut rendered = Vec::with_capacity(replies.len());
        for message in &replies {
            let text = citations::render_message(
                message,
                session.documents(),
                self.gateway.as_ref(),
                self.locale,
            )
            .await;
            session.push(Role::Assistant, text.clone());
            rendered.push(text);
        }
        Ok(TurnOutcome::Replied(rendered))
    }

    async fn run_messages(
        &self,
        thread_id: &str,
        run_id: &str,
        order: MessageOrder,
        limit: Option<u32>,
    ) -> Result<Vec<ThreadMessage>, TurnError> {
        let messages = self
            .gateway
            .list_messages(thread_id, order, limit)
            .await
            .map_err(TurnError::at(TurnStage::Terminal, "list the thread messages"))?;
        Ok(messages
            .into_iter()
            .filter(|message| message.is_reply_to(run_id))
            .collect())
    }
}

fn transition(stage: TurnStage, detail: &str) {
    logging::info(format!("Turn stage -> {stage} ({detail})"));
}
