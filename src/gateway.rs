//! Contract for the remote assistant service.
//!
//! The driver, the upload manager and the citation renderer only talk to the
//! service through [`AssistantGateway`], so tests can swap in a recording stub.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Assistant, FileDeletion, FileObject, FilePurpose, MessageOrder, NewMessage, Run, Thread,
    ThreadMessage,
};

// === Errors ===

/// Failure talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, TLS error, etc.
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    /// The gateway answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    /// The response body did not match the expected shape.
    #[error("failed to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Reading a local file for upload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// HTTP status of an API error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            GatewayError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            GatewayError::Http(err) => err.is_timeout(),
            GatewayError::Api { status, .. } => *status == 408,
            _ => false,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

// === Trait ===

/// Operations the client needs from the hosted assistant service.
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    async fn create_thread(&self) -> GatewayResult<Thread>;

    async fn create_message(
        &self,
        thread_id: &str,
        message: &NewMessage,
    ) -> GatewayResult<ThreadMessage>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: &str,
    ) -> GatewayResult<Run>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> GatewayResult<Run>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> GatewayResult<Run>;

    async fn list_messages(
        &self,
        thread_id: &str,
        order: MessageOrder,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<ThreadMessage>>;

    /// Upload the file at `path`, presenting it to the gateway as `file_name`.
    async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
        purpose: FilePurpose,
    ) -> GatewayResult<FileObject>;

    async fn get_file(&self, file_id: &str) -> GatewayResult<FileObject>;

    async fn delete_file(&self, file_id: &str) -> GatewayResult<FileDeletion>;

    async fn get_assistant(&self, assistant_id: &str) -> GatewayResult<Assistant>;
}
