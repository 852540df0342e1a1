//! API request/response models for the hosted Assistants API (v2 wire format).

use std::fmt;

use serde::{Deserialize, Serialize};

// === Threads & Messages ===

/// A conversation thread managed by the gateway.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Thread {
    pub id: String,
}

/// Author of a thread message.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Tool tag attached to a message attachment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AttachmentTool {
    #[serde(rename = "type")]
    pub tool_type: String,
}

impl AttachmentTool {
    #[must_use]
    pub fn file_search() -> Self {
        Self {
            tool_type: "file_search".to_string(),
        }
    }
}

/// A file attached to a user message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MessageAttachment {
    pub file_id: String,
    pub tools: Vec<AttachmentTool>,
}

/// Request payload for posting a message to a thread.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
}

/// A message stored in a thread.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ThreadMessage {
    pub id: String,
    #[serde(default)]
    pub run_id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Whether this message was written by the assistant during `run_id`.
    #[must_use]
    pub fn is_reply_to(&self, run_id: &str) -> bool {
        self.role == Role::Assistant && self.run_id.as_deref() == Some(run_id)
    }
}

/// A single content block inside a thread message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum MessageContent {
    #[serde(rename = "text")]
    Text { text: TextContent },
    /// Images, refusals and any block type this client does not render.
    #[serde(other)]
    Unsupported,
}

/// Text payload of a content block.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Marker linking a span of assistant text to a cited or generated file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Annotation {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_citation: Option<FileCitation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<FilePathRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
}

/// Source document quoted by a file citation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct FileCitation {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub quote: Option<String>,
}

/// Output file produced by an assistant tool.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct FilePathRef {
    #[serde(default)]
    pub file_id: String,
}

/// Sort direction for message listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrder {
    Asc,
    Desc,
}

impl MessageOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageOrder::Asc => "asc",
            MessageOrder::Desc => "desc",
        }
    }
}

/// Paginated list envelope returned by list endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

// === Runs ===

/// Lifecycle status of a run, as reported by the gateway.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// No further state change happens without starting a new run.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
        )
    }

    /// Polling stops on terminal statuses and on `requires_action`.
    #[must_use]
    pub fn stops_polling(self) -> bool {
        self.is_terminal() || self == RunStatus::RequiresAction
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by the gateway for a failed run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// One execution of the assistant against a thread.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

// === Files ===

/// Purpose tag sent with an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePurpose {
    Assistants,
}

impl FilePurpose {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilePurpose::Assistants => "assistants",
        }
    }
}

/// Stored file metadata.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Result of a file deletion request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileDeletion {
    pub id: String,
    pub deleted: bool,
}

// === Assistants ===

/// Tool enabled on an assistant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AssistantTool {
    #[serde(rename = "type")]
    pub tool_type: String,
}

/// Assistant configuration (only the fields this client inspects).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tools: Vec<AssistantTool>,
}

impl Assistant {
    #[must_use]
    pub fn has_file_search(&self) -> bool {
        self.tools.iter().any(|tool| tool.tool_type == "file_search")
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
