//! Shared test-only helpers.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;

use crate::gateway::{AssistantGateway, GatewayError, GatewayResult};
use crate::models::{
    Annotation, Assistant, AssistantTool, FileCitation, FileDeletion, FileObject, FilePathRef,
    FilePurpose, MessageContent, MessageOrder, NewMessage, Role, Run, RunError, RunStatus,
    TextContent, Thread, ThreadMessage,
};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Acquire the process-wide env-var mutex.
///
/// A test that panicked while holding the lock must not fail every later test.
pub(crate) fn lock_test_env() -> MutexGuard<'static, ()> {
    match env_lock().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// === Stub Gateway ===

/// A file the stub received, read back while the staged path still existed.
#[derive(Debug, Clone)]
pub(crate) struct RecordedUpload {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct StubState {
    calls: Vec<&'static str>,
    run_statuses: VecDeque<RunStatus>,
    last_error: Option<RunError>,
    listings: VecDeque<Vec<ThreadMessage>>,
    list_requests: Vec<(MessageOrder, Option<u32>)>,
    posted: Vec<NewMessage>,
    uploads: Vec<RecordedUpload>,
    files: HashMap<String, String>,
    assistant_tools: Vec<String>,
    failing_call: Option<&'static str>,
    refuse_delete: bool,
    threads: usize,
    runs: usize,
    uploaded: usize,
}

/// In-memory [`AssistantGateway`] that records every call.
///
/// `get_run` pops scripted statuses and reports `in_progress` once the script
/// runs out. `list_messages` pops scripted listings and returns nothing after.
#[derive(Default)]
pub(crate) struct StubGateway {
    state: Mutex<StubState>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    pub fn with_run_statuses(self, statuses: impl IntoIterator<Item = RunStatus>) -> Self {
        self.state().run_statuses.extend(statuses);
        self
    }

    pub fn with_last_error(self, code: &str, message: &str) -> Self {
        self.state().last_error = Some(RunError {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    pub fn with_listing(self, messages: Vec<ThreadMessage>) -> Self {
        self.state().listings.push_back(messages);
        self
    }

    pub fn with_file(self, file_id: &str, filename: &str) -> Self {
        self.state()
            .files
            .insert(file_id.to_string(), filename.to_string());
        self
    }

    pub fn with_assistant_tools(self, tools: &[&str]) -> Self {
        self.state().assistant_tools = tools.iter().map(|tool| (*tool).to_string()).collect();
        self
    }

    /// Make every call named `call` answer with HTTP 500.
    pub fn failing_on(self, call: &'static str) -> Self {
        self.state().failing_call = Some(call);
        self
    }

    pub fn refusing_delete(self) -> Self {
        self.state().refuse_delete = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn calls_to(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == call).count()
    }

    pub fn posted_messages(&self) -> Vec<NewMessage> {
        self.state().posted.clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state().uploads.clone()
    }

    pub fn list_requests(&self) -> Vec<(MessageOrder, Option<u32>)> {
        self.state().list_requests.clone()
    }

    fn record(&self, call: &'static str) -> GatewayResult<MutexGuard<'_, StubState>> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failing_call == Some(call) {
            return Err(GatewayError::Api {
                status: 500,
                message: format!("{call} exploded"),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl AssistantGateway for StubGateway {
    async fn create_thread(&self) -> GatewayResult<Thread> {
        let mut state = self.record("create_thread")?;
        state.threads += 1;
        Ok(Thread {
            id: format!("thread_{}", state.threads),
        })
    }

    async fn create_message(
        &self,
        _thread_id: &str,
        message: &NewMessage,
    ) -> GatewayResult<ThreadMessage> {
        let mut state = self.record("create_message")?;
        state.posted.push(message.clone());
        Ok(ThreadMessage {
            id: format!("msg_user_{}", state.posted.len()),
            run_id: None,
            role: message.role,
            content: Vec::new(),
        })
    }

    async fn create_run(
        &self,
        thread_id: &str,
        _assistant_id: &str,
        _instructions: &str,
    ) -> GatewayResult<Run> {
        let mut state = self.record("create_run")?;
        state.runs += 1;
        Ok(Run {
            id: format!("run_{}", state.runs),
            thread_id: thread_id.to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> GatewayResult<Run> {
        let mut state = self.record("get_run")?;
        let status = state
            .run_statuses
            .pop_front()
            .unwrap_or(RunStatus::InProgress);
        let last_error = if status.is_terminal() && status != RunStatus::Completed {
            state.last_error.clone()
        } else {
            None
        };
        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status,
            last_error,
        })
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> GatewayResult<Run> {
        self.record("cancel_run")?;
        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status: RunStatus::Cancelling,
            last_error: None,
        })
    }

    async fn list_messages(
        &self,
        _thread_id: &str,
        order: MessageOrder,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<ThreadMessage>> {
        let mut state = self.record("list_messages")?;
        state.list_requests.push((order, limit));
        Ok(state.listings.pop_front().unwrap_or_default())
    }

    async fn upload_file(
        &self,
        path: &Path,
        file_name: &str,
        _purpose: FilePurpose,
    ) -> GatewayResult<FileObject> {
        let bytes = std::fs::read(path)?;
        self.state().uploads.push(RecordedUpload {
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            bytes,
        });
        let mut state = self.record("upload_file")?;
        state.uploaded += 1;
        let id = format!("file_{}", state.uploaded);
        state.files.insert(id.clone(), file_name.to_string());
        Ok(FileObject {
            id,
            filename: file_name.to_string(),
            bytes: None,
        })
    }

    async fn get_file(&self, file_id: &str) -> GatewayResult<FileObject> {
        let state = self.record("get_file")?;
        match state.files.get(file_id) {
            Some(filename) => Ok(FileObject {
                id: file_id.to_string(),
                filename: filename.clone(),
                bytes: None,
            }),
            None => Err(GatewayError::Api {
                status: 404,
                message: format!("No such File object: {file_id}"),
            }),
        }
    }

    async fn delete_file(&self, file_id: &str) -> GatewayResult<FileDeletion> {
        let state = self.record("delete_file")?;
        Ok(FileDeletion {
            id: file_id.to_string(),
            deleted: !state.refuse_delete,
        })
    }

    async fn get_assistant(&self, assistant_id: &str) -> GatewayResult<Assistant> {
        let state = self.record("get_assistant")?;
        Ok(Assistant {
            id: assistant_id.to_string(),
            name: Some("Asistente Legal".to_string()),
            model: Some("gpt-4o".to_string()),
            tools: state
                .assistant_tools
                .iter()
                .map(|tool_type| AssistantTool {
                    tool_type: tool_type.clone(),
                })
                .collect(),
        })
    }
}

// === Fixtures ===

pub(crate) fn assistant_reply(
    id: &str,
    run_id: &str,
    value: &str,
    annotations: Vec<Annotation>,
) -> ThreadMessage {
    ThreadMessage {
        id: id.to_string(),
        run_id: Some(run_id.to_string()),
        role: Role::Assistant,
        content: vec![MessageContent::Text {
            text: TextContent {
                value: value.to_string(),
                annotations,
            },
        }],
    }
}

pub(crate) fn citation(span: &str, file_id: &str, quote: Option<&str>) -> Annotation {
    Annotation {
        kind: "file_citation".to_string(),
        text: span.to_string(),
        file_citation: Some(FileCitation {
            file_id: file_id.to_string(),
            quote: quote.map(str::to_string),
        }),
        ..Annotation::default()
    }
}

pub(crate) fn generated_file(span: &str, file_id: &str) -> Annotation {
    Annotation {
        kind: "file_path".to_string(),
        text: span.to_string(),
        file_path: Some(FilePathRef {
            file_id: file_id.to_string(),
        }),
        ..Annotation::default()
    }
}
