//! Conversation state for one interactive session.
//!
//! A [`Session`] starts empty, is owned by whoever drives the conversation and
//! is passed by `&mut` into every operation. Dropping it ends the session; the
//! remote thread is left in place.

use chrono::{DateTime, Local};

use crate::models::Role;

/// Local record pairing a gateway file id with a human display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    pub document_id: String,
    pub display_name: String,
}

/// One line of the visible transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Local>,
}

impl ChatEntry {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Local::now(),
        }
    }
}

/// Returned when a turn is submitted while another one is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBusy;

#[derive(Debug, Default)]
pub struct Session {
    thread_id: Option<String>,
    history: Vec<ChatEntry>,
    documents: Vec<DocumentReference>,
    processing: bool,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Thread ===

    #[must_use]
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn set_thread_id(&mut self, thread_id: impl Into<String>) {
        self.thread_id = Some(thread_id.into());
    }

    /// Forget the thread and the transcript. Uploaded documents stay active.
    pub fn reset_conversation(&mut self) {
        self.thread_id = None;
        self.history.clear();
    }

    // === History ===

    #[must_use]
    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(ChatEntry::new(role, content));
    }

    // === Documents ===

    #[must_use]
    pub fn documents(&self) -> &[DocumentReference] {
        &self.documents
    }

    #[must_use]
    pub fn has_document_named(&self, display_name: &str) -> bool {
        self.documents
            .iter()
            .any(|doc| doc.display_name == display_name)
    }

    #[must_use]
    pub fn document_name(&self, document_id: &str) -> Option<&str> {
        display_name_of(&self.documents, document_id)
    }

    pub(crate) fn add_document(&mut self, document: DocumentReference) {
        self.documents.push(document);
    }

    pub(crate) fn remove_document(&mut self, document_id: &str) -> Option<DocumentReference> {
        let index = self
            .documents
            .iter()
            .position(|doc| doc.document_id == document_id)?;
        Some(self.documents.remove(index))
    }

    // === Busy Flag ===

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Mark a turn as in flight. Only one turn may run per session.
    pub fn begin_turn(&mut self) -> Result<(), SessionBusy> {
        if self.processing {
            return Err(SessionBusy);
        }
        self.processing = true;
        Ok(())
    }

    pub fn end_turn(&mut self) {
        self.processing = false;
    }
}

/// Display name of the active document with `document_id`, if any.
#[must_use]
pub fn display_name_of<'a>(
    documents: &'a [DocumentReference],
    document_id: &str,
) -> Option<&'a str> {
    documents
        .iter()
        .find(|doc| doc.document_id == document_id)
        .map(|doc| doc.display_name.as_str())
}
