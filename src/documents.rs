//! Document upload manager.
//!
//! Uploads are staged through a named temp file that keeps the original
//! extension, so the gateway can infer the document type. The staged copy is
//! removed before the call returns.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gateway::{AssistantGateway, GatewayError};
use crate::logging;
use crate::models::FilePurpose;
use crate::session::{DocumentReference, Session};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to stage '{display_name}' for upload: {source}")]
    Stage {
        display_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("gateway request for '{target}' failed: {source}")]
    Gateway {
        target: String,
        #[source]
        source: GatewayError,
    },
    #[error("gateway did not confirm deletion of {document_id}")]
    NotConfirmed { document_id: String },
    #[error("no active document matches '{0}'")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(DocumentReference),
    /// A document with the same display name is already active.
    Duplicate { display_name: String },
}

/// Upload `bytes` as `display_name` and add it to the session's active list.
pub async fn upload(
    session: &mut Session,
    gateway: &dyn AssistantGateway,
    bytes: &[u8],
    display_name: &str,
) -> Result<UploadOutcome, UploadError> {
    if session.has_document_named(display_name) {
        logging::info(format!("Skipping duplicate upload of '{display_name}'"));
        return Ok(UploadOutcome::Duplicate {
            display_name: display_name.to_string(),
        });
    }

    let staged = stage(bytes, display_name).map_err(|source| UploadError::Stage {
        display_name: display_name.to_string(),
        source,
    })?;
    let result = gateway
        .upload_file(staged.path(), display_name, FilePurpose::Assistants)
        .await;
    let staged_path = staged.path().to_path_buf();
    if let Err(err) = staged.close() {
        logging::warn(format!(
            "Could not remove staged file {}: {err}",
            staged_path.display()
        ));
    }

    let file = result.map_err(|source| UploadError::Gateway {
        target: display_name.to_string(),
        source,
    })?;
    logging::info(format!("Uploaded '{display_name}' as {}", file.id));

    let document = DocumentReference {
        document_id: file.id,
        display_name: display_name.to_string(),
    };
    session.add_document(document.clone());
    Ok(UploadOutcome::Uploaded(document))
}

/// Read a local file and upload it under its file name.
pub async fn upload_path(
    session: &mut Session,
    gateway: &dyn AssistantGateway,
    path: &Path,
) -> Result<UploadOutcome, UploadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let display_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    upload(session, gateway, &bytes, &display_name).await
}

/// Delete a document from the gateway; the local entry goes only on confirmation.
pub async fn delete(
    session: &mut Session,
    gateway: &dyn AssistantGateway,
    document_id: &str,
) -> Result<DocumentReference, UploadError> {
    let Some(display_name) = session.document_name(document_id).map(str::to_string) else {
        return Err(UploadError::NotFound(document_id.to_string()));
    };

    let deletion = gateway
        .delete_file(document_id)
        .await
        .map_err(|source| UploadError::Gateway {
            target: display_name.clone(),
            source,
        })?;
    if !deletion.deleted {
        logging::warn(format!(
            "Gateway kept '{display_name}' ({document_id}) after delete request"
        ));
        return Err(UploadError::NotConfirmed {
            document_id: document_id.to_string(),
        });
    }

    logging::info(format!("Deleted '{display_name}' ({document_id})"));
    session
        .remove_document(document_id)
        .ok_or_else(|| UploadError::NotFound(document_id.to_string()))
}

/// Find an active document by exact id, then by display name.
#[must_use]
pub fn resolve<'a>(documents: &'a [DocumentReference], needle: &str) -> Option<&'a DocumentReference> {
    let needle = needle.trim();
    documents
        .iter()
        .find(|doc| doc.document_id == needle)
        .or_else(|| documents.iter().find(|doc| doc.display_name == needle))
}

fn stage(bytes: &[u8], display_name: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = Path::new(display_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let mut staged = tempfile::Builder::new()
        .prefix("lexcite-upload-")
        .suffix(&suffix)
        .tempfile()?;
    staged.write_all(bytes)?;
    staged.flush()?;
    Ok(staged)
}
