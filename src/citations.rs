//! Rewrite assistant citation annotations into numbered footnotes.
//!
//! Each annotated span in the reply text becomes a ` [n]` marker and a
//! matching line is appended under a references header. Rendering never
//! fails from the caller's point of view: internal faults fall back to the
//! unmodified reply text.

use thiserror::Error;

use crate::gateway::AssistantGateway;
use crate::logging;
use crate::models::{Annotation, MessageContent, ThreadMessage};
use crate::session::{self, DocumentReference};
use crate::ui_text::ReplyLocale;

/// Internal rendering fault. Logged and recovered, never returned.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("annotation [{index}] references a file without an id")]
    MissingSourceFile { index: usize },
}

/// Render one assistant message for display.
pub async fn render_message(
    message: &ThreadMessage,
    documents: &[DocumentReference],
    gateway: &dyn AssistantGateway,
    locale: ReplyLocale,
) -> String {
    let Some(MessageContent::Text { text }) = message.content.first() else {
        logging::warn(format!(
            "Assistant message {} is empty or has an unsupported format",
            message.id
        ));
        return locale.empty_message().to_string();
    };

    match render_text(&text.value, &text.annotations, documents, gateway, locale).await {
        Ok(rendered) => rendered,
        Err(err) => {
            logging::warn(format!(
                "Failed to render citations for message {}: {err}",
                message.id
            ));
            text.value.clone()
        }
    }
}

async fn render_text(
    value: &str,
    annotations: &[Annotation],
    documents: &[DocumentReference],
    gateway: &dyn AssistantGateway,
    locale: ReplyLocale,
) -> Result<String, RenderError> {
    let mut text = value.to_string();
    let mut footnotes = Vec::with_capacity(annotations.len());

    for (offset, annotation) in annotations.iter().enumerate() {
        let index = offset + 1;
        if !annotation.text.is_empty() {
            text = text.replacen(&annotation.text, &format!(" [{index}]"), 1);
        }
        footnotes.push(footnote(index, annotation, documents, gateway, locale).await?);
    }

    if footnotes.is_empty() {
        return Ok(text);
    }
    Ok(format!(
        "{text}\n\n{}\n{}",
        locale.references_header(),
        footnotes.join("\n")
    ))
}

async fn footnote(
    index: usize,
    annotation: &Annotation,
    documents: &[DocumentReference],
    gateway: &dyn AssistantGateway,
    locale: ReplyLocale,
) -> Result<String, RenderError> {
    if let Some(citation) = &annotation.file_citation {
        if citation.file_id.is_empty() {
            return Err(RenderError::MissingSourceFile { index });
        }
        let name = match session::display_name_of(documents, &citation.file_id) {
            Some(name) => name.to_string(),
            None => remote_name(gateway, &citation.file_id, locale).await,
        };
        let from = locale.cited_from();
        return Ok(match citation.quote.as_deref() {
            Some(quote) if !quote.is_empty() => format!("[{index}] \"{quote}\" ({from} {name})"),
            _ => format!("[{index}] ({from} {name})"),
        });
    }

    if let Some(generated) = &annotation.file_path {
        if generated.file_id.is_empty() {
            return Err(RenderError::MissingSourceFile { index });
        }
        let name = remote_name(gateway, &generated.file_id, locale).await;
        return Ok(format!("[{index}] {} {name}", locale.generated_file()));
    }

    Ok(format!("[{index}] {}", annotation.text))
}

/// Ask the gateway for the file name, falling back to an id label.
async fn remote_name(
    gateway: &dyn AssistantGateway,
    document_id: &str,
    locale: ReplyLocale,
) -> String {
    logging::info(format!("Looking up file name for {document_id}"));
    match gateway.get_file(document_id).await {
        Ok(file) if !file.filename.is_empty() => file.filename,
        Ok(_) => locale.unresolved_document(document_id),
        Err(err) => {
            logging::warn(format!("Could not resolve file name for {document_id}: {err}"));
            locale.unresolved_document(document_id)
        }
    }
}
