//! User-facing text for replies, footnotes and turn outcomes.

use crate::models::{RunError, RunStatus};

/// Language used for rendered replies and outcome notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyLocale {
    #[default]
    Es,
    En,
}

impl ReplyLocale {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "es" | "es-co" | "spanish" | "español" => Some(Self::Es),
            "en" | "en-us" | "english" => Some(Self::En),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    #[must_use]
    pub fn assistant_label(self) -> &'static str {
        match self {
            Self::Es => "Asistente:",
            Self::En => "Assistant:",
        }
    }

    // === Citations ===

    #[must_use]
    pub fn references_header(self) -> &'static str {
        match self {
            Self::Es => "**Referencias:**",
            Self::En => "**References:**",
        }
    }

    /// Preposition between a quote and its source document.
    #[must_use]
    pub fn cited_from(self) -> &'static str {
        match self {
            Self::Es => "de",
            Self::En => "from",
        }
    }

    #[must_use]
    pub fn generated_file(self) -> &'static str {
        match self {
            Self::Es => "Referencia a archivo generado:",
            Self::En => "Reference to generated file:",
        }
    }

    /// Label for a document whose name could not be resolved.
    #[must_use]
    pub fn unresolved_document(self, document_id: &str) -> String {
        match self {
            Self::Es => format!("Archivo ID: {document_id}"),
            Self::En => format!("Document ID: {document_id}"),
        }
    }

    #[must_use]
    pub fn empty_message(self) -> &'static str {
        match self {
            Self::Es => "(Mensaje vacío o con formato no soportado)",
            Self::En => "(empty or unsupported message format)",
        }
    }

    // === History Entries ===

    #[must_use]
    pub fn run_failed_entry(self, status: RunStatus) -> String {
        match self {
            Self::Es => format!("Error: No se pudo completar la solicitud ({status})."),
            Self::En => format!("Error: the request could not be completed ({status})."),
        }
    }

    #[must_use]
    pub fn api_error_entry(self) -> &'static str {
        match self {
            Self::Es => "Error de API al procesar la solicitud.",
            Self::En => "API error while processing the request.",
        }
    }

    #[must_use]
    pub fn unexpected_error_entry(self) -> &'static str {
        match self {
            Self::Es => "Error inesperado al procesar la solicitud.",
            Self::En => "Unexpected error while processing the request.",
        }
    }

    // === Notices ===

    #[must_use]
    pub fn run_failed_notice(self, status: RunStatus, last_error: Option<&RunError>) -> String {
        let mut notice = match self {
            Self::Es => format!("La consulta falló (Estado: {status})."),
            Self::En => format!("The request failed (status: {status})."),
        };
        if let Some(error) = last_error {
            let details = match self {
                Self::Es => format!(" Detalles: {} (Código: {})", error.message, error.code),
                Self::En => format!(" Details: {} (code: {})", error.message, error.code),
            };
            notice.push_str(&details);
        }
        notice
    }

    #[must_use]
    pub fn timeout_notice(self) -> &'static str {
        match self {
            Self::Es => "La solicitud tardó demasiado en completarse.",
            Self::En => "The request took too long to complete.",
        }
    }

    #[must_use]
    pub fn action_required_notice(self) -> &'static str {
        match self {
            Self::Es => "El asistente requiere una acción adicional que no está implementada.",
            Self::En => "The assistant requires an additional action that is not supported.",
        }
    }

    #[must_use]
    pub fn no_visible_response_notice(self) -> &'static str {
        match self {
            Self::Es => "El asistente no produjo una respuesta visible para esta consulta.",
            Self::En => "The assistant produced no visible response for this request.",
        }
    }

    #[must_use]
    pub fn busy_notice(self) -> &'static str {
        match self {
            Self::Es => "Ya hay una consulta en curso; espera a que termine.",
            Self::En => "A request is already in progress; wait for it to finish.",
        }
    }

    #[must_use]
    pub fn thinking(self) -> &'static str {
        match self {
            Self::Es => "Pensando...",
            Self::En => "Thinking...",
        }
    }

    // === Documents ===

    #[must_use]
    pub fn duplicate_upload_notice(self, display_name: &str) -> String {
        match self {
            Self::Es => format!("El archivo '{display_name}' ya parece estar en la lista."),
            Self::En => format!("The file '{display_name}' already seems to be in the list."),
        }
    }

    #[must_use]
    pub fn uploaded_notice(self, display_name: &str, document_id: &str) -> String {
        match self {
            Self::Es => format!("Archivo '{display_name}' subido con ID: {document_id}."),
            Self::En => format!("File '{display_name}' uploaded with ID: {document_id}."),
        }
    }

    #[must_use]
    pub fn upload_failed_notice(self, display_name: &str) -> String {
        match self {
            Self::Es => format!("No se pudo subir el archivo '{display_name}'."),
            Self::En => format!("Could not upload the file '{display_name}'."),
        }
    }

    #[must_use]
    pub fn deleted_notice(self, display_name: &str) -> String {
        match self {
            Self::Es => format!("Archivo '{display_name}' eliminado."),
            Self::En => format!("File '{display_name}' deleted."),
        }
    }

    #[must_use]
    pub fn delete_failed_notice(self, display_name: &str) -> String {
        match self {
            Self::Es => format!("No se pudo completar la eliminación de '{display_name}'."),
            Self::En => format!("Could not delete '{display_name}'."),
        }
    }

    #[must_use]
    pub fn no_documents_notice(self) -> &'static str {
        match self {
            Self::Es => "Sube archivos con /upload para que el asistente los analice.",
            Self::En => "Upload files with /upload so the assistant can analyse them.",
        }
    }
}
