//! Terminal colors for the REPL and the doctor report.

use colored::{ColoredString, Colorize};

use crate::error_taxonomy::ErrorSeverity;

pub const LEX_INDIGO_RGB: (u8, u8, u8) = (79, 70, 229); // #4F46E5
pub const LEX_TEAL_RGB: (u8, u8, u8) = (20, 184, 166);
pub const LEX_AMBER_RGB: (u8, u8, u8) = (245, 158, 11);
pub const LEX_RED_RGB: (u8, u8, u8) = (220, 38, 38);
pub const LEX_SLATE_RGB: (u8, u8, u8) = (148, 163, 184);

fn paint(text: &str, (r, g, b): (u8, u8, u8)) -> ColoredString {
    text.truecolor(r, g, b)
}

#[must_use]
pub fn title(text: &str) -> ColoredString {
    paint(text, LEX_INDIGO_RGB).bold()
}

#[must_use]
pub fn assistant_label(text: &str) -> ColoredString {
    paint(text, LEX_TEAL_RGB).bold()
}

#[must_use]
pub fn ok_mark() -> ColoredString {
    paint("✓", LEX_TEAL_RGB)
}

#[must_use]
pub fn warn_mark() -> ColoredString {
    paint("!", LEX_AMBER_RGB)
}

#[must_use]
pub fn fail_mark() -> ColoredString {
    paint("✗", LEX_RED_RGB)
}

#[must_use]
pub fn muted(text: &str) -> ColoredString {
    paint(text, LEX_SLATE_RGB)
}

/// Color a notice by how bad the underlying error is.
#[must_use]
pub fn by_severity(text: &str, severity: ErrorSeverity) -> ColoredString {
    match severity {
        ErrorSeverity::Info => muted(text),
        ErrorSeverity::Warning => paint(text, LEX_AMBER_RGB),
        ErrorSeverity::Error | ErrorSeverity::Critical => paint(text, LEX_RED_RGB),
    }
}

#[must_use]
pub fn warning(text: &str) -> ColoredString {
    by_severity(text, ErrorSeverity::Warning)
}
