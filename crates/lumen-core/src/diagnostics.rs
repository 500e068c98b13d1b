use serde::{Deserialize, Serialize};

/// A position in a text document, 1-based (line, character offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub offset: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, offset: u32) -> Self {
        Self { line, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Suggestion,
    Message,
}

/// A structured error or warning produced by the project layer or the
/// checking engine.
///
/// `file` carries the display path of the file the diagnostic originates
/// from when it differs from (or exists independently of) the file it was
/// requested for — project-level errors set it, per-file diagnostics
/// usually leave it empty. The span is optional: missing-file errors, for
/// example, have no position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub category: DiagnosticCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<LineCol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<LineCol>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: DiagnosticCategory::Error,
            file: None,
            start: None,
            end: None,
        }
    }

    pub fn suggestion(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: DiagnosticCategory::Suggestion,
            file: None,
            start: None,
            end: None,
        }
    }

    /// The canonical missing-file project error.
    pub fn file_not_found(path: &str) -> Self {
        Self::error(format!("File '{path}' not found."))
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_span(mut self, start: LineCol, end: LineCol) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}
