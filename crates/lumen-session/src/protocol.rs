//! Wire protocol types.
//!
//! Requests arrive as `{seq, command, arguments}`; the command string is
//! dispatched by the session, so an unrecognized command is a failure
//! response rather than a deserialization error. All wire field names are
//! camelCase. Diagnostics take two shapes on the wire: event payloads
//! carry `{start, end, text, category}`, while project-error lists and
//! options-level diagnostics carry the message with an optional file and
//! span.

use serde::{Deserialize, Serialize};

use lumen_core::{CompilerOptions, Diagnostic, DiagnosticCategory, LineCol};
use lumen_project::{ExternalFile, KnownProject};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub seq: u64,
    pub command: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl Request {
    pub fn new(seq: u64, command: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            seq,
            command: command.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub request_seq: u64,
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Response {
    pub fn success(request_seq: u64, command: &str) -> Self {
        Self {
            request_seq,
            command: command.to_string(),
            success: true,
            message: None,
            body: None,
        }
    }

    pub fn with_body(request_seq: u64, command: &str, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            ..Self::success(request_seq, command)
        }
    }

    pub fn failure(request_seq: u64, command: &str, message: impl Into<String>) -> Self {
        Self {
            request_seq,
            command: command.to_string(),
            success: false,
            message: Some(message.into()),
            body: None,
        }
    }
}

// ---- command arguments -----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenArgs {
    pub file: String,
    #[serde(default)]
    pub file_content: Option<String>,
    #[serde(default)]
    pub script_kind_name: Option<String>,
    #[serde(default)]
    pub project_root_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseArgs {
    pub file: String,
}

/// Full-content replacement of an open buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeArgs {
    pub file: String,
    pub file_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenExternalProjectArgs {
    pub project_file_name: String,
    #[serde(default)]
    pub root_files: Vec<ExternalFile>,
    #[serde(default)]
    pub options: CompilerOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseExternalProjectArgs {
    pub project_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredProjectOptionsArgs {
    pub options: CompilerOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectArgs {
    pub project_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizeProjectListArgs {
    #[serde(default)]
    pub known_projects: Vec<KnownProject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeterrArgs {
    /// Debounce in milliseconds before the first category runs.
    pub delay: u64,
    pub files: Vec<String>,
}

// ---- events ----------------------------------------------------------------

/// A diagnostic as it appears in event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDiagnostic {
    pub start: LineCol,
    pub end: LineCol,
    pub text: String,
    pub category: DiagnosticCategory,
}

impl From<Diagnostic> for EventDiagnostic {
    fn from(diagnostic: Diagnostic) -> Self {
        let fallback = LineCol::new(1, 1);
        Self {
            start: diagnostic.start.unwrap_or(fallback),
            end: diagnostic.end.unwrap_or(fallback),
            text: diagnostic.message,
            category: diagnostic.category,
        }
    }
}

/// A diagnostic as it appears in the `compilerOptionsDiagnosticsFull`
/// response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsDiagnostic {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<LineCol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<LineCol>,
    pub category: DiagnosticCategory,
}

impl From<Diagnostic> for OptionsDiagnostic {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            message: diagnostic.message,
            file: diagnostic.file,
            start: diagnostic.start,
            end: diagnostic.end,
            category: diagnostic.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEventBody {
    pub file: String,
    pub diagnostics: Vec<EventDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCompletedBody {
    pub request_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "body", rename_all = "camelCase")]
pub enum Event {
    SyntaxDiag(DiagnosticEventBody),
    SemanticDiag(DiagnosticEventBody),
    SuggestionDiag(DiagnosticEventBody),
    RequestCompleted(RequestCompletedBody),
}

impl Event {
    pub fn diagnostics(
        category: lumen_check::CheckCategory,
        file: String,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let body = DiagnosticEventBody {
            file,
            diagnostics: diagnostics.into_iter().map(EventDiagnostic::from).collect(),
        };
        match category {
            lumen_check::CheckCategory::Syntax => Event::SyntaxDiag(body),
            lumen_check::CheckCategory::Semantic => Event::SemanticDiag(body),
            lumen_check::CheckCategory::Suggestion => Event::SuggestionDiag(body),
        }
    }

    pub fn request_completed(request_seq: u64) -> Self {
        Event::RequestCompleted(RequestCompletedBody { request_seq })
    }
}
