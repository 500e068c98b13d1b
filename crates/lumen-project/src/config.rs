//! Configuration file parsing.
//!
//! A configuration file (`lumen.json`) is a JSON object with
//! `compilerOptions` and a `files` root list. Parsing never throws past
//! this boundary: failures come back as positioned diagnostics tagged with
//! the config path, so a corrupted file degrades the owning project
//! instead of destroying it.

use serde::Deserialize;

use lumen_core::{line_col_at, CompilerOptions, Diagnostic, LineCol};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigFile {
    compiler_options: CompilerOptions,
    files: Vec<String>,
}

/// A successfully parsed and validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig {
    /// Root files in declaration order, as spelled in the config file
    /// (resolution against the config directory happens in the service).
    pub root_files: Vec<String>,
    pub options: CompilerOptions,
}

/// Parse the text of the configuration file at `config_path`.
///
/// On failure, returns the parse/validation diagnostics; each carries the
/// config path and, where available, a position.
pub fn parse_config(config_path: &str, text: &str) -> Result<ParsedConfig, Vec<Diagnostic>> {
    // The file must be a JSON object. Checking the first significant
    // character up front gives the canonical `'{' expected.` diagnostic
    // for truncated or otherwise decapitated files.
    match text.char_indices().find(|(_, ch)| !ch.is_whitespace()) {
        Some((idx, ch)) if ch != '{' => {
            let start = line_col_at(text, idx);
            let end = line_col_at(text, idx + ch.len_utf8());
            return Err(vec![Diagnostic::error("'{' expected.")
                .with_file(config_path)
                .with_span(start, end)]);
        }
        None => {
            let pos = LineCol::new(1, 1);
            return Err(vec![Diagnostic::error("'{' expected.")
                .with_file(config_path)
                .with_span(pos, pos)]);
        }
        Some(_) => {}
    }

    match serde_json::from_str::<ConfigFile>(text) {
        Ok(config) => Ok(ParsedConfig {
            root_files: config.files,
            options: config.compiler_options,
        }),
        Err(err) => {
            let pos = LineCol::new(err.line().max(1) as u32, err.column().max(1) as u32);
            Err(vec![Diagnostic::error(strip_location(&err.to_string()))
                .with_file(config_path)
                .with_span(pos, pos)])
        }
    }
}

// serde_json appends " at line L column C" to its messages; the position
// already travels in the span.
fn strip_location(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
