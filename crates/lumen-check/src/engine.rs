//! Reference checking engine.
//!
//! The scanning here is deliberately shallow. What matters for the rest of
//! the system is the shape of the results: ordered diagnostics with
//! 1-based spans, computed from buffer-first content, with unresolved
//! references surfacing as semantic errors instead of failures.

use std::sync::Arc;

use lumen_core::{line_col_at, CompilerOptions, Diagnostic};

use crate::{CheckEngine, ContentProvider};

const SOURCE_EXTENSION: &str = ".lum";
const REFERENCE_PREFIX: &str = "<reference path=\"";

pub struct SimpleCheckEngine {
    provider: Arc<dyn ContentProvider>,
    options: CompilerOptions,
    analysis_version: u64,
}

impl SimpleCheckEngine {
    pub fn new(provider: Arc<dyn ContentProvider>, options: CompilerOptions) -> Self {
        Self {
            provider,
            options,
            analysis_version: 0,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn specifier_exists(&self, resolved: &str) -> bool {
        if self.provider.file_exists(resolved) {
            return true;
        }
        let with_extension = format!("{resolved}{SOURCE_EXTENSION}");
        self.provider.file_exists(&with_extension)
    }
}

impl CheckEngine for SimpleCheckEngine {
    fn syntax_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        let Some(content) = self.provider.file_content(file) else {
            return Vec::new();
        };
        check_delimiters(&content)
    }

    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        let Some(content) = self.provider.file_content(file) else {
            return Vec::new();
        };
        let mut diagnostics = Vec::new();

        for (range, target) in reference_pragmas(&content) {
            let resolved = resolve_specifier(file, &target);
            if !self.specifier_exists(&resolved) {
                diagnostics.push(
                    Diagnostic::file_not_found(&resolved).with_span(
                        line_col_at(&content, range.0),
                        line_col_at(&content, range.1),
                    ),
                );
            }
        }

        for (range, specifier) in import_specifiers(&content) {
            if !is_path_specifier(&specifier) {
                // Bare module names resolve outside this engine's scope.
                continue;
            }
            let resolved = resolve_specifier(file, &specifier);
            if !self.specifier_exists(&resolved) {
                diagnostics.push(
                    Diagnostic::error(format!("Cannot find module '{specifier}'.")).with_span(
                        line_col_at(&content, range.0),
                        line_col_at(&content, range.1),
                    ),
                );
            }
        }

        diagnostics
    }

    fn suggestion_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        let Some(content) = self.provider.file_content(file) else {
            return Vec::new();
        };
        let mut diagnostics = Vec::new();
        let mut line_start = 0usize;
        for line in content.split_inclusive('\n') {
            if let Some(comment_at) = line.find("//") {
                if let Some(todo_at) = line[comment_at..].find("TODO") {
                    let start = line_start + comment_at + todo_at;
                    diagnostics.push(Diagnostic::suggestion("TODO comment.").with_span(
                        line_col_at(&content, start),
                        line_col_at(&content, start + "TODO".len()),
                    ));
                }
            }
            line_start += line.len();
        }
        diagnostics
    }

    fn compiler_options_diagnostics(&self) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn reconfigure(&mut self, options: &CompilerOptions) {
        self.options = options.clone();
        self.analysis_version += 1;
    }

    fn invalidate(&mut self) {
        self.analysis_version += 1;
        tracing::debug!(
            target = "lumen.check",
            version = self.analysis_version,
            "engine invalidated"
        );
    }
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// Resolve a reference/import target relative to the referencing file.
///
/// `..` and `.` segments are folded textually; the result is a display
/// path in the same spelling style as the inputs.
fn resolve_specifier(from_file: &str, specifier: &str) -> String {
    if specifier.starts_with('/') {
        return specifier.to_string();
    }
    let dir = match from_file.rfind('/') {
        Some(0) => "/",
        Some(idx) => &from_file[..idx],
        None => "",
    };
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if dir.starts_with('/') || dir.is_empty() {
        format!("/{joined}")
    } else {
        joined
    }
}

/// All `/// <reference path="...">` targets with the byte range of the
/// quoted path.
fn reference_pragmas(content: &str) -> Vec<((usize, usize), String)> {
    let mut out = Vec::new();
    for (idx, _) in content.match_indices(REFERENCE_PREFIX) {
        let start = idx + REFERENCE_PREFIX.len();
        if let Some(len) = content[start..].find('"') {
            out.push(((start, start + len), content[start..start + len].to_string()));
        }
    }
    out
}

/// Quoted specifiers of `import` statements with their byte ranges.
fn import_specifiers(content: &str) -> Vec<((usize, usize), String)> {
    let mut out = Vec::new();
    let mut line_start = 0usize;
    for line in content.split_inclusive('\n') {
        if line.trim_start().starts_with("import ") || line.trim_start().starts_with("import\"") {
            if let Some((start, end)) = first_quoted_range(line) {
                out.push((
                    (line_start + start, line_start + end),
                    line[start..end].to_string(),
                ));
            }
        }
        line_start += line.len();
    }
    out
}

fn first_quoted_range(line: &str) -> Option<(usize, usize)> {
    let open = line.find(['"', '\''])?;
    let quote = line.as_bytes()[open] as char;
    let close = line[open + 1..].find(quote)?;
    Some((open + 1, open + 1 + close))
}

/// Report the first delimiter-balance problem, skipping string literals
/// and line comments.
fn check_delimiters(content: &str) -> Vec<Diagnostic> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = content.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' | '\'' => {
                // Skip to the end of the literal (or the end of input for
                // an unterminated one; delimiter checks stop there).
                for (_, inner) in chars.by_ref() {
                    if inner == ch {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                for (_, inner) in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '(' | '{' | '[' => stack.push((ch, idx)),
            ')' | '}' | ']' => {
                let expected_opener = matching_opener(ch);
                match stack.pop() {
                    Some((opener, _)) if opener == expected_opener => {}
                    _ => {
                        let pos = line_col_at(content, idx);
                        return vec![Diagnostic::error(format!("Unexpected token '{ch}'."))
                            .with_span(pos, line_col_at(content, idx + 1))];
                    }
                }
            }
            _ => {}
        }
    }
    if let Some((opener, idx)) = stack.pop() {
        let closer = matching_closer(opener);
        let pos = line_col_at(content, content.len());
        return vec![Diagnostic::error(format!("'{closer}' expected."))
            .with_span(line_col_at(content, idx), pos)];
    }
    Vec::new()
}

fn matching_opener(closer: char) -> char {
    match closer {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

fn matching_closer(opener: char) -> char {
    match opener {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
