//! Checking-engine boundary.
//!
//! The project layer treats type checking as an opaque collaborator behind
//! [`CheckEngine`]: one engine instance per project, configured with that
//! project's compiler options, invalidated when the root set changes. The
//! engine reads file content through [`ContentProvider`] so open-buffer
//! text (including unsaved buffers with no disk backing) wins over the
//! filesystem.
//!
//! [`SimpleCheckEngine`] is the reference implementation: enough real
//! behavior to exercise every diagnostics path — delimiter-balance syntax
//! errors, unresolved reference/import semantic errors, TODO-comment
//! suggestions — without pretending to be a type checker.

mod engine;

pub use engine::SimpleCheckEngine;

use lumen_core::{CompilerOptions, Diagnostic};

/// The three per-file diagnostic categories, in the order the scheduler
/// computes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckCategory {
    Syntax,
    Semantic,
    Suggestion,
}

/// Read access to file content, buffer-first.
pub trait ContentProvider: Send + Sync {
    /// The current content of `path`: the open-buffer text when the file
    /// is open, the on-disk text otherwise, `None` when neither exists.
    fn file_content(&self, path: &str) -> Option<String>;

    /// Whether `path` resolves to either an open buffer or a disk file.
    fn file_exists(&self, path: &str) -> bool;
}

/// The opaque per-project checking engine.
///
/// Diagnostic lists are ordered; an engine must return an empty list
/// rather than failing when it has nothing to report for a file.
pub trait CheckEngine: Send {
    fn syntax_diagnostics(&self, file: &str) -> Vec<Diagnostic>;
    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic>;
    fn suggestion_diagnostics(&self, file: &str) -> Vec<Diagnostic>;

    /// Options-level diagnostics not attached to any one source file.
    fn compiler_options_diagnostics(&self) -> Vec<Diagnostic>;

    /// Replace the engine's compiler options.
    fn reconfigure(&mut self, options: &CompilerOptions);

    /// Drop cached analysis state; called when the owning project's root
    /// set changes.
    fn invalidate(&mut self);
}
