//! Core shared types for Lumen.
//!
//! This crate is intentionally small: positions, diagnostics, compiler
//! options, and the canonical path handling that every path-keyed map in
//! the server relies on.

mod diagnostics;
mod options;
mod path;
mod text;

pub use diagnostics::{Diagnostic, DiagnosticCategory, LineCol};
pub use options::CompilerOptions;
pub use path::{canonical_key, normalize_slashes, NormalizedPath};
pub use text::line_col_at;
