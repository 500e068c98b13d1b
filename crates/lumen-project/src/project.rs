//! The project model.
//!
//! One `Project` type covers all three variants behind a [`ProjectKind`]
//! tag; they share the capability set (root files, options, errors,
//! synchronize, dispose) and differ only in how the service creates and
//! tears them down. A project owns its checking-engine handle and an
//! ordered root-file list; error state is cached and recomputed from
//! scratch on every synchronization, never accumulated.

use serde::Serialize;

use lumen_check::CheckEngine;
use lumen_core::{CompilerOptions, Diagnostic, NormalizedPath};

/// Stable identity of a live project within the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(u32);

impl ProjectId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    External,
    Configured,
    Inferred,
}

pub struct Project {
    id: ProjectId,
    kind: ProjectKind,
    name: String,
    root_files: Vec<NormalizedPath>,
    options: CompilerOptions,
    /// Parse/validation errors from the last configuration load.
    config_errors: Vec<Diagnostic>,
    /// One error per declared root currently absent, in declaration order.
    missing_file_errors: Vec<Diagnostic>,
    version: u64,
    dirty: bool,
    engine: Box<dyn CheckEngine>,
    /// Declared project root, for inferred-project grouping.
    project_root: Option<NormalizedPath>,
}

impl Project {
    pub(crate) fn new(
        id: ProjectId,
        kind: ProjectKind,
        name: String,
        options: CompilerOptions,
        engine: Box<dyn CheckEngine>,
        project_root: Option<NormalizedPath>,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            root_files: Vec::new(),
            options,
            config_errors: Vec::new(),
            missing_file_errors: Vec::new(),
            version: 1,
            dirty: false,
            engine,
            project_root,
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_files(&self) -> &[NormalizedPath] {
        &self.root_files
    }

    pub fn contains_root(&self, path: &NormalizedPath) -> bool {
        self.root_files.iter().any(|root| root == path)
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn project_root(&self) -> Option<&NormalizedPath> {
        self.project_root.as_ref()
    }

    /// The full cached error list: configuration errors first, then
    /// missing-root-file errors in declaration order.
    pub fn errors(&self) -> Vec<Diagnostic> {
        let mut out = self.config_errors.clone();
        out.extend(self.missing_file_errors.iter().cloned());
        out
    }

    pub fn engine(&self) -> &dyn CheckEngine {
        self.engine.as_ref()
    }

    pub(crate) fn set_root_files(&mut self, roots: Vec<NormalizedPath>) {
        if self.root_files == roots {
            return;
        }
        self.root_files = roots;
        self.note_roots_changed();
    }

    pub(crate) fn add_root(&mut self, path: NormalizedPath) {
        if !self.contains_root(&path) {
            self.root_files.push(path);
            self.note_roots_changed();
        }
    }

    pub(crate) fn remove_root(&mut self, path: &NormalizedPath) {
        let before = self.root_files.len();
        self.root_files.retain(|root| root != path);
        if self.root_files.len() != before {
            self.note_roots_changed();
        }
    }

    /// Root set (or root content) changed: bump the version, mark dirty,
    /// and drop the engine's cached analysis.
    pub(crate) fn note_roots_changed(&mut self) {
        self.version += 1;
        self.dirty = true;
        self.engine.invalidate();
    }

    pub(crate) fn mark_content_dirty(&mut self) {
        self.version += 1;
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn set_options(&mut self, options: CompilerOptions) {
        if self.options == options {
            return;
        }
        self.options = options;
        self.engine.reconfigure(&self.options);
        self.version += 1;
        self.dirty = true;
    }

    pub(crate) fn set_config_errors(&mut self, errors: Vec<Diagnostic>) {
        self.config_errors = errors;
    }

    pub(crate) fn clear_missing_file_errors(&mut self) {
        self.missing_file_errors.clear();
    }

    pub(crate) fn set_missing_file_errors(&mut self, errors: Vec<Diagnostic>) {
        self.missing_file_errors = errors;
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("roots", &self.root_files.len())
            .field("version", &self.version)
            .field("dirty", &self.dirty)
            .finish()
    }
}
