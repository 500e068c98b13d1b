//! Project orchestration.
//!
//! `ProjectService` owns the project graph: file-to-project membership,
//! project creation/replacement/teardown, configuration loading with
//! failure recovery, inferred-project grouping, and the watch
//! subscriptions that re-synchronize projects when configuration files or
//! missing-but-referenced files change on disk.
//!
//! Locking: the graph lock covers project structure; buffer content lives
//! in the [`ScriptRegistry`] behind its own lock so the checking engine
//! can read file content (through [`ContentProvider`]) while a graph
//! operation is in flight. The graph lock may be taken first and the
//! registry second, never the reverse.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lumen_check::{CheckCategory, CheckEngine, ContentProvider, SimpleCheckEngine};
use lumen_core::{canonical_key, normalize_slashes, CompilerOptions, Diagnostic, NormalizedPath};
use lumen_host::{FileWatchKind, Host, WatcherHandle};

use crate::config::parse_config;
use crate::project::{Project, ProjectId, ProjectKind};
use crate::script_info::ScriptRegistry;

/// The configuration file name discovered by walking ancestor directories
/// of an opened file.
pub const CONFIG_FILE_NAME: &str = "lumen.json";

/// Caller-supplied service modes.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    /// When set, open files carrying a declared project root get one
    /// inferred project per distinct root; otherwise all root-less open
    /// files share a single inferred project.
    pub use_inferred_project_per_project_root: bool,
}

#[derive(Debug, Error)]
pub enum ProjectServiceError {
    #[error("project '{0}' not found")]
    ProjectNotFound(String),
    #[error("file '{0}' is not open")]
    FileNotOpen(String),
}

/// Builds the checking engine for a new project.
pub type EngineFactory = Arc<dyn Fn(&CompilerOptions) -> Box<dyn CheckEngine> + Send + Sync>;

/// A root file declared by an external project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalFile {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_kind_name: Option<String>,
}

impl ExternalFile {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            script_kind_name: None,
        }
    }
}

/// A caller-held project snapshot, reconciled by
/// [`ProjectService::synchronize_project_list`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownProject {
    pub project_name: String,
    pub version: u64,
}

/// Current state of one live project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub project_name: String,
    pub kind: ProjectKind,
    pub version: u64,
    /// Whether the project differs from the caller's snapshot.
    pub changed: bool,
    pub errors: Vec<Diagnostic>,
}

struct MissingWatch {
    handle: WatcherHandle,
    /// Projects that must re-synchronize when the path appears.
    projects: Vec<ProjectId>,
}

#[derive(Default)]
struct ProjectGraph {
    projects: HashMap<ProjectId, Project>,
    /// Creation order, for stable listings and default-project choice.
    order: Vec<ProjectId>,
    configured: HashMap<String, ProjectId>,
    external: HashMap<String, ProjectId>,
    inferred_by_root: HashMap<String, ProjectId>,
    inferred_global: Option<ProjectId>,
    inferred_options: CompilerOptions,
    next_project: u32,
    config_watches: HashMap<String, WatcherHandle>,
    missing_watches: HashMap<String, MissingWatch>,
}

pub struct ProjectService {
    host: Arc<dyn Host>,
    options: ServiceOptions,
    registry: Arc<ScriptRegistry>,
    engine_factory: EngineFactory,
    graph: Mutex<ProjectGraph>,
    weak: Weak<ProjectService>,
}

/// Buffer-first content access handed to checking engines.
struct RegistryContentProvider {
    registry: Arc<ScriptRegistry>,
    host: Arc<dyn Host>,
}

impl ContentProvider for RegistryContentProvider {
    fn file_content(&self, path: &str) -> Option<String> {
        let norm = self.registry.normalize(path);
        self.registry
            .buffer_content(&norm)
            .or_else(|| self.host.read_file(norm.as_str()).ok())
    }

    fn file_exists(&self, path: &str) -> bool {
        let norm = self.registry.normalize(path);
        self.registry.has_buffer(&norm) || self.host.file_exists(norm.as_str())
    }
}

impl ProjectService {
    /// A service using [`SimpleCheckEngine`] for every project.
    pub fn new(host: Arc<dyn Host>, options: ServiceOptions) -> Arc<Self> {
        let registry = Arc::new(ScriptRegistry::new(host.use_case_sensitive_file_names()));
        let provider: Arc<dyn ContentProvider> = Arc::new(RegistryContentProvider {
            registry: Arc::clone(&registry),
            host: Arc::clone(&host),
        });
        let engine_factory: EngineFactory = Arc::new(move |options: &CompilerOptions| {
            Box::new(SimpleCheckEngine::new(Arc::clone(&provider), options.clone()))
                as Box<dyn CheckEngine>
        });
        Self::build(host, options, registry, engine_factory)
    }

    /// A service with a caller-supplied engine factory.
    pub fn with_engine_factory(
        host: Arc<dyn Host>,
        options: ServiceOptions,
        engine_factory: EngineFactory,
    ) -> Arc<Self> {
        let registry = Arc::new(ScriptRegistry::new(host.use_case_sensitive_file_names()));
        Self::build(host, options, registry, engine_factory)
    }

    fn build(
        host: Arc<dyn Host>,
        options: ServiceOptions,
        registry: Arc<ScriptRegistry>,
        engine_factory: EngineFactory,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            host,
            options,
            registry,
            engine_factory,
            graph: Mutex::new(ProjectGraph::default()),
            weak: weak.clone(),
        })
    }

    pub fn registry(&self) -> &Arc<ScriptRegistry> {
        &self.registry
    }

    pub fn normalize(&self, path: &str) -> NormalizedPath {
        self.registry.normalize(path)
    }

    fn key_of(&self, name: &str) -> String {
        canonical_key(name, self.registry.case_sensitive())
    }

    // ---- client file lifecycle -------------------------------------------

    /// Mark a file open, with optional in-memory content (unsaved buffers
    /// pass content for a path that may not exist on disk).
    pub fn open_client_file(
        &self,
        path: &str,
        content: Option<String>,
        script_kind: Option<String>,
        project_root: Option<String>,
    ) {
        let norm = self.normalize(path);
        let content = match content {
            Some(content) => content,
            None => self.host.read_file(norm.as_str()).unwrap_or_default(),
        };
        let root = project_root.map(|r| self.normalize(&r));
        self.registry.open(&norm, content, script_kind, root);

        let mut graph = self.graph.lock();
        let claimed = self.registry.containing(&norm).iter().any(|id| {
            graph
                .projects
                .get(id)
                .is_some_and(|p| p.kind() != ProjectKind::Inferred)
        });
        if !claimed {
            if let Some(config_path) = self.find_config_for(&norm) {
                if !graph.configured.contains_key(config_path.key()) {
                    self.load_or_reload_configured(&mut graph, &config_path);
                }
            }
        }
        self.ensure_home(&mut graph, &norm);
        for id in self.registry.containing(&norm) {
            if let Some(project) = graph.projects.get_mut(&id) {
                project.mark_content_dirty();
            }
        }
        tracing::debug!(target = "lumen.project", file = %norm, "file opened");
    }

    /// Mark a file closed, tearing down inferred projects it was the last
    /// open file of.
    pub fn close_client_file(&self, path: &str) {
        let norm = self.normalize(path);
        let mut graph = self.graph.lock();
        let containing = self.registry.containing(&norm);
        self.registry.close(&norm);
        for id in containing {
            let kind = match graph.projects.get(&id) {
                Some(project) => project.kind(),
                None => continue,
            };
            if kind == ProjectKind::Inferred {
                if let Some(project) = graph.projects.get_mut(&id) {
                    project.remove_root(&norm);
                }
                self.registry.detach(&norm, id);
                self.remove_inferred_if_empty(&mut graph, id);
            } else if let Some(project) = graph.projects.get_mut(&id) {
                project.mark_content_dirty();
            }
        }
        tracing::debug!(target = "lumen.project", file = %norm, "file closed");
    }

    /// Replace the in-memory content of an open file.
    pub fn change_open_file(&self, path: &str, content: String) -> Result<(), ProjectServiceError> {
        let norm = self.normalize(path);
        if !self.registry.set_open_content(&norm, content) {
            return Err(ProjectServiceError::FileNotOpen(norm.as_str().to_string()));
        }
        let mut graph = self.graph.lock();
        for id in self.registry.containing(&norm) {
            if let Some(project) = graph.projects.get_mut(&id) {
                project.mark_content_dirty();
            }
        }
        Ok(())
    }

    // ---- external projects -----------------------------------------------

    /// Create or replace the external project named `name`. Root files
    /// absent from disk become project errors, not failures.
    pub fn open_external_project(
        &self,
        name: &str,
        root_files: Vec<ExternalFile>,
        options: CompilerOptions,
    ) {
        let mut graph = self.graph.lock();
        let display_name = normalize_slashes(name);
        let key = self.key_of(name);
        let id = match graph.external.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.alloc_project(
                    &mut graph,
                    ProjectKind::External,
                    display_name.clone(),
                    options.clone(),
                    None,
                );
                graph.external.insert(key, id);
                id
            }
        };

        let mut roots = Vec::new();
        for file in &root_files {
            let norm = self.normalize(&file.file_name);
            self.registry.ensure(&norm);
            self.registry
                .set_script_kind(&norm, file.script_kind_name.clone());
            if !roots.contains(&norm) {
                roots.push(norm);
            }
        }
        self.set_project_roots(&mut graph, id, roots);
        if let Some(project) = graph.projects.get_mut(&id) {
            project.set_options(options);
        }
        self.ensure_homes_for_open_files(&mut graph);
        tracing::debug!(target = "lumen.project", project = %display_name, "external project opened");
    }

    /// Drop an external project, re-homing any of its still-open files.
    pub fn close_external_project(&self, name: &str) {
        let mut graph = self.graph.lock();
        let key = self.key_of(name);
        if let Some(id) = graph.external.remove(&key) {
            let open_roots = self.remove_project(&mut graph, id);
            for root in open_roots {
                self.ensure_home(&mut graph, &root);
            }
        }
    }

    // ---- configured projects ---------------------------------------------

    /// Re-read and re-validate the configuration at `path`, creating the
    /// project if needed. A parse failure keeps the previous root set and
    /// options and replaces the error list with the parse diagnostics.
    pub fn reload_configured_project(&self, path: &str) {
        let norm = self.normalize(path);
        let mut graph = self.graph.lock();
        self.load_or_reload_configured(&mut graph, &norm);
        self.ensure_homes_for_open_files(&mut graph);
    }

    // ---- inferred projects -----------------------------------------------

    /// Set the compiler options shared by all inferred projects.
    pub fn set_inferred_project_compiler_options(&self, options: CompilerOptions) {
        let mut graph = self.graph.lock();
        graph.inferred_options = options.clone();
        let ids: Vec<ProjectId> = graph
            .inferred_by_root
            .values()
            .copied()
            .chain(graph.inferred_global)
            .collect();
        for id in ids {
            if let Some(project) = graph.projects.get_mut(&id) {
                project.set_options(options.clone());
            }
        }
    }

    // ---- queries ----------------------------------------------------------

    /// Reconcile the caller's project snapshot against the live set and
    /// return the current list, creation-ordered.
    pub fn synchronize_project_list(&self, known: &[KnownProject]) -> Vec<ProjectInfo> {
        let graph = self.graph.lock();
        let known: HashMap<&str, u64> = known
            .iter()
            .map(|k| (k.project_name.as_str(), k.version))
            .collect();
        graph
            .order
            .iter()
            .filter_map(|id| graph.projects.get(id))
            .map(|project| ProjectInfo {
                project_name: project.name().to_string(),
                kind: project.kind(),
                version: project.version(),
                changed: known
                    .get(project.name())
                    .map_or(true, |version| *version != project.version()),
                errors: project.errors(),
            })
            .collect()
    }

    /// The cached error list (config + missing roots) for a named project.
    pub fn project_errors(&self, project_name: &str) -> Result<Vec<Diagnostic>, ProjectServiceError> {
        let graph = self.graph.lock();
        let id = self
            .find_project_by_name(&graph, project_name)
            .ok_or_else(|| ProjectServiceError::ProjectNotFound(project_name.to_string()))?;
        Ok(graph
            .projects
            .get(&id)
            .map(|project| project.errors())
            .unwrap_or_default())
    }

    /// Options-level diagnostics for a named project: cached project
    /// errors plus whatever the engine reports. Empty when clean.
    pub fn compiler_options_diagnostics(
        &self,
        project_name: &str,
    ) -> Result<Vec<Diagnostic>, ProjectServiceError> {
        let graph = self.graph.lock();
        let id = self
            .find_project_by_name(&graph, project_name)
            .ok_or_else(|| ProjectServiceError::ProjectNotFound(project_name.to_string()))?;
        let Some(project) = graph.projects.get(&id) else {
            return Ok(Vec::new());
        };
        let mut out = project.errors();
        out.extend(project.engine().compiler_options_diagnostics());
        Ok(out)
    }

    /// Compute one diagnostic category for a file through its default
    /// project's engine. `None` when no project contains the file.
    ///
    /// Callers (the diagnostics scheduler) invoke this once per step and
    /// never hold a project reference across a suspension point; the
    /// lookup here re-fetches whatever project currently owns the file.
    pub fn compute_diagnostics(
        &self,
        file: &str,
        category: CheckCategory,
    ) -> Option<Vec<Diagnostic>> {
        let norm = self.normalize(file);
        let graph = self.graph.lock();
        let id = self.default_project_locked(&graph, &norm)?;
        let project = graph.projects.get(&id)?;
        let diagnostics = match category {
            CheckCategory::Syntax => project.engine().syntax_diagnostics(norm.as_str()),
            CheckCategory::Semantic => project.engine().semantic_diagnostics(norm.as_str()),
            CheckCategory::Suggestion => project.engine().suggestion_diagnostics(norm.as_str()),
        };
        Some(diagnostics)
    }

    /// The name of the project diagnostics for `file` are computed in:
    /// Configured/External before Inferred, then attach order.
    pub fn default_project_for_file(&self, file: &str) -> Option<String> {
        let norm = self.normalize(file);
        let graph = self.graph.lock();
        let id = self.default_project_locked(&graph, &norm)?;
        graph.projects.get(&id).map(|p| p.name().to_string())
    }

    pub fn project_count(&self) -> usize {
        self.graph.lock().projects.len()
    }

    pub fn inferred_project_count(&self) -> usize {
        let graph = self.graph.lock();
        graph
            .projects
            .values()
            .filter(|p| p.kind() == ProjectKind::Inferred)
            .count()
    }

    /// Stable identity of the configured project for `config_path`, if
    /// one is live.
    pub fn configured_project_id(&self, config_path: &str) -> Option<ProjectId> {
        let key = self.key_of(config_path);
        self.graph.lock().configured.get(&key).copied()
    }

    /// Tear everything down: all projects, watches, and queued state.
    pub fn shutdown(&self) {
        let mut graph = self.graph.lock();
        let ids: Vec<ProjectId> = graph.order.clone();
        for id in ids {
            self.remove_project(&mut graph, id);
        }
        graph.external.clear();
        graph.inferred_by_root.clear();
        graph.inferred_global = None;
    }

    // ---- watch callbacks ---------------------------------------------------

    fn on_config_file_event(&self, path: &str, kind: FileWatchKind) {
        let norm = self.normalize(path);
        tracing::debug!(target = "lumen.project", config = %norm, kind = ?kind, "config file event");
        let mut graph = self.graph.lock();
        match kind {
            FileWatchKind::Deleted => {
                let key = norm.key().to_string();
                if let Some(id) = graph.configured.get(&key).copied() {
                    let open_roots = self.remove_project(&mut graph, id);
                    for root in open_roots {
                        self.ensure_home(&mut graph, &root);
                    }
                }
            }
            FileWatchKind::Created | FileWatchKind::Changed => {
                self.load_or_reload_configured(&mut graph, &norm);
                self.ensure_homes_for_open_files(&mut graph);
            }
        }
    }

    fn on_missing_file_event(&self, path: &str, kind: FileWatchKind) {
        if kind == FileWatchKind::Deleted {
            return;
        }
        let norm = self.normalize(path);
        let mut graph = self.graph.lock();
        // A second event for the same resolution finds no entry and is a
        // no-op; re-synchronizing is idempotent.
        let Some(watch) = graph.missing_watches.remove(norm.key()) else {
            return;
        };
        self.host.unwatch_file(watch.handle);
        tracing::debug!(target = "lumen.project", file = %norm, "missing file appeared");
        for id in watch.projects {
            if let Some(project) = graph.projects.get_mut(&id) {
                project.note_roots_changed();
            }
            self.refresh_missing_file_errors(&mut graph, id);
        }
    }

    // ---- internals ---------------------------------------------------------

    fn alloc_project(
        &self,
        graph: &mut ProjectGraph,
        kind: ProjectKind,
        name: String,
        options: CompilerOptions,
        project_root: Option<NormalizedPath>,
    ) -> ProjectId {
        graph.next_project += 1;
        let id = ProjectId::from_raw(graph.next_project);
        let engine = (self.engine_factory)(&options);
        graph
            .projects
            .insert(id, Project::new(id, kind, name, options, engine, project_root));
        graph.order.push(id);
        id
    }

    /// Remove a project and everything it owns. Returns its still-open
    /// root files, which the caller must re-home.
    fn remove_project(&self, graph: &mut ProjectGraph, id: ProjectId) -> Vec<NormalizedPath> {
        let Some(project) = graph.projects.remove(&id) else {
            return Vec::new();
        };
        graph.order.retain(|pid| *pid != id);

        let mut removed_config_keys = Vec::new();
        graph.configured.retain(|key, pid| {
            if *pid == id {
                removed_config_keys.push(key.clone());
                false
            } else {
                true
            }
        });
        for key in removed_config_keys {
            if let Some(handle) = graph.config_watches.remove(&key) {
                self.host.unwatch_file(handle);
            }
        }
        graph.external.retain(|_, pid| *pid != id);
        graph.inferred_by_root.retain(|_, pid| *pid != id);
        if graph.inferred_global == Some(id) {
            graph.inferred_global = None;
        }

        let mut resolved_watch_keys = Vec::new();
        for (key, watch) in graph.missing_watches.iter_mut() {
            watch.projects.retain(|pid| *pid != id);
            if watch.projects.is_empty() {
                resolved_watch_keys.push(key.clone());
            }
        }
        for key in resolved_watch_keys {
            if let Some(watch) = graph.missing_watches.remove(&key) {
                self.host.unwatch_file(watch.handle);
            }
        }

        let mut open_roots = Vec::new();
        for root in project.root_files() {
            if self.registry.is_open(root) {
                open_roots.push(root.clone());
            }
            self.registry.detach(root, id);
        }
        tracing::debug!(target = "lumen.project", project = %project.name(), "project removed");
        open_roots
    }

    fn remove_inferred_if_empty(&self, graph: &mut ProjectGraph, id: ProjectId) {
        let empty = graph
            .projects
            .get(&id)
            .is_some_and(|p| p.kind() == ProjectKind::Inferred && p.root_files().is_empty());
        if empty {
            self.remove_project(graph, id);
        }
    }

    /// Attach `path` as belonging to `id`. A Configured/External claim
    /// evicts the file from any inferred project hosting it.
    fn attach_root(&self, graph: &mut ProjectGraph, id: ProjectId, path: &NormalizedPath) {
        self.registry.ensure(path);
        self.registry.attach(path, id);
        let kind = match graph.projects.get(&id) {
            Some(project) => project.kind(),
            None => return,
        };
        if kind == ProjectKind::Inferred {
            return;
        }
        let inferred_ids: Vec<ProjectId> = self
            .registry
            .containing(path)
            .into_iter()
            .filter(|pid| {
                graph
                    .projects
                    .get(pid)
                    .is_some_and(|p| p.kind() == ProjectKind::Inferred)
            })
            .collect();
        for pid in inferred_ids {
            if let Some(project) = graph.projects.get_mut(&pid) {
                project.remove_root(path);
            }
            self.registry.detach(path, pid);
            self.remove_inferred_if_empty(graph, pid);
        }
    }

    /// Replace a project's root set, reconciling registry back-references
    /// and missing-file state.
    fn set_project_roots(
        &self,
        graph: &mut ProjectGraph,
        id: ProjectId,
        roots: Vec<NormalizedPath>,
    ) {
        let old: Vec<NormalizedPath> = graph
            .projects
            .get(&id)
            .map(|p| p.root_files().to_vec())
            .unwrap_or_default();
        for root in &old {
            if !roots.contains(root) {
                self.registry.detach(root, id);
            }
        }
        for root in &roots {
            self.attach_root(graph, id, root);
        }
        if let Some(project) = graph.projects.get_mut(&id) {
            project.set_root_files(roots);
        }
        self.refresh_missing_file_errors(graph, id);
    }

    /// Recompute the missing-root-file error list for one project and
    /// reconcile its missing-file watch subscriptions. Idempotent.
    fn refresh_missing_file_errors(&self, graph: &mut ProjectGraph, id: ProjectId) {
        let roots: Vec<NormalizedPath> = match graph.projects.get(&id) {
            Some(project) => project.root_files().to_vec(),
            None => return,
        };
        let mut errors = Vec::new();
        let mut missing = Vec::new();
        for root in &roots {
            let present = self.registry.has_buffer(root) || self.host.file_exists(root.as_str());
            if !present {
                errors.push(Diagnostic::file_not_found(root.as_str()));
                missing.push(root.clone());
            }
        }

        let missing_keys: HashSet<&str> = missing.iter().map(|p| p.key()).collect();
        let mut stale_keys = Vec::new();
        for (key, watch) in graph.missing_watches.iter_mut() {
            if !missing_keys.contains(key.as_str()) && watch.projects.contains(&id) {
                watch.projects.retain(|pid| *pid != id);
                if watch.projects.is_empty() {
                    stale_keys.push(key.clone());
                }
            }
        }
        for key in stale_keys {
            if let Some(watch) = graph.missing_watches.remove(&key) {
                self.host.unwatch_file(watch.handle);
            }
        }

        for path in &missing {
            if let Some(watch) = graph.missing_watches.get_mut(path.key()) {
                if !watch.projects.contains(&id) {
                    watch.projects.push(id);
                }
            } else {
                let handle = self.watch_path(path, WatchPurpose::MissingFile);
                graph.missing_watches.insert(
                    path.key().to_string(),
                    MissingWatch {
                        handle,
                        projects: vec![id],
                    },
                );
            }
        }

        if let Some(project) = graph.projects.get_mut(&id) {
            project.set_missing_file_errors(errors);
        }
    }

    fn watch_path(&self, path: &NormalizedPath, purpose: WatchPurpose) -> WatcherHandle {
        let weak = self.weak.clone();
        self.host.watch_file(
            path.as_str(),
            Arc::new(move |changed, kind| {
                let Some(service) = weak.upgrade() else {
                    return;
                };
                match purpose {
                    WatchPurpose::ConfigFile => service.on_config_file_event(changed, kind),
                    WatchPurpose::MissingFile => service.on_missing_file_event(changed, kind),
                }
            }),
        )
    }

    /// Walk ancestor directories of `path` for a configuration file.
    fn find_config_for(&self, path: &NormalizedPath) -> Option<NormalizedPath> {
        for dir in path.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if self.host.file_exists(candidate.as_str()) {
                return Some(candidate);
            }
        }
        None
    }

    fn load_or_reload_configured(&self, graph: &mut ProjectGraph, config_path: &NormalizedPath) {
        let key = config_path.key().to_string();
        let existing = graph.configured.get(&key).copied();
        let text = match self.host.read_file(config_path.as_str()) {
            Ok(text) => text,
            Err(_) => {
                // Config gone from disk: the project's reason for existing
                // disappeared.
                if let Some(id) = existing {
                    let open_roots = self.remove_project(graph, id);
                    for root in open_roots {
                        self.ensure_home(graph, &root);
                    }
                }
                return;
            }
        };

        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.alloc_project(
                    graph,
                    ProjectKind::Configured,
                    config_path.as_str().to_string(),
                    CompilerOptions::default(),
                    None,
                );
                graph.configured.insert(key.clone(), id);
                let handle = self.watch_path(config_path, WatchPurpose::ConfigFile);
                graph.config_watches.insert(key, handle);
                id
            }
        };

        match parse_config(config_path.as_str(), &text) {
            Ok(parsed) => {
                let dir = match config_path.parent() {
                    Some(dir) => dir,
                    None => config_path.clone(),
                };
                let case_sensitive = self.registry.case_sensitive();
                let roots: Vec<NormalizedPath> = parsed
                    .root_files
                    .iter()
                    .map(|file| resolve_root(&dir, file, case_sensitive))
                    .collect();
                self.set_project_roots(graph, id, roots);
                if let Some(project) = graph.projects.get_mut(&id) {
                    project.set_options(parsed.options);
                    project.set_config_errors(Vec::new());
                }
                tracing::debug!(target = "lumen.project", config = %config_path, "configured project loaded");
            }
            Err(errors) => {
                // Keep last-known-good roots and options; the error list
                // becomes exactly the parse diagnostics.
                if let Some(project) = graph.projects.get_mut(&id) {
                    project.set_config_errors(errors);
                    project.clear_missing_file_errors();
                    project.mark_content_dirty();
                }
                tracing::warn!(
                    target = "lumen.project",
                    config = %config_path,
                    "configuration parse failed; serving last-known-good state"
                );
            }
        }
    }

    /// Give an open file a home project, falling back to an inferred
    /// project when nothing claims it.
    fn ensure_home(&self, graph: &mut ProjectGraph, path: &NormalizedPath) {
        if !self.registry.is_open(path) {
            return;
        }
        if !self.registry.containing(path).is_empty() {
            return;
        }
        let group_root = if self.options.use_inferred_project_per_project_root {
            self.registry.project_root(path)
        } else {
            None
        };
        let id = match &group_root {
            Some(root) => match graph.inferred_by_root.get(root.key()) {
                Some(id) => *id,
                None => {
                    let options = graph.inferred_options.clone();
                    let id = self.alloc_project(
                        graph,
                        ProjectKind::Inferred,
                        root.as_str().to_string(),
                        options,
                        Some(root.clone()),
                    );
                    graph.inferred_by_root.insert(root.key().to_string(), id);
                    id
                }
            },
            None => match graph.inferred_global {
                Some(id) => id,
                None => {
                    let options = graph.inferred_options.clone();
                    let id = self.alloc_project(
                        graph,
                        ProjectKind::Inferred,
                        "(no root)".to_string(),
                        options,
                        None,
                    );
                    graph.inferred_global = Some(id);
                    id
                }
            },
        };
        if let Some(project) = graph.projects.get_mut(&id) {
            project.add_root(path.clone());
        }
        self.registry.attach(path, id);
    }

    fn ensure_homes_for_open_files(&self, graph: &mut ProjectGraph) {
        for path in self.registry.open_files() {
            self.ensure_home(graph, &path);
        }
    }

    fn default_project_locked(
        &self,
        graph: &ProjectGraph,
        path: &NormalizedPath,
    ) -> Option<ProjectId> {
        let containing = self.registry.containing(path);
        containing
            .iter()
            .find(|id| {
                graph
                    .projects
                    .get(*id)
                    .is_some_and(|p| p.kind() != ProjectKind::Inferred)
            })
            .or_else(|| containing.first())
            .copied()
    }

    fn find_project_by_name(&self, graph: &ProjectGraph, name: &str) -> Option<ProjectId> {
        let key = self.key_of(name);
        if let Some(id) = graph.external.get(&key).or_else(|| graph.configured.get(&key)) {
            return Some(*id);
        }
        graph
            .order
            .iter()
            .find(|id| {
                graph
                    .projects
                    .get(*id)
                    .is_some_and(|p| p.name() == name)
            })
            .copied()
    }
}

#[derive(Clone, Copy)]
enum WatchPurpose {
    ConfigFile,
    MissingFile,
}

/// Resolve a config-declared root against the config file's directory.
fn resolve_root(base_dir: &NormalizedPath, specifier: &str, case_sensitive: bool) -> NormalizedPath {
    let specifier = normalize_slashes(specifier);
    if specifier.starts_with('/') {
        return NormalizedPath::new(&specifier, case_sensitive);
    }
    let base = base_dir.as_str();
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let prefix = if base.starts_with('/') { "/" } else { "" };
    NormalizedPath::new(&format!("{prefix}{}", segments.join("/")), case_sensitive)
}
