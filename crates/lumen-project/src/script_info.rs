//! Per-file registry, independent of any project.
//!
//! A `ScriptInfo` exists for every file the server currently knows about:
//! open buffers and files pulled in as project roots. The registry keys by
//! canonical path and keeps a *non-owning* back-reference from each file
//! to the projects containing it; ownership runs the other way (projects
//! own root-file references). The registry sits behind its own lock,
//! separate from the project graph, so the checking engine can read buffer
//! content without re-entering the service.

use std::collections::HashMap;

use parking_lot::Mutex;

use lumen_core::NormalizedPath;

use crate::project::ProjectId;

#[derive(Debug)]
struct ScriptInfo {
    path: NormalizedPath,
    content: Option<String>,
    open: bool,
    script_kind: Option<String>,
    project_root: Option<NormalizedPath>,
    /// Projects containing this file, in attach order. Non-owning.
    containing: Vec<ProjectId>,
}

impl ScriptInfo {
    fn new(path: NormalizedPath) -> Self {
        Self {
            path,
            content: None,
            open: false,
            script_kind: None,
            project_root: None,
            containing: Vec::new(),
        }
    }

    fn is_orphaned(&self) -> bool {
        !self.open && self.containing.is_empty()
    }
}

#[derive(Debug)]
pub struct ScriptRegistry {
    case_sensitive: bool,
    inner: Mutex<HashMap<String, ScriptInfo>>,
}

impl ScriptRegistry {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn normalize(&self, path: &str) -> NormalizedPath {
        NormalizedPath::new(path, self.case_sensitive)
    }

    /// Create an entry for `path` if none exists.
    pub fn ensure(&self, path: &NormalizedPath) {
        self.inner
            .lock()
            .entry(path.key().to_string())
            .or_insert_with(|| ScriptInfo::new(path.clone()));
    }

    pub fn open(
        &self,
        path: &NormalizedPath,
        content: String,
        script_kind: Option<String>,
        project_root: Option<NormalizedPath>,
    ) {
        let mut inner = self.inner.lock();
        let info = inner
            .entry(path.key().to_string())
            .or_insert_with(|| ScriptInfo::new(path.clone()));
        info.open = true;
        info.content = Some(content);
        if script_kind.is_some() {
            info.script_kind = script_kind;
        }
        if project_root.is_some() {
            info.project_root = project_root;
        }
    }

    /// Mark `path` closed and drop its buffer. The entry itself survives
    /// while any project still references it.
    pub fn close(&self, path: &NormalizedPath) {
        let mut inner = self.inner.lock();
        if let Some(info) = inner.get_mut(path.key()) {
            info.open = false;
            info.content = None;
            if info.is_orphaned() {
                inner.remove(path.key());
            }
        }
    }

    /// Replace the buffer content of an open file. Returns `false` when
    /// the file is not open.
    pub fn set_open_content(&self, path: &NormalizedPath, content: String) -> bool {
        let mut inner = self.inner.lock();
        match inner.get_mut(path.key()) {
            Some(info) if info.open => {
                info.content = Some(content);
                true
            }
            _ => false,
        }
    }

    pub fn set_script_kind(&self, path: &NormalizedPath, script_kind: Option<String>) {
        if script_kind.is_none() {
            return;
        }
        let mut inner = self.inner.lock();
        if let Some(info) = inner.get_mut(path.key()) {
            info.script_kind = script_kind;
        }
    }

    pub fn script_kind(&self, path: &NormalizedPath) -> Option<String> {
        self.inner.lock().get(path.key())?.script_kind.clone()
    }

    pub fn buffer_content(&self, path: &NormalizedPath) -> Option<String> {
        self.inner.lock().get(path.key())?.content.clone()
    }

    pub fn has_buffer(&self, path: &NormalizedPath) -> bool {
        self.inner
            .lock()
            .get(path.key())
            .is_some_and(|info| info.content.is_some())
    }

    pub fn is_open(&self, path: &NormalizedPath) -> bool {
        self.inner
            .lock()
            .get(path.key())
            .is_some_and(|info| info.open)
    }

    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.inner.lock().contains_key(path.key())
    }

    pub fn project_root(&self, path: &NormalizedPath) -> Option<NormalizedPath> {
        self.inner.lock().get(path.key())?.project_root.clone()
    }

    /// Record that `project` contains `path`. Idempotent.
    pub fn attach(&self, path: &NormalizedPath, project: ProjectId) {
        let mut inner = self.inner.lock();
        let info = inner
            .entry(path.key().to_string())
            .or_insert_with(|| ScriptInfo::new(path.clone()));
        if !info.containing.contains(&project) {
            info.containing.push(project);
        }
    }

    /// Remove the back-reference from `path` to `project`, dropping the
    /// entry once nothing references it and it is not open.
    pub fn detach(&self, path: &NormalizedPath, project: ProjectId) {
        let mut inner = self.inner.lock();
        if let Some(info) = inner.get_mut(path.key()) {
            info.containing.retain(|id| *id != project);
            if info.is_orphaned() {
                inner.remove(path.key());
            }
        }
    }

    pub fn containing(&self, path: &NormalizedPath) -> Vec<ProjectId> {
        self.inner
            .lock()
            .get(path.key())
            .map(|info| info.containing.clone())
            .unwrap_or_default()
    }

    pub fn open_files(&self) -> Vec<NormalizedPath> {
        let mut files: Vec<NormalizedPath> = self
            .inner
            .lock()
            .values()
            .filter(|info| info.open)
            .map(|info| info.path.clone())
            .collect();
        files.sort_by(|a, b| a.key().cmp(b.key()));
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_an_unreferenced_file_drops_the_entry() {
        let registry = ScriptRegistry::new(false);
        let path = registry.normalize("/a/app.lum");
        registry.open(&path, "x".into(), None, None);
        assert!(registry.contains(&path));
        registry.close(&path);
        assert!(!registry.contains(&path));
    }

    #[test]
    fn referenced_files_survive_close_until_detached() {
        let registry = ScriptRegistry::new(false);
        let path = registry.normalize("/a/app.lum");
        let project = ProjectId::from_raw(1);
        registry.open(&path, "x".into(), None, None);
        registry.attach(&path, project);

        registry.close(&path);
        assert!(registry.contains(&path));
        assert!(!registry.is_open(&path));
        assert!(registry.buffer_content(&path).is_none());

        registry.detach(&path, project);
        assert!(!registry.contains(&path));
    }

    #[test]
    fn attach_is_idempotent_and_ordered() {
        let registry = ScriptRegistry::new(false);
        let path = registry.normalize("/a/app.lum");
        let first = ProjectId::from_raw(1);
        let second = ProjectId::from_raw(2);
        registry.open(&path, String::new(), None, None);
        registry.attach(&path, first);
        registry.attach(&path, second);
        registry.attach(&path, first);
        assert_eq!(registry.containing(&path), vec![first, second]);
    }

    #[test]
    fn paths_differing_only_by_case_share_an_entry() {
        let registry = ScriptRegistry::new(false);
        let upper = registry.normalize("/A/App.lum");
        let lower = registry.normalize("/a/app.lum");
        registry.open(&upper, "content".into(), None, None);
        assert!(registry.is_open(&lower));
        assert_eq!(registry.buffer_content(&lower).as_deref(), Some("content"));
    }
}
