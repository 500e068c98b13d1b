//! End-to-end project graph behavior over an in-memory host.

use std::sync::Arc;

use lumen_core::CompilerOptions;
use lumen_host::{Host, MemoryHost};
use lumen_project::{
    ExternalFile, KnownProject, ProjectKind, ProjectService, ProjectServiceError, ServiceOptions,
};

fn service(host: &Arc<MemoryHost>) -> Arc<ProjectService> {
    ProjectService::new(
        Arc::clone(host) as Arc<dyn Host>,
        ServiceOptions::default(),
    )
}

#[test]
fn reloading_an_unchanged_config_is_idempotent() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    host.write_file(
        "/proj/lumen.json",
        r#"{ "compilerOptions": { "strict": true }, "files": ["a.lum", "b.lum"] }"#,
    );
    host.write_file("/proj/a.lum", "");
    host.write_file("/proj/b.lum", "");

    service.reload_configured_project("/proj/lumen.json");
    let first = service.synchronize_project_list(&[]);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, ProjectKind::Configured);
    assert!(first[0].errors.is_empty());

    service.reload_configured_project("/proj/lumen.json");
    let second = service.synchronize_project_list(&[KnownProject {
        project_name: first[0].project_name.clone(),
        version: first[0].version,
    }]);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].version, first[0].version);
    assert!(!second[0].changed);
    assert!(second[0].errors.is_empty());
}

#[test]
fn corrupted_config_degrades_and_recovers_with_identity_preserved() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    let valid = r#"{ "compilerOptions": { "strict": true }, "files": ["app.lum"] }"#;
    host.write_file("/proj/app.lum", "let x = 1");
    host.write_file("/proj/lumen.json", valid);
    service.open_client_file("/proj/app.lum", None, None, None);

    let id = service
        .configured_project_id("/proj/lumen.json")
        .expect("configured project");
    assert!(service.project_errors("/proj/lumen.json").unwrap().is_empty());

    // Corrupt: strip the opening brace. Writing fires the config watch.
    host.write_file("/proj/lumen.json", &valid[1..]);
    assert_eq!(service.configured_project_id("/proj/lumen.json"), Some(id));
    let errors = service.project_errors("/proj/lumen.json").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "'{' expected.");
    assert_eq!(errors[0].file.as_deref(), Some("/proj/lumen.json"));
    // Last-known-good root set keeps serving the open file.
    assert_eq!(
        service.default_project_for_file("/proj/app.lum").as_deref(),
        Some("/proj/lumen.json")
    );

    // Restore: identity survives the round trip and errors clear.
    host.write_file("/proj/lumen.json", valid);
    assert_eq!(service.configured_project_id("/proj/lumen.json"), Some(id));
    assert!(service.project_errors("/proj/lumen.json").unwrap().is_empty());
    assert_eq!(
        service.default_project_for_file("/proj/app.lum").as_deref(),
        Some("/proj/lumen.json")
    );
}

#[test]
fn missing_roots_error_in_declaration_order_and_resolve_via_watch() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    host.write_file(
        "/proj/lumen.json",
        r#"{ "files": ["z_missing.lum", "present.lum", "a_missing.lum"] }"#,
    );
    host.write_file("/proj/present.lum", "");
    service.reload_configured_project("/proj/lumen.json");

    let errors = service.project_errors("/proj/lumen.json").unwrap();
    let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "File '/proj/z_missing.lum' not found.",
            "File '/proj/a_missing.lum' not found.",
        ]
    );
    assert_eq!(host.watcher_count("/proj/z_missing.lum"), 1);

    host.write_file("/proj/z_missing.lum", "");
    let errors = service.project_errors("/proj/lumen.json").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "File '/proj/a_missing.lum' not found.");
    assert_eq!(host.watcher_count("/proj/z_missing.lum"), 0);
    assert_eq!(host.watcher_count("/proj/a_missing.lum"), 1);
}

#[test]
fn an_unsaved_buffer_counts_as_present_for_missing_root_checks() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    // The file exists only as an open in-memory buffer.
    service.open_client_file("/proj/app.lum", Some("let x = 1".into()), None, None);
    service.open_external_project(
        "/proj/app.lmproj",
        vec![ExternalFile::new("/proj/app.lum")],
        CompilerOptions::default(),
    );
    assert!(service.project_errors("/proj/app.lmproj").unwrap().is_empty());
}

#[test]
fn every_open_file_has_a_home_project() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    host.write_file("/proj/lumen.json", r#"{ "files": ["app.lum"] }"#);
    host.write_file("/proj/app.lum", "");

    service.open_client_file("/proj/app.lum", None, None, None);
    service.open_client_file("/elsewhere/loose.lum", Some(String::new()), None, None);

    assert!(service.default_project_for_file("/proj/app.lum").is_some());
    assert!(service
        .default_project_for_file("/elsewhere/loose.lum")
        .is_some());

    // Deleting the config orphans its open root; the service re-homes it.
    host.remove_file("/proj/lumen.json");
    assert!(service.default_project_for_file("/proj/app.lum").is_some());
    assert_eq!(service.inferred_project_count(), 1);
}

#[test]
fn reopening_an_external_project_replaces_in_place() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    host.write_file("/proj/a.lum", "");
    host.write_file("/proj/b.lum", "");

    service.open_external_project(
        "/proj/app.lmproj",
        vec![ExternalFile::new("/proj/a.lum")],
        CompilerOptions::default(),
    );
    let first = service.synchronize_project_list(&[]);
    assert_eq!(first.len(), 1);

    service.open_external_project(
        "/proj/app.lmproj",
        vec![ExternalFile::new("/proj/b.lum")],
        CompilerOptions::default(),
    );
    let second = service.synchronize_project_list(&[]);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].project_name, first[0].project_name);
    assert!(second[0].version > first[0].version);
    assert_eq!(service.project_count(), 1);
}

#[test]
fn closing_an_external_project_rehomes_its_open_files() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    host.write_file("/proj/a.lum", "");
    service.open_client_file("/proj/a.lum", None, None, None);
    service.open_external_project(
        "/proj/app.lmproj",
        vec![ExternalFile::new("/proj/a.lum")],
        CompilerOptions::default(),
    );
    assert_eq!(
        service.default_project_for_file("/proj/a.lum").as_deref(),
        Some("/proj/app.lmproj")
    );

    service.close_external_project("/proj/app.lmproj");
    assert_eq!(
        service.default_project_for_file("/proj/a.lum").as_deref(),
        Some("(no root)")
    );
}

#[test]
fn diagnostics_follow_the_open_buffer_not_the_disk() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    host.write_file("/proj/lumen.json", r#"{ "files": ["app.lum"] }"#);
    host.write_file("/proj/app.lum", "let x = 1");

    service.open_client_file("/proj/app.lum", Some("let x = (1".into()), None, None);
    let diags = service
        .compute_diagnostics("/proj/app.lum", lumen_check::CheckCategory::Syntax)
        .expect("file has a project");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message, "')' expected.");

    service
        .change_open_file("/proj/app.lum", "let x = (1)".into())
        .unwrap();
    let diags = service
        .compute_diagnostics("/proj/app.lum", lumen_check::CheckCategory::Syntax)
        .unwrap();
    assert!(diags.is_empty());
}

#[test]
fn changing_an_unopened_file_is_an_error() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    let err = service
        .change_open_file("/proj/app.lum", "x".into())
        .unwrap_err();
    assert!(matches!(err, ProjectServiceError::FileNotOpen(_)));
}

#[test]
fn inferred_options_apply_to_existing_and_future_inferred_projects() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    service.open_client_file("/a.lum", Some(String::new()), None, None);

    let mut options = CompilerOptions::default();
    options.strict = Some(true);
    service.set_inferred_project_compiler_options(options);

    let list = service.synchronize_project_list(&[]);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind, ProjectKind::Inferred);

    let diags = service
        .compiler_options_diagnostics(&list[0].project_name)
        .unwrap();
    assert!(diags.is_empty());
}

#[test]
fn unresolved_imports_surface_as_semantic_diagnostics() {
    let host = Arc::new(MemoryHost::new());
    let service = service(&host);
    service.open_client_file(
        "/proj/app.lum",
        Some("import { f } from \"./util\"\n".into()),
        None,
        None,
    );
    let diags = service
        .compute_diagnostics("/proj/app.lum", lumen_check::CheckCategory::Semantic)
        .unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message, "Cannot find module './util'.");

    host.write_file("/proj/util.lum", "");
    let diags = service
        .compute_diagnostics("/proj/app.lum", lumen_check::CheckCategory::Semantic)
        .unwrap();
    assert!(diags.is_empty());
}
