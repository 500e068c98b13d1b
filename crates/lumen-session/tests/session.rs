//! Session behavior over a deterministically stepped host.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use lumen_host::{Host, MemoryHost};
use lumen_project::ServiceOptions;
use lumen_session::{Event, Request, Session};

struct Harness {
    host: Arc<MemoryHost>,
    session: Session,
    events: Arc<Mutex<Vec<Event>>>,
}

fn harness() -> Harness {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
    let host = Arc::new(MemoryHost::new());
    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let session = Session::new(
        Arc::clone(&host) as Arc<dyn Host>,
        ServiceOptions::default(),
        Arc::new(move |event| sink_events.lock().push(event)),
    );
    Harness {
        host,
        session,
        events,
    }
}

impl Harness {
    fn open(&self, seq: u64, file: &str, content: &str) {
        let response = self
            .session
            .execute(Request::new(
                seq,
                "open",
                json!({ "file": file, "fileContent": content }),
            ))
            .expect("open responds");
        assert!(response.success);
    }

    fn geterr(&self, seq: u64, files: &[&str]) {
        let response = self.session.execute(Request::new(
            seq,
            "geterr",
            json!({ "delay": 10, "files": files }),
        ));
        assert!(response.is_none());
    }

    /// Collected events as compact labels, e.g. `syntax /a.lum`.
    fn event_labels(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| match event {
                Event::SyntaxDiag(body) => format!("syntax {}", body.file),
                Event::SemanticDiag(body) => format!("semantic {}", body.file),
                Event::SuggestionDiag(body) => format!("suggestion {}", body.file),
                Event::RequestCompleted(body) => format!("completed {}", body.request_seq),
            })
            .collect()
    }
}

#[test]
fn geterr_emits_categories_in_file_then_category_order() {
    let h = harness();
    h.open(1, "/a.lum", "let a = 1\n");
    h.open(2, "/b.lum", "let b = 2\n");

    h.geterr(3, &["/a.lum", "/b.lum"]);
    assert!(h.events.lock().is_empty());

    h.host.run_to_quiescence();
    assert_eq!(
        h.event_labels(),
        vec![
            "syntax /a.lum",
            "semantic /a.lum",
            "suggestion /a.lum",
            "syntax /b.lum",
            "semantic /b.lum",
            "suggestion /b.lum",
            "completed 3",
        ]
    );
}

#[test]
fn each_category_carries_its_own_diagnostics() {
    let h = harness();
    h.open(
        1,
        "/a.lum",
        "import { f } from \"./missing\"\nlet a = (1\n// TODO finish\n",
    );
    h.geterr(2, &["/a.lum"]);
    h.host.run_to_quiescence();

    let events = h.events.lock().clone();
    let Event::SyntaxDiag(syntax) = &events[0] else {
        panic!("expected syntaxDiag first, got {events:?}");
    };
    assert_eq!(syntax.diagnostics.len(), 1);
    assert_eq!(syntax.diagnostics[0].text, "')' expected.");

    let Event::SemanticDiag(semantic) = &events[1] else {
        panic!("expected semanticDiag second");
    };
    assert_eq!(semantic.diagnostics[0].text, "Cannot find module './missing'.");

    let Event::SuggestionDiag(suggestion) = &events[2] else {
        panic!("expected suggestionDiag third");
    };
    assert_eq!(suggestion.diagnostics[0].text, "TODO comment.");

    assert_eq!(events[3], Event::request_completed(2));
}

#[test]
fn a_newer_geterr_supersedes_a_scheduled_one_entirely() {
    let h = harness();
    h.open(1, "/a.lum", "");
    h.open(2, "/b.lum", "");

    h.geterr(3, &["/a.lum"]);
    // Superseded while still debouncing: no events for seq 3 at all.
    h.geterr(4, &["/b.lum"]);
    h.host.run_to_quiescence();

    assert_eq!(
        h.event_labels(),
        vec![
            "syntax /b.lum",
            "semantic /b.lum",
            "suggestion /b.lum",
            "completed 4",
        ]
    );
}

#[test]
fn a_running_geterr_stops_at_the_next_step_when_superseded() {
    let h = harness();
    h.open(1, "/a.lum", "");
    h.open(2, "/b.lum", "");

    h.geterr(3, &["/a.lum", "/b.lum"]);
    // Fire the debounce timer only: seq 3 emits syntax for the first file
    // and queues its next step.
    h.host.run_pending_timers();
    assert_eq!(h.event_labels(), vec!["syntax /a.lum"]);

    h.geterr(4, &["/b.lum"]);
    h.host.run_to_quiescence();

    // The queued step of seq 3 was discarded: no more of its category
    // events and no completion for it.
    assert_eq!(
        h.event_labels(),
        vec![
            "syntax /a.lum",
            "syntax /b.lum",
            "semantic /b.lum",
            "suggestion /b.lum",
            "completed 4",
        ]
    );
}

#[test]
fn empty_file_list_completes_immediately() {
    let h = harness();
    h.geterr(5, &[]);
    assert_eq!(h.event_labels(), vec!["completed 5"]);
    h.host.run_to_quiescence();
    assert_eq!(h.event_labels(), vec!["completed 5"]);
}

#[test]
fn unsaved_content_referencing_a_nonexistent_file_still_runs_all_categories() {
    let h = harness();
    h.open(
        1,
        "/scratch/untitled.lum",
        "/// <reference path=\"/scratch/nowhere.lum\"/>\n",
    );
    h.geterr(2, &["/scratch/untitled.lum"]);
    h.host.run_to_quiescence();

    assert_eq!(
        h.event_labels(),
        vec![
            "syntax /scratch/untitled.lum",
            "semantic /scratch/untitled.lum",
            "suggestion /scratch/untitled.lum",
            "completed 2",
        ]
    );
    let events = h.events.lock().clone();
    let Event::SemanticDiag(semantic) = &events[1] else {
        panic!("expected semanticDiag");
    };
    assert_eq!(
        semantic.diagnostics[0].text,
        "File '/scratch/nowhere.lum' not found."
    );
}

#[test]
fn unknown_commands_fail_without_panicking() {
    let h = harness();
    let response = h
        .session
        .execute(Request::new(9, "definitelyNotACommand", json!({})))
        .expect("failure response");
    assert!(!response.success);
    assert!(response
        .message
        .as_deref()
        .unwrap()
        .contains("definitelyNotACommand"));
}

#[test]
fn malformed_arguments_fail_the_request() {
    let h = harness();
    let response = h
        .session
        .execute(Request::new(10, "open", json!({ "nope": true })))
        .expect("failure response");
    assert!(!response.success);
}

#[test]
fn compiler_options_diagnostics_full_reports_project_errors() {
    let h = harness();
    let response = h
        .session
        .execute(Request::new(
            1,
            "openExternalProject",
            json!({
                "projectFileName": "/proj/app.lmproj",
                "rootFiles": [{ "fileName": "/proj/missing.lum" }],
                "options": {}
            }),
        ))
        .unwrap();
    assert!(response.success);

    let response = h
        .session
        .execute(Request::new(
            2,
            "compilerOptionsDiagnosticsFull",
            json!({ "projectFileName": "/proj/app.lmproj" }),
        ))
        .unwrap();
    assert!(response.success);
    let body = response.body.unwrap();
    assert_eq!(body[0]["message"], "File '/proj/missing.lum' not found.");

    // Unknown project: a failure response, not a panic.
    let response = h
        .session
        .execute(Request::new(
            3,
            "compilerOptionsDiagnosticsFull",
            json!({ "projectFileName": "/proj/other.lmproj" }),
        ))
        .unwrap();
    assert!(!response.success);
}

#[test]
fn synchronize_project_list_round_trips_versions() {
    let h = harness();
    h.open(1, "/a.lum", "let a = 1");
    let response = h
        .session
        .execute(Request::new(2, "synchronizeProjectList", json!({})))
        .unwrap();
    let body = response.body.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["changed"], true);

    let known = json!({ "knownProjects": [{
        "projectName": body[0]["projectName"],
        "version": body[0]["version"],
    }] });
    let response = h
        .session
        .execute(Request::new(3, "synchronizeProjectList", known))
        .unwrap();
    let body = response.body.unwrap();
    assert_eq!(body[0]["changed"], false);
}

#[test]
fn change_updates_diagnostics_on_the_next_geterr() {
    let h = harness();
    h.open(1, "/a.lum", "let a = (1\n");
    let response = h
        .session
        .execute(Request::new(
            2,
            "change",
            json!({ "file": "/a.lum", "fileContent": "let a = (1)\n" }),
        ))
        .unwrap();
    assert!(response.success);

    h.geterr(3, &["/a.lum"]);
    h.host.run_to_quiescence();
    let events = h.events.lock().clone();
    let Event::SyntaxDiag(syntax) = &events[0] else {
        panic!("expected syntaxDiag");
    };
    assert!(syntax.diagnostics.is_empty());
}

#[test]
fn changing_a_file_that_is_not_open_is_a_failure_response() {
    let h = harness();
    let response = h
        .session
        .execute(Request::new(
            1,
            "change",
            json!({ "file": "/nope.lum", "fileContent": "" }),
        ))
        .unwrap();
    assert!(!response.success);
}
