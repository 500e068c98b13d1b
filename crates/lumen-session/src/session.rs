//! Command dispatch.
//!
//! One command at a time, each tagged with the caller's sequence number.
//! Structural commands respond synchronously; `geterr` enqueues scheduler
//! work and produces no response, only events. Degraded-operation
//! conditions (missing file, corrupted config, unknown project) come back
//! as failure responses or diagnostics and are logged below error
//! severity; error-level logging is reserved for invariant violations,
//! of which command handling has none.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use lumen_host::Host;
use lumen_project::{ProjectService, ServiceOptions};

use crate::geterr::{EventSink, GeterrScheduler};
use crate::protocol::{
    ChangeArgs, CloseArgs, CloseExternalProjectArgs, GeterrArgs, InferredProjectOptionsArgs,
    OpenArgs, OpenExternalProjectArgs, OptionsDiagnostic, ProjectArgs, Request, Response,
    SynchronizeProjectListArgs,
};

pub struct Session {
    service: Arc<ProjectService>,
    scheduler: Arc<GeterrScheduler>,
}

impl Session {
    pub fn new(host: Arc<dyn Host>, options: ServiceOptions, sink: EventSink) -> Self {
        let service = ProjectService::new(Arc::clone(&host), options);
        let scheduler = GeterrScheduler::new(host, Arc::clone(&service), sink);
        Self { service, scheduler }
    }

    pub fn service(&self) -> &Arc<ProjectService> {
        &self.service
    }

    /// Execute one command. `geterr` returns `None` (its results arrive as
    /// events); everything else returns a response.
    pub fn execute(&self, request: Request) -> Option<Response> {
        let seq = request.seq;
        let command = request.command.clone();
        tracing::debug!(target = "lumen.session", seq, command = %command, "executing");
        match command.as_str() {
            "open" => Some(self.with_args(seq, &command, request, |args: OpenArgs| {
                self.service.open_client_file(
                    &args.file,
                    args.file_content,
                    args.script_kind_name,
                    args.project_root_path,
                );
                Response::success(seq, &command)
            })),
            "close" => Some(self.with_args(seq, &command, request, |args: CloseArgs| {
                self.service.close_client_file(&args.file);
                Response::success(seq, &command)
            })),
            "change" => Some(self.with_args(seq, &command, request, |args: ChangeArgs| {
                match self.service.change_open_file(&args.file, args.file_content) {
                    Ok(()) => Response::success(seq, &command),
                    Err(err) => {
                        tracing::warn!(target = "lumen.session", seq, %err, "change rejected");
                        Response::failure(seq, &command, err.to_string())
                    }
                }
            })),
            "openExternalProject" => Some(self.with_args(
                seq,
                &command,
                request,
                |args: OpenExternalProjectArgs| {
                    self.service.open_external_project(
                        &args.project_file_name,
                        args.root_files,
                        args.options,
                    );
                    Response::success(seq, &command)
                },
            )),
            "closeExternalProject" => Some(self.with_args(
                seq,
                &command,
                request,
                |args: CloseExternalProjectArgs| {
                    self.service.close_external_project(&args.project_file_name);
                    Response::success(seq, &command)
                },
            )),
            "compilerOptionsForInferredProjects" => Some(self.with_args(
                seq,
                &command,
                request,
                |args: InferredProjectOptionsArgs| {
                    self.service
                        .set_inferred_project_compiler_options(args.options);
                    Response::success(seq, &command)
                },
            )),
            "compilerOptionsDiagnosticsFull" => {
                Some(
                    self.with_args(seq, &command, request, |args: ProjectArgs| {
                        match self
                            .service
                            .compiler_options_diagnostics(&args.project_file_name)
                        {
                            Ok(diagnostics) => {
                                let body: Vec<OptionsDiagnostic> =
                                    diagnostics.into_iter().map(OptionsDiagnostic::from).collect();
                                match serde_json::to_value(body) {
                                    Ok(value) => Response::with_body(seq, &command, value),
                                    Err(err) => Response::failure(seq, &command, err.to_string()),
                                }
                            }
                            Err(err) => {
                                tracing::warn!(target = "lumen.session", seq, %err, "query rejected");
                                Response::failure(seq, &command, err.to_string())
                            }
                        }
                    }),
                )
            }
            "synchronizeProjectList" => Some(self.with_args(
                seq,
                &command,
                request,
                |args: SynchronizeProjectListArgs| {
                    let list = self.service.synchronize_project_list(&args.known_projects);
                    match serde_json::to_value(list) {
                        Ok(value) => Response::with_body(seq, &command, value),
                        Err(err) => Response::failure(seq, &command, err.to_string()),
                    }
                },
            )),
            "geterr" => {
                match serde_json::from_value::<GeterrArgs>(request.arguments) {
                    Ok(args) => {
                        self.scheduler
                            .request(seq, args.files, Duration::from_millis(args.delay));
                        None
                    }
                    // Even geterr answers malformed arguments synchronously.
                    Err(err) => Some(self.bad_arguments(seq, &command, &err)),
                }
            }
            _ => {
                tracing::warn!(target = "lumen.session", seq, command = %command, "unrecognized command");
                Some(Response::failure(
                    seq,
                    &command,
                    format!("Unrecognized command: '{command}'."),
                ))
            }
        }
    }

    fn with_args<A, F>(&self, seq: u64, command: &str, request: Request, handle: F) -> Response
    where
        A: DeserializeOwned,
        F: FnOnce(A) -> Response,
    {
        match serde_json::from_value::<A>(request.arguments) {
            Ok(args) => handle(args),
            Err(err) => self.bad_arguments(seq, command, &err),
        }
    }

    fn bad_arguments(&self, seq: u64, command: &str, err: &serde_json::Error) -> Response {
        tracing::warn!(target = "lumen.session", seq, command, %err, "malformed arguments");
        Response::failure(seq, command, format!("Malformed arguments: {err}."))
    }
}
