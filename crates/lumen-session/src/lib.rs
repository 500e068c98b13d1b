//! Session layer: command dispatch, deferred diagnostics, wire protocol.
//!
//! [`Session`] accepts sequence-tagged commands, executes structural ones
//! synchronously against the [`lumen_project::ProjectService`], and routes
//! `geterr` through the [`GeterrScheduler`], which spreads per-file,
//! per-category checking across the host's cooperative queues and emits
//! `syntaxDiag` / `semanticDiag` / `suggestionDiag` / `requestCompleted`
//! events through the caller's [`EventSink`].

mod geterr;
mod protocol;
mod session;

pub use geterr::{EventSink, GeterrScheduler};
pub use protocol::{
    ChangeArgs, CloseArgs, CloseExternalProjectArgs, DiagnosticEventBody, Event, EventDiagnostic,
    GeterrArgs, InferredProjectOptionsArgs, OpenArgs, OpenExternalProjectArgs, OptionsDiagnostic,
    ProjectArgs, Request, RequestCompletedBody, Response, SynchronizeProjectListArgs,
};
pub use session::Session;
