//! Project model and orchestration.
//!
//! This crate owns the stateful heart of the server: the per-file
//! [`ScriptRegistry`], the three project variants behind one [`Project`]
//! type, configuration parsing with failure recovery, and the
//! [`ProjectService`] that keeps the project graph synchronized with
//! client commands and watched-file events.

mod config;
mod project;
mod script_info;
mod service;

pub use config::{parse_config, ParsedConfig};
pub use project::{Project, ProjectId, ProjectKind};
pub use script_info::ScriptRegistry;
pub use service::{
    EngineFactory, ExternalFile, KnownProject, ProjectInfo, ProjectService, ProjectServiceError,
    ServiceOptions, CONFIG_FILE_NAME,
};
