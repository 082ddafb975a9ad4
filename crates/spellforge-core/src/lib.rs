//! Spellforge core (spellforge-core)
//!
//! The orchestration layer of the pipeline:
//! - [`ModificationOrchestrator`] - turns a free-text request into
//!   validated, backed-up modifications of existing scripts and hot-reloads
//!   them into the running host
//! - [`ScriptGenerationOrchestrator`] - turns a free-text request into a
//!   brand-new compiled, attached script
//! - [`SessionBudget`] - per-session cap on applied modifications
//! - [`TextGenerator`] - the external text-generation collaborator
//! - [`CommandDispatcher`] - the `/generate`-style command surface
//!
//! Every orchestrator entry point returns a human-readable summary string;
//! failures never propagate as process-terminating faults.

pub mod backup;
pub mod budget;
pub mod command;
pub mod compile_task;
pub mod config;
pub mod error;
pub mod generate;
pub mod modify;
pub mod textgen;

pub use backup::BackupStore;
pub use budget::SessionBudget;
pub use command::{Command, CommandDispatcher, CommandError};
pub use config::ForgeConfig;
pub use error::ForgeError;
pub use generate::ScriptGenerationOrchestrator;
pub use modify::{Modification, ModificationOrchestrator, ModificationOutcome, ModificationPlan};
pub use textgen::{GeneratorError, StaticResponder, TextGenerator};
