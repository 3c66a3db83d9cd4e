//! Gacha draw orchestration.
//!
//! [`DrawOrchestrator`] runs one draw end to end: pick an item with the
//! weighted engine, then persist the draw and obtain a signed URL for its
//! asset concurrently, folding both effects into a single [`DrawOutcome`].

pub mod config;
pub mod orchestrator;
pub mod outcome;
pub mod persistence;

pub use config::GachaConfig;
pub use orchestrator::{DrawOrchestrator, DrawRequest};
pub use outcome::{DrawOutcome, FailureKind};
pub use persistence::{DrawRecord, DrawRecorder, PersistError, PgDrawRecorder};
