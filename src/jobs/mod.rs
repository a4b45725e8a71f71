//! # Sistema de Jobs
//! src/jobs/mod.rs
//!
//! Ciclo de vida de un job de generación de cuentos:
//!
//! ```text
//! queued -> running -> completed
//!                   \-> failed
//! ```
//!
//! `canceled` es terminal y solo lo escribe una acción administrativa
//! externa.

pub mod runner;
pub mod store;
pub mod types;

pub use runner::JobRunner;
pub use store::JobStore;
pub use types::{Job, JobError, JobResult, JobStatus, RawServiceResults, GENERATION_FAILED};
