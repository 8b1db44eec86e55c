//! Register jobs
//!
//! A job tracks one uploaded file from `STARTING` to a terminal status. The
//! [`RegisterJobSupervisor`] persists jobs, the [`TokioJobDispatcher`] runs them in the background
//! and the [`RegisterJobRunner`] does the work for each one.

pub mod dispatcher;
pub mod models;
pub mod name;
pub mod repository;
pub mod runner;
pub mod supervisor;

pub use dispatcher::{DispatchRequest, JobDispatcher, JobHandler, TokioJobDispatcher};
pub use models::{RegisterJob, RegisterJobError, StartParams};
pub use runner::RegisterJobRunner;
pub use supervisor::{RegisterJobSupervisor, SupervisorError, SupervisorResult};
