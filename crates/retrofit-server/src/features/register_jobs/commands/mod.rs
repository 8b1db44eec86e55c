pub mod start;

pub use start::{StartRegisterJobCommand, StartRegisterJobError, StartRegisterJobResponse};
