pub mod batch_runner;
pub mod convergence_driver;
pub mod parameter_scheduler;

pub use batch_runner::{BatchReport, BatchRunner, InstanceReport, InstanceStatus};
pub use convergence_driver::{ConvergenceDriver, ResolvedInstance};
pub use parameter_scheduler::{ramp_schedule, validate_ramp_fractions, WalkSchedule, WalkStep};
