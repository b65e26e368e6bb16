/// Failure decision and two-pass confirmation
pub mod confirmation;
pub mod decision;

pub use confirmation::{
    CheckReport, HealthCheck, Outcome, PassReport, FAILURE_EXIT_CODE, HEALTHY_EXIT_CODE,
    RESTART_EXIT_CODE,
};
pub use decision::FailureDecision;
