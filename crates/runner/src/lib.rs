//! The workflow runner: decides which accounts are eligible this cycle,
//! drives one graph traversal per eligible account on a bounded worker
//! pool, keeps the remote profile state honest around every session, and
//! emits the lifecycle event stream.

pub mod eligibility;
pub mod options;
pub mod runner;

pub use eligibility::{Eligibility, EligibilityGate, SkipReason};
pub use options::RunOptions;
pub use runner::{RunExit, WorkflowRunner};
