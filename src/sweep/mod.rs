//! Parameter Sweeps
//!
//! A sweep runs the trainer once for every combination of environment
//! count, modality, and seed, timing each run.
//!
//! ## Data Model
//!
//! ```text
//! SweepPlan (1) ──< SweepPoint (N) ──> SweepResult (0..1 per sweep)
//!     │
//!     └── sub-sweeps: consecutive points differing only in the innermost parameter
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use orbit_sweep::invoker::{ExitState, Invocation, InvocationOutcome, TrainerInvoker};
//! use orbit_sweep::sink::MemorySink;
//! use orbit_sweep::sweep::{Modality, SweepDriver, SweepOrdering, SweepPlan, SweepPoint};
//!
//! struct AlwaysOk;
//!
//! impl TrainerInvoker for AlwaysOk {
//!     fn invoke(&mut self, _: &Invocation) -> orbit_sweep::Result<InvocationOutcome> {
//!         Ok(InvocationOutcome::from_exit(ExitState::Success))
//!     }
//! }
//!
//! let plan = SweepPlan::new(&[1, 2], &Modality::ALL, &[0, 1], SweepOrdering::ModalityMajor)?;
//! let template = |p: &SweepPoint| Invocation::new("./trainer", [p.seed().to_string()]);
//!
//! let mut driver = SweepDriver::new(AlwaysOk, MemorySink::new());
//! let report = driver.run(&plan, &template)?;
//! assert_eq!(report.succeeded(), 8);
//! # Ok::<(), orbit_sweep::Error>(())
//! ```

mod driver;
mod plan;
mod point;
mod result;

pub use driver::{FailurePolicy, SweepDriver, SweepReport};
pub use plan::{SweepOrdering, SweepPlan};
pub use point::{Modality, SweepPoint};
pub use result::{SweepResult, SweepStatus};
