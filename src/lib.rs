//! # Orbit-Sweep: Simulation Throughput Benchmarking
//!
//! **Version**: 0.1.0
//!
//! Orbit-Sweep measures how long a reinforcement-learning trainer takes to
//! run as the number of parallel simulated environments grows, comparing
//! state observations against camera (visual) observations. It runs the
//! trainer once per point of a parameter grid and appends one timing line
//! per successful run to a results file.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A failed run stops the rest of its sub-sweep instead of
//!   burning GPU hours on larger environment counts that will fail too
//! - **Poka-Yoke**: Commands are argument lists, never shell strings
//! - **Genchi Genbutsu**: Optional utilization sampling records what the
//!   accelerator actually did during each run
//! - **Kaizen**: Results are append-only; re-running a sweep never loses data
//!
//! ## Example Usage
//!
//! ```rust
//! use orbit_sweep::invoker::{ExitState, Invocation, InvocationOutcome, TrainerInvoker};
//! use orbit_sweep::sink::MemorySink;
//! use orbit_sweep::sweep::{Modality, SweepDriver, SweepOrdering, SweepPlan, SweepPoint};
//!
//! struct Instant;
//! impl TrainerInvoker for Instant {
//!     fn invoke(&mut self, _: &Invocation) -> orbit_sweep::Result<InvocationOutcome> {
//!         Ok(InvocationOutcome::from_exit(ExitState::Success))
//!     }
//! }
//!
//! let plan = SweepPlan::new(&[1, 2], &Modality::ALL, &[0], SweepOrdering::ModalityMajor)?;
//! let template = |p: &SweepPoint| Invocation::new("train", [p.run_id()]);
//!
//! let mut driver = SweepDriver::new(Instant, MemorySink::new());
//! let report = driver.run(&plan, &template)?;
//! assert_eq!(report.succeeded(), 4);
//! # Ok::<(), orbit_sweep::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cli;
pub mod config;
pub mod error;
pub mod invoker;
pub mod monitor;
pub mod sink;
pub mod summary;
pub mod sweep;
pub mod tracking;

pub use error::{Error, Result};
