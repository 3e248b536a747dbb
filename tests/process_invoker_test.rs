//! Subprocess invoker tests against standard Unix tools

#![cfg(unix)]

use std::time::{Duration, Instant};

use chrono::Utc;
use orbit_sweep::invoker::{ExitState, Invocation, ProcessInvoker, TrainerInvoker};
use orbit_sweep::monitor::{GpuSample, UtilizationProbe};
use orbit_sweep::sink::MemorySink;
use orbit_sweep::sweep::{Modality, SweepDriver, SweepOrdering, SweepPlan, SweepPoint};
use orbit_sweep::Error;

fn sh(script: &str) -> Invocation {
    Invocation::new("sh", ["-c", script])
}

#[test]
fn test_zero_exit_is_success() {
    let outcome = ProcessInvoker::new()
        .invoke(&Invocation::new("true", Vec::<String>::new()))
        .unwrap();
    assert_eq!(outcome.exit, ExitState::Success);
}

#[test]
fn test_nonzero_exit_is_failure_not_error() {
    let outcome = ProcessInvoker::new().invoke(&sh("exit 3")).unwrap();
    assert_eq!(outcome.exit, ExitState::Failed(Some(3)));
    assert!(!outcome.exit.is_success());
}

#[test]
fn test_missing_program_is_unavailable() {
    let err = ProcessInvoker::new()
        .invoke(&Invocation::new("./definitely-not-a-trainer", ["--seed", "0"]))
        .unwrap_err();
    match err {
        Error::TrainerUnavailable { program, .. } => {
            assert_eq!(program, "./definitely-not-a-trainer");
        }
        other => panic!("expected TrainerUnavailable, got {other:?}"),
    }
}

#[test]
fn test_stderr_is_captured() {
    let outcome = ProcessInvoker::new()
        .invoke(&sh("echo 'CUDA out of memory' >&2; exit 1"))
        .unwrap();
    assert_eq!(outcome.exit, ExitState::Failed(Some(1)));
    assert_eq!(outcome.stderr_tail(1), "CUDA out of memory");
}

#[test]
fn test_large_stderr_does_not_stall() {
    // Well past a pipe buffer
    let outcome = ProcessInvoker::new()
        .invoke(&sh("i=0; while [ $i -lt 4000 ]; do echo line-$i >&2; i=$((i+1)); done"))
        .unwrap();
    assert!(outcome.exit.is_success());
    assert_eq!(outcome.stderr.lines().count(), 4000);
}

#[test]
fn test_timeout_kills_trainer() {
    let started = Instant::now();
    let outcome = ProcessInvoker::new()
        .with_timeout(Duration::from_millis(200))
        .invoke(&Invocation::new("sleep", ["5"]))
        .unwrap();
    assert_eq!(outcome.exit, ExitState::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_fast_trainer_finishes_before_timeout() {
    let outcome = ProcessInvoker::new()
        .with_timeout(Duration::from_secs(5))
        .invoke(&Invocation::new("true", Vec::<String>::new()))
        .unwrap();
    assert_eq!(outcome.exit, ExitState::Success);
}

#[derive(Clone)]
struct FixedProbe;

impl UtilizationProbe for FixedProbe {
    fn sample(&mut self) -> orbit_sweep::Result<Vec<GpuSample>> {
        Ok(vec![GpuSample {
            gpu_index: 0,
            utilization: 0.75,
            memory_used_mb: 2048.0,
            memory_total_mb: 8192.0,
            timestamp: Utc::now(),
        }])
    }
}

#[test]
fn test_monitor_samples_attached_to_outcome() {
    let outcome = ProcessInvoker::new()
        .with_monitor(FixedProbe, Duration::from_millis(20))
        .invoke(&Invocation::new("sleep", ["0.2"]))
        .unwrap();
    assert!(outcome.exit.is_success());
    assert!(!outcome.system_samples.is_empty());
    assert!(outcome
        .system_samples
        .iter()
        .all(|s| (s.utilization - 0.75).abs() < f64::EPSILON));
}

#[test]
fn test_sweep_over_real_processes() {
    let plan = SweepPlan::new(&[1, 2], &Modality::ALL, &[0], SweepOrdering::ModalityMajor)
        .unwrap();
    // Visual runs fail; each visual sub-sweep holds one seed so nothing else is lost
    let template = |p: &SweepPoint| {
        let code = u8::from(p.modality() == Modality::Visual);
        sh(&format!("exit {code}"))
    };
    let mut sink = MemorySink::new();

    let report = SweepDriver::new(ProcessInvoker::new(), &mut sink)
        .run(&plan, &template)
        .unwrap();

    assert_eq!(sink.len(), 2);
    assert_eq!(report.failures().len(), 2);
    assert!(sink
        .records()
        .iter()
        .all(|r| r.point().modality() == Modality::State));
    assert_eq!(sink.records()[0].command(), "sh -c 'exit 0'");
}

#[test]
fn test_unbounded_timeout_waits_normally() {
    let outcome = ProcessInvoker::new()
        .with_timeout(Duration::MAX)
        .invoke(&Invocation::new("true", Vec::<String>::new()))
        .unwrap();
    assert_eq!(outcome.exit, ExitState::Success);
}
