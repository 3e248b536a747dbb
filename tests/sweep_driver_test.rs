//! End-to-end sweep scenarios with stub trainers
//!
//! Trainers here are in-memory stand-ins; `process_invoker_test.rs` covers
//! real subprocesses.

use std::collections::HashSet;
use std::io;
use std::thread;
use std::time::Duration;

use orbit_sweep::invoker::{ExitState, Invocation, InvocationOutcome, TrainerInvoker};
use orbit_sweep::sink::{dedup, KeepPolicy, MemorySink, ResultsSink};
use orbit_sweep::sweep::{
    FailurePolicy, Modality, SweepDriver, SweepOrdering, SweepPlan, SweepPoint, SweepResult,
};
use orbit_sweep::{Error, Result};

/// Template that encodes the point in the arguments so stubs can decode it.
fn template(point: &SweepPoint) -> Invocation {
    Invocation::new(
        "./trainer",
        [
            point.environment_count().to_string(),
            point.modality().to_string(),
            point.seed().to_string(),
        ],
    )
}

fn decode(invocation: &Invocation) -> (u32, Modality, u64) {
    let args = invocation.args();
    (
        args[0].parse().unwrap(),
        args[1].parse().unwrap(),
        args[2].parse().unwrap(),
    )
}

/// Records every invocation and fails the listed points.
#[derive(Default)]
struct ScriptedTrainer {
    calls: Vec<(u32, Modality, u64)>,
    failing: HashSet<(u32, Modality, u64)>,
    sleep: Option<Duration>,
}

impl ScriptedTrainer {
    fn failing(points: &[(u32, Modality, u64)]) -> Self {
        Self {
            failing: points.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl TrainerInvoker for ScriptedTrainer {
    fn invoke(&mut self, invocation: &Invocation) -> Result<InvocationOutcome> {
        let key = decode(invocation);
        self.calls.push(key);
        if let Some(sleep) = self.sleep {
            thread::sleep(sleep);
        }
        if self.failing.contains(&key) {
            let mut outcome = InvocationOutcome::from_exit(ExitState::Failed(Some(1)));
            outcome.stderr = "CUDA out of memory\n".to_string();
            Ok(outcome)
        } else {
            Ok(InvocationOutcome::from_exit(ExitState::Success))
        }
    }
}

fn plan(envs: &[u32], seeds: &[u64], ordering: SweepOrdering) -> SweepPlan {
    SweepPlan::new(envs, &Modality::ALL, seeds, ordering).unwrap()
}

fn keys(records: &[SweepResult]) -> Vec<(u32, Modality, u64)> {
    records.iter().map(|r| r.point().key()).collect()
}

#[test]
fn test_invocation_count_is_product_of_lists() {
    let plan = plan(&[1, 2, 4], &[0, 1, 2, 3], SweepOrdering::ModalityMajor);
    let mut trainer = ScriptedTrainer::default();
    let mut sink = MemorySink::new();

    let report = SweepDriver::new(&mut trainer, &mut sink)
        .run(&plan, &template)
        .unwrap();

    assert_eq!(trainer.calls.len(), 3 * 2 * 4);
    assert_eq!(report.succeeded(), 24);
    assert_eq!(sink.len(), 24);
    assert!(report.failures().is_empty());
}

#[test]
fn test_orderings_cover_same_points() {
    let mut by_ordering = Vec::new();
    for ordering in [SweepOrdering::ModalityMajor, SweepOrdering::SeedMajor] {
        let plan = plan(&[1, 2, 4], &[0, 1], ordering);
        let mut trainer = ScriptedTrainer::default();
        SweepDriver::new(&mut trainer, MemorySink::new())
            .run(&plan, &template)
            .unwrap();
        by_ordering.push(trainer.calls.into_iter().collect::<HashSet<_>>());
    }
    assert_eq!(by_ordering[0], by_ordering[1]);
    assert_eq!(by_ordering[0].len(), 12);
}

#[test]
fn test_two_by_two_by_two_records_every_point_once() {
    let plan = plan(&[1, 2], &[0, 1], SweepOrdering::ModalityMajor);
    let mut sink = MemorySink::new();
    SweepDriver::new(ScriptedTrainer::default(), &mut sink)
        .run(&plan, &template)
        .unwrap();

    let recorded: HashSet<_> = keys(sink.records()).into_iter().collect();
    assert_eq!(sink.len(), 8);
    assert_eq!(recorded.len(), 8);
    for record in sink.records() {
        assert!(record.is_success());
        assert!(record.command().starts_with("./trainer "));
    }
}

#[test]
fn test_failure_skips_rest_of_seed_sub_sweep() {
    // Modality-major: seeds are innermost, so (2, visual, 0) failing
    // skips (2, visual, 1) and nothing else
    let plan = plan(&[1, 2], &[0, 1], SweepOrdering::ModalityMajor);
    let mut trainer = ScriptedTrainer::failing(&[(2, Modality::Visual, 0)]);
    let mut sink = MemorySink::new();

    let report = SweepDriver::new(&mut trainer, &mut sink)
        .run(&plan, &template)
        .unwrap();

    let recorded = keys(sink.records());
    assert!(!recorded.contains(&(2, Modality::Visual, 0)));
    assert!(!recorded.contains(&(2, Modality::Visual, 1)));
    assert!(!trainer.calls.contains(&(2, Modality::Visual, 1)));
    assert!(recorded.contains(&(1, Modality::Visual, 0)));
    assert!(recorded.contains(&(1, Modality::Visual, 1)));
    assert_eq!(sink.len(), 6);
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.skipped(), 1);
    assert!(!report.halted());
}

#[test]
fn test_failure_skips_rest_of_modality_sub_sweep() {
    // Seed-major: modalities are innermost, so (2, state, 1) failing skips
    // (2, visual, 1) and the sweep resumes at the next environment count
    let plan = plan(&[1, 2, 4, 8], &[0, 1], SweepOrdering::SeedMajor);
    let mut trainer = ScriptedTrainer::failing(&[(2, Modality::State, 1)]);
    let mut sink = MemorySink::new();

    let report = SweepDriver::new(&mut trainer, &mut sink)
        .run(&plan, &template)
        .unwrap();

    let recorded = keys(sink.records());
    assert!(recorded.contains(&(1, Modality::Visual, 1)));
    assert!(!recorded.contains(&(2, Modality::State, 1)));
    assert!(!trainer.calls.contains(&(2, Modality::Visual, 1)));
    assert!(recorded.contains(&(2, Modality::Visual, 0)));
    assert!(recorded.contains(&(4, Modality::State, 1)));
    assert!(recorded.contains(&(8, Modality::Visual, 1)));
    assert_eq!(report.skipped(), 1);
    assert_eq!(sink.len(), 16 - 2);
}

#[test]
fn test_continue_policy_attempts_everything() {
    let plan = plan(&[1, 2], &[0, 1], SweepOrdering::ModalityMajor);
    let mut trainer = ScriptedTrainer::failing(&[(1, Modality::State, 0)]);
    let mut sink = MemorySink::new();

    let report = SweepDriver::new(&mut trainer, &mut sink)
        .with_failure_policy(FailurePolicy::Continue)
        .run(&plan, &template)
        .unwrap();

    assert_eq!(trainer.calls.len(), 8);
    assert_eq!(sink.len(), 7);
    assert_eq!(report.skipped(), 0);
}

#[test]
fn test_abort_sweep_policy_halts() {
    let plan = plan(&[1, 2], &[0, 1], SweepOrdering::ModalityMajor);
    let mut trainer = ScriptedTrainer::failing(&[(1, Modality::State, 1)]);
    let mut sink = MemorySink::new();

    let report = SweepDriver::new(&mut trainer, &mut sink)
        .with_failure_policy(FailurePolicy::AbortSweep)
        .run(&plan, &template)
        .unwrap();

    assert!(report.halted());
    assert_eq!(trainer.calls.len(), 2);
    assert_eq!(sink.len(), 1);
    assert_eq!(report.skipped(), 6);
}

#[test]
fn test_rerun_then_dedup_recovers_one_record_per_point() {
    let plan = plan(&[1, 2], &[0, 1], SweepOrdering::ModalityMajor);
    let mut sink = MemorySink::new();
    for _ in 0..2 {
        SweepDriver::new(ScriptedTrainer::default(), &mut sink)
            .run(&plan, &template)
            .unwrap();
    }
    assert_eq!(sink.len(), 16);

    let records = sink.into_records();
    let first = dedup(records.clone(), KeepPolicy::First);
    let last = dedup(records.clone(), KeepPolicy::Last);
    assert_eq!(first.len(), 8);
    assert_eq!(keys(&first), keys(&records[..8]));
    assert_eq!(keys(&last).len(), 8);
}

#[test]
fn test_duration_measures_wall_clock() {
    let plan = SweepPlan::new(&[1], &[Modality::State], &[0], SweepOrdering::ModalityMajor)
        .unwrap();
    let trainer = ScriptedTrainer {
        sleep: Some(Duration::from_millis(300)),
        ..ScriptedTrainer::default()
    };
    let mut sink = MemorySink::new();
    SweepDriver::new(trainer, &mut sink)
        .run(&plan, &template)
        .unwrap();

    let duration = sink.records()[0].duration_seconds();
    assert!(duration >= 0.3, "duration {duration} shorter than sleep");
    assert!(duration < 0.8, "duration {duration} far beyond sleep");
}

/// Sink that accepts `capacity` records and then fails.
struct FullDisk {
    capacity: usize,
    written: usize,
}

impl ResultsSink for FullDisk {
    fn append(&mut self, _: &SweepResult) -> Result<()> {
        if self.written == self.capacity {
            return Err(Error::SinkWrite {
                path: "results.txt".into(),
                source: io::Error::other("no space left on device"),
            });
        }
        self.written += 1;
        Ok(())
    }
}

#[test]
fn test_sink_write_error_halts_sweep() {
    let plan = plan(&[1, 2], &[0, 1], SweepOrdering::ModalityMajor);
    let mut trainer = ScriptedTrainer::default();
    let sink = FullDisk {
        capacity: 3,
        written: 0,
    };

    let err = SweepDriver::new(&mut trainer, sink)
        .run(&plan, &template)
        .unwrap_err();

    assert!(matches!(err, Error::SinkWrite { .. }));
    assert_eq!(trainer.calls.len(), 4);
}

struct MissingTrainer {
    calls: usize,
}

impl TrainerInvoker for MissingTrainer {
    fn invoke(&mut self, invocation: &Invocation) -> Result<InvocationOutcome> {
        self.calls += 1;
        Err(Error::TrainerUnavailable {
            program: invocation.program().to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })
    }
}

#[test]
fn test_unavailable_trainer_halts_sweep() {
    let plan = plan(&[1, 2], &[0, 1], SweepOrdering::ModalityMajor);
    let mut trainer = MissingTrainer { calls: 0 };
    let mut sink = MemorySink::new();

    let err = SweepDriver::new(&mut trainer, &mut sink)
        .run(&plan, &template)
        .unwrap_err();

    assert!(matches!(err, Error::TrainerUnavailable { .. }));
    assert_eq!(trainer.calls, 1);
    assert!(sink.is_empty());
}
