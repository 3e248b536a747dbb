//! Results file sink tests

use std::fs::{self, File};
use std::io::BufReader;

use orbit_sweep::invoker::{ExitState, Invocation, InvocationOutcome, TrainerInvoker};
use orbit_sweep::sink::{read_records, FileSink, MemorySink, ResultsSink};
use orbit_sweep::sweep::{
    Modality, SweepDriver, SweepOrdering, SweepPlan, SweepPoint, SweepResult, SweepStatus,
};
use orbit_sweep::Error;
use tempfile::TempDir;

fn result(n: u32, modality: Modality, seed: u64, secs: f64) -> SweepResult {
    SweepResult::new(
        SweepPoint::new(n, modality, seed),
        secs,
        format!("./orbit.sh --num_envs {n} --seed {seed}"),
        SweepStatus::Success,
    )
}

#[test]
fn test_file_sink_writes_one_line_per_result() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");

    let mut sink = FileSink::open(&path).unwrap();
    sink.append(&result(128, Modality::Visual, 3, 1234.5)).unwrap();
    sink.append(&result(1, Modality::State, 0, 2.0)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "128, 3, visual, 1234.5, ./orbit.sh --num_envs 128 --seed 3"
    );
    assert!(text.ends_with('\n'));
}

#[test]
fn test_file_sink_appends_across_opens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");

    FileSink::open(&path)
        .unwrap()
        .append(&result(1, Modality::State, 0, 1.0))
        .unwrap();
    FileSink::open(&path)
        .unwrap()
        .append(&result(2, Modality::State, 0, 2.0))
        .unwrap();

    let records = read_records(BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].point().environment_count(), 1);
    assert_eq!(records[1].point().environment_count(), 2);
}

#[test]
fn test_file_sink_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runs/2024/results.txt");

    let mut sink = FileSink::open(&path).unwrap();
    sink.append(&result(4, Modality::Visual, 1, 9.0)).unwrap();
    assert_eq!(sink.path(), path.as_path());
    assert!(path.exists());
}

#[test]
fn test_unwritable_path_is_sink_error() {
    let dir = TempDir::new().unwrap();
    // A directory cannot be opened for appending
    let err = FileSink::open(dir.path()).unwrap_err();
    assert!(matches!(err, Error::SinkWrite { .. }));
    assert!(err.to_string().contains("not writable"));
}

#[test]
fn test_round_trip_preserves_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");
    let original = result(512, Modality::Visual, 4, 0.125);

    FileSink::open(&path).unwrap().append(&original).unwrap();
    let records = read_records(BufReader::new(File::open(&path).unwrap())).unwrap();

    assert_eq!(records[0].point(), original.point());
    assert_eq!(records[0].command(), original.command());
    assert!((records[0].duration_seconds() - 0.125).abs() < f64::EPSILON);
}

#[test]
fn test_malformed_line_reports_line_number() {
    let text = "1, 0, state, 1.0, ./t\n2, 0, lidar, 1.0, ./t\n";
    let err = read_records(text.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Parse { line: 2, .. }));
}

#[test]
fn test_fan_out_sink_writes_both() {
    let mut first = MemorySink::new();
    let mut second = MemorySink::new();
    {
        let mut both = (&mut first, &mut second);
        both.append(&result(1, Modality::State, 0, 1.0)).unwrap();
    }
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
}

struct Succeeds;

impl TrainerInvoker for Succeeds {
    fn invoke(&mut self, _: &Invocation) -> orbit_sweep::Result<InvocationOutcome> {
        Ok(InvocationOutcome::from_exit(ExitState::Success))
    }
}

#[test]
fn test_argument_with_line_break_stays_on_one_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");
    let plan = SweepPlan::new(&[1, 2], &[Modality::State], &[0], SweepOrdering::ModalityMajor)
        .unwrap();
    let template = |_: &SweepPoint| Invocation::new("./trainer", ["--note", "a\nb\r"]);

    SweepDriver::new(Succeeds, FileSink::open(&path).unwrap())
        .run(&plan, &template)
        .unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);
    let records = read_records(BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].command(), r"./trainer --note $'a\nb\r'");
}

#[test]
fn test_file_sink_refuses_raw_line_break() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");
    let mut sink = FileSink::open(&path).unwrap();

    let broken = SweepResult::new(
        SweepPoint::new(1, Modality::State, 0),
        1.0,
        "./trainer --note a\nb",
        SweepStatus::Success,
    );
    let err = sink.append(&broken).unwrap_err();
    assert!(matches!(err, Error::SinkWrite { .. }));
    assert!(fs::read_to_string(&path).unwrap().is_empty());
}
