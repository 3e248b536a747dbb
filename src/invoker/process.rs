//! Subprocess-backed trainer invoker.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{ExitState, Invocation, InvocationOutcome, TrainerInvoker};
use crate::monitor::{NvidiaSmiProbe, UtilizationMonitor, UtilizationProbe};
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs the trainer as a child process.
///
/// Stdout is inherited so training progress stays visible; stderr is
/// captured on a helper thread so a verbose trainer cannot stall on a
/// full pipe.
#[derive(Debug, Clone)]
pub struct ProcessInvoker<P = NvidiaSmiProbe> {
    timeout: Option<Duration>,
    monitor: Option<(P, Duration)>,
}

impl ProcessInvoker {
    /// Invoker with no timeout and no utilization monitoring.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: None,
            monitor: None,
        }
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: UtilizationProbe + Clone> ProcessInvoker<P> {
    /// Kill the trainer if it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sample utilization with `probe` every `interval` while the trainer runs.
    #[must_use]
    pub fn with_monitor<Q: UtilizationProbe + Clone>(
        self,
        probe: Q,
        interval: Duration,
    ) -> ProcessInvoker<Q> {
        ProcessInvoker {
            timeout: self.timeout,
            monitor: Some((probe, interval)),
        }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitState> {
        // A timeout past the representable range never fires
        let Some(deadline) = self
            .timeout
            .and_then(|limit| Instant::now().checked_add(limit))
        else {
            return Ok(child.wait()?.into());
        };

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status.into());
            }
            if Instant::now() >= deadline {
                // The child may exit between try_wait and kill
                if let Err(e) = child.kill() {
                    tracing::debug!(error = %e, "kill after timeout failed");
                }
                child.wait()?;
                return Ok(ExitState::TimedOut);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl<P: UtilizationProbe + Clone> TrainerInvoker for ProcessInvoker<P> {
    fn invoke(&mut self, invocation: &Invocation) -> Result<InvocationOutcome> {
        let mut command = Command::new(invocation.program());
        command
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| Error::TrainerUnavailable {
            program: invocation.program().to_string(),
            source,
        })?;
        let monitor = self
            .monitor
            .as_ref()
            .map(|(probe, interval)| UtilizationMonitor::start(probe.clone(), *interval));
        let stderr = child.stderr.take().map(drain);

        let exit = match self.wait(&mut child) {
            Ok(exit) => exit,
            Err(e) => {
                abandon(&mut child);
                return Err(e);
            }
        };
        let system_samples = monitor.map(UtilizationMonitor::stop).unwrap_or_default();

        // Grandchildren of a killed trainer may still hold the pipe open
        let stderr = match (exit, stderr) {
            (ExitState::TimedOut, _) | (_, None) => String::new(),
            (_, Some(handle)) => handle.join().unwrap_or_default(),
        };

        Ok(InvocationOutcome {
            exit,
            stderr,
            system_samples,
        })
    }
}

/// Kill and reap a child whose status could not be read.
fn abandon(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "kill of abandoned trainer failed");
    }
    if let Err(e) = child.wait() {
        tracing::debug!(error = %e, "reaping abandoned trainer failed");
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            tracing::debug!(error = %e, "reading trainer stderr failed");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
