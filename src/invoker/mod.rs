//! Trainer Invoker
//!
//! The driver talks to the trainer through [`TrainerInvoker`]. The real
//! implementation, [`ProcessInvoker`], spawns one child process per sweep
//! point from a structured argument list; tests substitute in-memory stubs.
//!
//! ```text
//! SweepPoint ──InvocationTemplate──> Invocation ──TrainerInvoker──> InvocationOutcome
//! ```

mod command;
mod process;

pub use command::{CommandTemplate, TaskNames, DEFAULT_ARGS, DEFAULT_PROGRAM};
pub use process::ProcessInvoker;

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

use crate::monitor::GpuSample;
use crate::sweep::SweepPoint;
use crate::Result;

/// A concrete trainer command: program plus argument tokens.
///
/// Never a shell string, so argument values containing spaces stay intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    /// Create an invocation from a program and its arguments.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Get the program.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the argument tokens.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Space-joined command line; tokens that need it are quoted so the string
/// can be pasted into a shell to re-run the point. The result never spans
/// more than one line.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_token(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_token(arg))?;
        }
        Ok(())
    }
}

fn quote_token(token: &str) -> Cow<'_, str> {
    if token.chars().any(char::is_control) {
        return Cow::Owned(ansi_c_quote(token));
    }
    let plain = !token.is_empty()
        && token.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | ',' | '+' | '@')
        });
    if plain {
        Cow::Borrowed(token)
    } else {
        Cow::Owned(format!("'{}'", token.replace('\'', r"'\''")))
    }
}

/// `$'...'` quoting with control characters escaped.
fn ansi_c_quote(token: &str) -> String {
    let mut out = String::from("$'");
    for c in token.chars() {
        match c {
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            '\t' => out.push_str(r"\t"),
            '\\' => out.push_str(r"\\"),
            '\'' => out.push_str(r"\'"),
            c if c.is_control() => {
                // Writing to a String cannot fail
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Resolves a sweep point to the command that runs it.
pub trait InvocationTemplate {
    /// Build the invocation for `point`.
    fn resolve(&self, point: &SweepPoint) -> Invocation;
}

impl<F> InvocationTemplate for F
where
    F: Fn(&SweepPoint) -> Invocation,
{
    fn resolve(&self, point: &SweepPoint) -> Invocation {
        self(point)
    }
}

/// How the trainer process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Exit status 0.
    Success,
    /// Non-zero exit; `None` when terminated by a signal.
    Failed(Option<i32>),
    /// Killed after exceeding the configured timeout.
    TimedOut,
}

impl ExitState {
    /// Whether the trainer succeeded.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ExitStatus> for ExitState {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Self::Success
        } else {
            Self::Failed(status.code())
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("exit 0"),
            Self::Failed(Some(code)) => write!(f, "exit {code}"),
            Self::Failed(None) => f.write_str("killed by signal"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Everything the driver learns from one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    /// How the process ended
    pub exit: ExitState,
    /// Captured standard error
    pub stderr: String,
    /// Utilization readings taken while the process ran
    pub system_samples: Vec<GpuSample>,
}

impl InvocationOutcome {
    /// Outcome with the given exit state and nothing captured.
    #[must_use]
    pub const fn from_exit(exit: ExitState) -> Self {
        Self {
            exit,
            stderr: String::new(),
            system_samples: Vec::new(),
        }
    }

    /// Last `lines` lines of stderr.
    #[must_use]
    pub fn stderr_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stderr.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// Runs one training session per call, blocking until it ends.
pub trait TrainerInvoker {
    /// Execute `invocation` and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TrainerUnavailable`] when the trainer cannot
    /// be started at all. A trainer that starts and then fails is reported
    /// through [`InvocationOutcome::exit`], not as an error.
    fn invoke(&mut self, invocation: &Invocation) -> Result<InvocationOutcome>;
}

impl<T: TrainerInvoker + ?Sized> TrainerInvoker for &mut T {
    fn invoke(&mut self, invocation: &Invocation) -> Result<InvocationOutcome> {
        (**self).invoke(invocation)
    }
}

impl<T: TrainerInvoker + ?Sized> TrainerInvoker for Box<T> {
    fn invoke(&mut self, invocation: &Invocation) -> Result<InvocationOutcome> {
        (**self).invoke(invocation)
    }
}
