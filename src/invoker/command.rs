//! Command templates with per-point placeholders.

use serde::{Deserialize, Serialize};

use super::{Invocation, InvocationTemplate};
use crate::sweep::{Modality, SweepPoint};
use crate::{Error, Result};

/// Default trainer launcher.
pub const DEFAULT_PROGRAM: &str = "./orbit.sh";

/// Default argument tokens for the launcher.
pub const DEFAULT_ARGS: [&str; 9] = [
    "-p",
    "source/standalone/workflows/skrl/train.py",
    "--task",
    "{task}",
    "--headless",
    "--num_envs",
    "{num_envs}",
    "--seed",
    "{seed}",
];

const PLACEHOLDERS: [&str; 4] = ["task", "num_envs", "seed", "modality"];

/// Task name to launch for each modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskNames {
    /// Task for state observations
    pub state: String,
    /// Task for camera observations
    pub visual: String,
}

impl TaskNames {
    /// Task name for `modality`.
    #[must_use]
    pub fn for_modality(&self, modality: Modality) -> &str {
        match modality {
            Modality::State => &self.state,
            Modality::Visual => &self.visual,
        }
    }
}

impl Default for TaskNames {
    fn default() -> Self {
        Self {
            state: "Isaac-Lift-Cube-Franka-v0".to_string(),
            visual: "Isaac-Lift-Cube-Camera-Franka-v0".to_string(),
        }
    }
}

/// Program and argument tokens with `{task}`, `{num_envs}`, `{seed}` and
/// `{modality}` placeholders, expanded per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
    tasks: TaskNames,
}

impl CommandTemplate {
    /// Create a validated template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the program is empty or a token uses
    /// an unknown placeholder.
    pub fn new(program: impl Into<String>, args: Vec<String>, tasks: TaskNames) -> Result<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(Error::Config("trainer program must not be empty".to_string()));
        }
        for token in std::iter::once(&program).chain(&args) {
            for name in placeholders(token)? {
                if !PLACEHOLDERS.contains(&name) {
                    return Err(Error::Config(format!(
                        "unknown placeholder `{{{name}}}` in `{token}` (known: {})",
                        PLACEHOLDERS.join(", ")
                    )));
                }
            }
        }
        Ok(Self {
            program,
            args,
            tasks,
        })
    }

    /// Get the program.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the task names.
    #[must_use]
    pub const fn tasks(&self) -> &TaskNames {
        &self.tasks
    }

    fn expand(&self, token: &str, point: &SweepPoint) -> String {
        token
            .replace("{task}", self.tasks.for_modality(point.modality()))
            .replace("{num_envs}", &point.environment_count().to_string())
            .replace("{seed}", &point.seed().to_string())
            .replace("{modality}", point.modality().as_str())
    }
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: DEFAULT_ARGS.iter().map(ToString::to_string).collect(),
            tasks: TaskNames::default(),
        }
    }
}

impl InvocationTemplate for CommandTemplate {
    fn resolve(&self, point: &SweepPoint) -> Invocation {
        Invocation::new(
            self.expand(&self.program, point),
            self.args.iter().map(|arg| self.expand(arg, point)),
        )
    }
}

fn placeholders(token: &str) -> Result<Vec<&str>> {
    let mut names = Vec::new();
    let mut rest = token;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            Error::Config(format!("unterminated placeholder in `{token}`"))
        })?;
        names.push(&after[..close]);
        rest = &after[close + 1..];
    }
    Ok(names)
}
