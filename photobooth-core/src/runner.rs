//! Command Runner - External Process Capability
//!
//! Business logic never spawns processes directly. It receives a
//! `CommandRunner`: `ProcessRunner` in production, `ScriptedRunner` when
//! the print subsystem must be faked.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::process::Command;
use tracing::debug;

use crate::error::CommandFailure;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self { stdout: text.into(), stderr: String::new() }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion. A non-zero exit is a
    /// failure whose message is the process's diagnostic text.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandFailure>;
}

/// Spawns real processes. Arguments are passed as a vector, never
/// through a shell. No timeout is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandFailure> {
        debug!(program, ?args, "spawning");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| CommandFailure::new(program, e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let message = if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if !stdout.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                format!("exited with {}", output.status)
            };
            return Err(CommandFailure::new(program, message));
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Answers invocations from a script instead of spawning processes.
///
/// A rule matches when the space-joined command line starts with its
/// prefix; the first matching rule wins. Unmatched calls fail. Every
/// call is recorded.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, Result<CommandOutput, String>)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, prefix: &str, stdout: &str) -> Self {
        self.rules.push((prefix.to_string(), Ok(CommandOutput::stdout(stdout))));
        self
    }

    pub fn on_output(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.rules.push((prefix.to_string(), Ok(output)));
        self
    }

    pub fn on_fail(mut self, prefix: &str, message: &str) -> Self {
        self.rules.push((prefix.to_string(), Err(message.to_string())));
        self
    }

    /// Command lines seen so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandFailure> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        match self.calls.lock() {
            Ok(mut calls) => calls.push(line.clone()),
            Err(poisoned) => poisoned.into_inner().push(line.clone()),
        }

        match self.rules.iter().find(|(prefix, _)| line.starts_with(prefix.as_str())) {
            Some((_, Ok(output))) => Ok(output.clone()),
            Some((_, Err(message))) => Err(CommandFailure::new(program, message.clone())),
            None => Err(CommandFailure::new(program, "no scripted response")),
        }
    }
}
