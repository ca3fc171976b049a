//! A scripted [`CommandRunner`] for exercising services without touching
//! the host.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{CommandOutput, CommandRunner, CommandSpec, ExecutorError};

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    TimedOut,
}

/// Answers commands by matching their rendered command line.
///
/// Replies are checked in the order they were added and the first one whose
/// pattern is a substring of the command line wins. Unmatched commands
/// succeed with empty output. Every command is recorded.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    replies: Vec<(String, Reply)>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `output`.
    #[must_use]
    pub fn reply(mut self, pattern: &str, output: CommandOutput) -> Self {
        self.replies.push((pattern.to_owned(), Reply::Output(output)));
        self
    }

    /// Answer commands containing `pattern` with a successful `stdout`.
    #[must_use]
    pub fn succeed(self, pattern: &str, stdout: &str) -> Self {
        self.reply(pattern, CommandOutput::ok(stdout))
    }

    /// Answer commands containing `pattern` with exit status 1 and `stderr`.
    #[must_use]
    pub fn fail(self, pattern: &str, stderr: &str) -> Self {
        self.reply(pattern, CommandOutput::failed(1, stderr))
    }

    /// Make commands containing `pattern` time out.
    #[must_use]
    pub fn time_out(mut self, pattern: &str) -> Self {
        self.replies.push((pattern.to_owned(), Reply::TimedOut));
        self
    }

    /// Every command run so far, in order.
    #[must_use]
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Rendered command lines of every command run so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.specs().iter().map(ToString::to_string).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutorError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(spec.clone());
        let line = spec.to_string();
        let reply = self
            .replies
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());
        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::TimedOut) => Err(ExecutorError::TimedOut { command: line, secs: 10 }),
            None => Ok(CommandOutput::ok("")),
        }
    }
}
