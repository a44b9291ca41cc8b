use anyhow::{Context, Result};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

/// One external process call: a program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
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

    /// `<binary> version`
    pub fn version(binary: &str) -> Self {
        Self::new(binary, ["version"])
    }

    /// `<binary> deploy <stage>`
    pub fn deploy(binary: &str, stage: &str) -> Self {
        Self::new(binary, ["deploy", stage])
    }

    /// Echo printed before the invocation runs. Arguments are not quoted.
    pub fn trace_line(&self) -> String {
        format!("$ {self}")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// Variables applied on top of the inherited environment of every child.
pub type EnvOverlay = [(String, String)];

/// Executes invocations on behalf of the plugin.
pub trait Runner {
    async fn run(&mut self, invocation: &Invocation, env: &EnvOverlay) -> Result<()>;
}

/// Spawns the real process with stdout/stderr passed straight through.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    async fn run(&mut self, invocation: &Invocation, env: &EnvOverlay) -> Result<()> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| {
                format!(
                    "failed to run `{invocation}` (is `{}` installed and on PATH?)",
                    invocation.program
                )
            })?;
        if !status.success() {
            anyhow::bail!("`{invocation}` failed with exit code: {status}");
        }
        tracing::debug!(command = %invocation, "command finished");
        Ok(())
    }
}

/// Runs nothing; the trace lines alone show what would happen.
#[derive(Debug, Default)]
pub struct DryRunRunner;

impl Runner for DryRunRunner {
    async fn run(&mut self, invocation: &Invocation, env: &EnvOverlay) -> Result<()> {
        let names: Vec<&str> = env.iter().map(|(k, _)| k.as_str()).collect();
        tracing::info!(command = %invocation, env = ?names, "[DRY RUN] skipping");
        Ok(())
    }
}
