use anyhow::{Context, Result};
use std::io::Write;

use crate::command::{Invocation, Runner};
use crate::config::Config;

pub const ENV_ACCESS_KEY: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_KEY: &str = "AWS_SECRET_ACCESS_KEY";

#[derive(Debug, Clone)]
pub struct Plugin {
    pub config: Config,
}

impl Plugin {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Credential variables handed to every child. Blank keys are left out so
    /// whatever the inherited environment holds stays in effect.
    pub fn credentials(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(key) = self.config.access_key.as_deref().filter(|k| !k.is_empty()) {
            env.push((ENV_ACCESS_KEY.to_string(), key.to_string()));
        }
        if let Some(key) = self.config.secret_key.as_deref().filter(|k| !k.is_empty()) {
            env.push((ENV_SECRET_KEY.to_string(), key.to_string()));
        }
        env
    }

    /// `up version` followed by one `up deploy <stage>` per stage, in order.
    pub fn commands(&self) -> Vec<Invocation> {
        let binary = &self.config.binary;
        std::iter::once(Invocation::version(binary))
            .chain(
                self.config
                    .stages
                    .iter()
                    .map(|stage| Invocation::deploy(binary, stage)),
            )
            .collect()
    }

    /// Trace and run every command in sequence; the first failure aborts the rest.
    pub async fn exec<W: Write, R: Runner>(&self, out: &mut W, runner: &mut R) -> Result<()> {
        let env = self.credentials();
        for (name, _) in &env {
            tracing::debug!(variable = %name, "passing credential to child processes");
        }
        if self.config.stages.is_empty() {
            tracing::warn!("no stages configured; only `{} version` will run", self.config.binary);
        }

        for cmd in self.commands() {
            writeln!(out, "{}", cmd.trace_line()).context("write trace line")?;
            out.flush().context("flush stdout")?;

            runner.run(&cmd, &env).await?;
        }
        Ok(())
    }
}
