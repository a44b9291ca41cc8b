use anyhow::Result;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use crate::command::{DryRunRunner, ProcessRunner};
use crate::config::{self, Config, Settings};
use crate::plugin::Plugin;

#[derive(Debug, Parser)]
#[command(name = "drone-up", version, about = "Deploy Apex Up stages from CI")]
pub struct RootCmd {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub plugin: PluginArgs,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Args)]
pub struct PluginArgs {
    /// AWS access key passed to `up` as AWS_ACCESS_KEY_ID
    #[arg(long, env = "PLUGIN_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// AWS secret key passed to `up` as AWS_SECRET_ACCESS_KEY
    #[arg(long, env = "PLUGIN_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Stage to deploy; repeat or comma-separate for several, deployed in order
    #[arg(long = "stage", env = "PLUGIN_STAGE", value_delimiter = ',')]
    pub stages: Vec<String>,

    /// `up` executable to run (looked up on PATH unless it is a path)
    #[arg(long, env = "PLUGIN_BINARY")]
    pub binary: Option<String>,

    /// YAML file with `access_key`, `secret_key`, `stage` and `binary`
    #[arg(long, env = "PLUGIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the commands without running them
    #[arg(
        long,
        env = "PLUGIN_DRY_RUN",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub dry_run: bool,
}

impl PluginArgs {
    /// Flag/env values layered over the optional descriptor file.
    pub fn resolve(&self) -> Result<Config> {
        let file: Settings = match &self.config {
            Some(path) => config::load_yaml(path)?,
            None => Settings::default(),
        };
        let cli = Settings {
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            stage: self.stages.clone(),
            binary: self.binary.clone(),
        };
        Ok(Config::from(cli.or(file)))
    }
}

pub async fn run(root: RootCmd) -> Result<()> {
    match root.cmd {
        Some(Command::Completion { shell }) => {
            let mut cmd = RootCmd::command();
            clap_complete::generate(shell, &mut cmd, "drone-up", &mut std::io::stdout());
            Ok(())
        }
        None => {
            let config = root.plugin.resolve()?;
            tracing::info!(?config, dry_run = root.plugin.dry_run, "starting deploy");

            let plugin = Plugin::new(config);
            let mut stdout = std::io::stdout();
            if root.plugin.dry_run {
                plugin.exec(&mut stdout, &mut DryRunRunner).await
            } else {
                plugin.exec(&mut stdout, &mut ProcessRunner).await
            }
        }
    }
}
