//! scarr CLI
//!
//! `scarr init` scaffolds a project, `scarr deploy` reconciles the AWS
//! hosting stack and syncs content, `scarr version` prints the version.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use scarr::config::{DeploymentSpec, CONFIG_FILE_NAME, DEFAULT_REGION};
use scarr::init::{scaffold, InitOptions};
use scarr::orchestrator::{DeployOptions, Deployer};
use scarr::prompt::TerminalPrompt;
use scarr::providers::aws::AwsCloud;
use scarr::reporter::{ReportLevel, Reporter};
use scarr::DeployError;

const AFTER_HELP: &str = "\
AWS credentials come from the standard provider chain, e.g.:

    AWS_PROFILE=some_profile scarr deploy
    AWS_ACCESS_KEY_ID=some_id AWS_SECRET_ACCESS_KEY=some_key scarr deploy

The IAM user needs access to route53domains, route53, acm, s3 and cloudfront.";

/// Static sites on AWS: domain, certificate, bucket, CDN, DNS and content sync
#[derive(Parser, Debug)]
#[command(name = "scarr", version, about, after_help = AFTER_HELP)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "false")]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value = "false", env = "SCARR_LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new project directory with a scarr.yml
    Init {
        /// The domain this site will live at
        #[arg(long)]
        domain: String,

        /// The name of this project (also the directory created)
        #[arg(long)]
        name: String,

        /// AWS region for the bucket
        #[arg(long, default_value = DEFAULT_REGION, env = "AWS_REGION")]
        region: String,

        /// URL to redirect the domain to
        #[arg(long)]
        redirect: Option<String>,
    },

    /// Set up infrastructure and sync files to it
    Deploy {
        /// Path to the project config
        #[arg(long, default_value = CONFIG_FILE_NAME, env = "SCARR_CONFIG")]
        config: PathBuf,

        /// Assume the infrastructure is set up; only upload and invalidate
        #[arg(long, default_value = "false")]
        skip_setup: bool,

        /// Register the domain without prompting if it is available
        #[arg(long, default_value = "false")]
        auto_register: bool,

        /// Limit output to errors and prompts
        #[arg(long, default_value = "false")]
        silent: bool,

        /// Leave domain registration alone (domain managed elsewhere)
        #[arg(long, default_value = "false")]
        skip_domain: bool,
    },

    /// Print the version
    Version,
}

fn init_tracing(verbose: bool, silent: bool, json: bool) {
    let default = match (verbose, silent) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_deploy(
    config: PathBuf,
    options: DeployOptions,
    silent: bool,
) -> Result<(), DeployError> {
    let spec = DeploymentSpec::load(&config)
        .with_context(|| format!("Run `scarr init` or pass --config (looked for {})", config.display()))
        .map_err(|e| DeployError::Config(format!("{:#}", e)))?;

    let cloud = AwsCloud::connect(&spec.region).await;
    let reporter = Reporter::new(ReportLevel::from_silent_flag(silent));

    let report = Deployer::new(cloud.services(), Arc::new(TerminalPrompt), reporter)
        .deploy(&spec, options)
        .await?;

    info!(
        cdn = %report.cdn_domain,
        endpoint = %report.website_endpoint,
        uploaded = report.uploaded_paths.len(),
        "Deploy finished"
    );
    match serde_json::to_string(&report) {
        Ok(json) => debug!(report = %json, "Deploy report"),
        Err(e) => debug!("Could not serialize deploy report: {}", e),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let silent = matches!(cli.command, Command::Deploy { silent: true, .. });
    init_tracing(cli.verbose, silent, cli.json_logs);

    match cli.command {
        Command::Version => {
            println!("scarr {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Command::Init {
            domain,
            name,
            region,
            redirect,
        } => {
            let cwd = PathBuf::from(".");
            match scaffold(&cwd, InitOptions { domain, name, region, redirect }) {
                Ok(path) => {
                    info!("📝 Created {}", path.display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{:#}", e);
                    ExitCode::from(1)
                }
            }
        }
        Command::Deploy {
            config,
            skip_setup,
            auto_register,
            silent,
            skip_domain,
        } => {
            let options = DeployOptions {
                skip_setup,
                auto_register,
                skip_domain,
            };
            match run_deploy(config, options, silent).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("❌ {}", e);
                    if e.is_recoverable() {
                        error!("Re-running `scarr deploy` will pick up where this run stopped.");
                    }
                    ExitCode::from(e.exit_code())
                }
            }
        }
    }
}
