//! Command-line entry point for rendering the Cluster API Provider AWS IAM
//! bootstrap template and its policies.

mod config;

use anyhow::Result;
use capa_iam_bootstrap::{ConfigurationSpec, PolicyName, Template};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Bootstrap configuration file (JSON, or TOML with a .toml extension)
    #[arg(short, long, global = true, env = "CAPA_IAM_BOOTSTRAP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the CloudFormation template of the IAM resources
    PrintCloudformationTemplate,
    /// Print the document of a single managed policy
    PrintPolicy {
        /// Logical name of the policy, e.g. AWSIAMManagedPolicyControllers
        #[arg(short, long)]
        document: String,
    },
    /// Print the effective configuration, defaults included
    PrintConfig,
    /// Print the JSON schema of the configuration file
    ConfigSchema,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn load_template(cli: &Cli) -> Result<Template> {
    let spec = config::load_spec(cli.config.as_deref())?;
    Ok(Template::new(spec)?)
}

fn run(cli: &Cli) -> Result<String> {
    match &cli.command {
        Commands::PrintCloudformationTemplate => {
            let template = load_template(cli)?;
            Ok(template.render_cloudformation().to_json_pretty()?)
        }
        Commands::PrintPolicy { document } => {
            let name: PolicyName = document.parse()?;
            let template = load_template(cli)?;
            Ok(serde_json::to_string_pretty(&template.policy_document(name))?)
        }
        Commands::PrintConfig => {
            let template = load_template(cli)?;
            Ok(serde_json::to_string_pretty(template.spec())?)
        }
        Commands::ConfigSchema => {
            let schema = schemars::schema_for!(ConfigurationSpec);
            Ok(serde_json::to_string_pretty(&schema)?)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
