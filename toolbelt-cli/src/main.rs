//! Toolbelt CLI - arithmetic tools, a forced-tool chain and an agent loop.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use toolbelt::tools::arithmetic_toolbox;
use toolbelt_cli::commands::{self, DEFAULT_AGENT_PROMPT, DEFAULT_CHAIN_PROMPT};
use toolbelt_cli::config;
use toolbelt_cli::error::{CliError, Result};

/// Toolbelt - tools, chains and agents for function-calling chat models
#[derive(Parser)]
#[command(name = "toolbelt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "TOOLBELT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the arithmetic tools with their argument schemas
    Tools,

    /// Force the model to call `multiply` and run it
    Chain(RunArgs),

    /// Let an agent pick tools until it can answer
    Agent(AgentArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments shared by the model-backed commands
#[derive(Args)]
struct RunArgs {
    /// Question for the model
    prompt: Option<String>,

    /// Replay scripted model turns instead of calling OpenAI
    #[arg(long)]
    offline: bool,
}

/// Arguments for the agent command
#[derive(Args)]
struct AgentArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Do not print the agent trace
    #[arg(short, long)]
    quiet: bool,

    /// Override the iteration limit
    #[arg(long)]
    max_iterations: Option<usize>,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Show configuration file path
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "toolbelt_cli={level},toolbelt={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Tools => cmd_tools(),
        Commands::Chain(args) => cmd_chain(args, cli.config).await,
        Commands::Agent(args) => cmd_agent(args, cli.config).await,
        Commands::Config(args) => cmd_config(args, cli.config).await,
    }
}

fn cmd_tools() -> Result<()> {
    print!("{}", commands::describe_tools(&arithmetic_toolbox())?);
    Ok(())
}

async fn cmd_chain(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = config::load(config_path).await?;
    let prompt = args.prompt.as_deref().unwrap_or(DEFAULT_CHAIN_PROMPT);

    let product = commands::run_chain(&config, prompt, args.offline).await?;
    println!("{product}");
    Ok(())
}

async fn cmd_agent(args: AgentArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = config::load(config_path).await?;
    if args.quiet {
        config.agent.verbose = false;
    }
    if let Some(max) = args.max_iterations {
        if max == 0 {
            return Err(CliError::config("--max-iterations must be at least 1"));
        }
        config.agent.max_iterations = max;
    }
    let prompt = args.run.prompt.as_deref().unwrap_or(DEFAULT_AGENT_PROMPT);

    let result = commands::run_agent(&config, prompt, args.run.offline).await?;
    if !config.agent.verbose {
        println!("{}", result.output);
    }
    tracing::info!(
        iterations = result.iterations,
        total_tokens = result.usage.total_tokens,
        "agent finished"
    );
    Ok(())
}

async fn cmd_config(args: ConfigArgs, config_path: Option<PathBuf>) -> Result<()> {
    let path = config::resolve_path(config_path);

    match args.command {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            if !path.exists() {
                println!("# {} does not exist, showing defaults", path.display());
            }
            let config = config::load_config_from(&path).await?.apply_env();
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
