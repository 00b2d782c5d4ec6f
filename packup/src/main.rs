mod commands;
mod formatting;
mod logger;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use packup_core::ConfigOverrides;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packup")]
#[command(about = "Build and watch a JavaScript/TypeScript package from its package.json")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory to start searching for package.json from.
    #[arg(long, global = true, env = "PACKUP_CWD", default_value = ".")]
    cwd: PathBuf,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, global = true, action)]
    quiet: bool,
}

#[derive(Args, Clone, Default)]
struct BuildArgs {
    #[arg(long, env = "PACKUP_MINIFY", action)]
    minify: bool,

    #[arg(long, action)]
    no_sourcemap: bool,

    /// tsconfig used for every declaration entry.
    #[arg(long, env = "PACKUP_TSCONFIG")]
    tsconfig: Option<PathBuf>,
}

impl From<BuildArgs> for ConfigOverrides {
    fn from(args: BuildArgs) -> Self {
        ConfigOverrides {
            minify: args.minify.then_some(true),
            sourcemap: args.no_sourcemap.then_some(false),
            tsconfig: args.tsconfig,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the output directory and build every task once.
    Build(BuildArgs),
    /// Rebuild on change until interrupted.
    Watch(BuildArgs),
    /// Verify that every declared output exists.
    Check,
    /// Show the planned tasks without running them.
    Plan {
        #[command(flatten)]
        build: BuildArgs,
        #[arg(long, action)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Build(args) => commands::cmd_build(cli.cwd, args.into(), cli.quiet)?,
        Commands::Watch(args) => commands::cmd_watch(cli.cwd, args.into(), cli.quiet)?,
        Commands::Check => commands::cmd_check(cli.cwd, cli.quiet)?,
        Commands::Plan { build, json } => {
            commands::cmd_plan(cli.cwd, build.into(), json, cli.quiet)?
        }
    }

    Ok(())
}
