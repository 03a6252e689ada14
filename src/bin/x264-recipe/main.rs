//! x264-recipe CLI - build and package the x264 encoder library

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use x264_recipe::builder::StepError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        // A failing configure/make keeps its own exit code.
        let code = e
            .downcast_ref::<StepError>()
            .map(StepError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("x264_recipe=debug")
    } else if cli.quiet {
        EnvFilter::new("x264_recipe=error")
    } else {
        EnvFilter::new("x264_recipe=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = cli.shell();
    let dirs = commands::Dirs {
        recipe_dir: cli.recipe_dir.clone(),
        package_dir: cli.package_dir.clone(),
    };

    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, &dirs, &shell),
        Commands::Source(args) => commands::source::execute(args, &dirs, &shell),
        Commands::Build(args) => commands::build::execute(args, &dirs, &shell),
        Commands::Package(args) => commands::package::execute(args, &dirs, &shell),
        Commands::Info(args) => commands::info::execute(args, &dirs, &shell),
        Commands::Create(args) => commands::create::execute(args, &dirs, &shell),
        Commands::Doctor(args) => commands::doctor::execute(args, &dirs, cli.verbose),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
