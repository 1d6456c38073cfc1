use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use gitver::config::{load_configuration, ConfigurationBuilder};
use gitver::{output, CalculationOptions, Git2Repository, GitVersionCalculator, GitVersionConfiguration};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(clap::Parser)]
#[command(
    name = "gitver",
    version,
    about = "Calculate a semantic version from git history, tags and branch conventions"
)]
struct Args {
    #[arg(short, long, default_value = ".", help = "Path inside the git repository")]
    path: PathBuf,

    #[arg(short, long, help = "Calculate for this branch instead of HEAD")]
    branch: Option<String>,

    #[arg(long, help = "Calculate for this commit sha on the branch")]
    commit: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        long = "override",
        value_name = "KEY=VALUE",
        help = "Override a configuration value, e.g. branches.main.label=rc"
    )]
    overrides: Vec<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    output: OutputFormat,

    #[arg(long, value_name = "NAME", help = "Print a single variable, e.g. FullSemVer")]
    show_variable: Option<String>,

    #[arg(long, help = "Print the effective configuration and exit")]
    show_config: bool,

    #[arg(short, long, help = "Log diagnostics to stderr")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        gitver::logging::init_tracing(tracing::Level::DEBUG);
    } else {
        gitver::logging::init_tracing(tracing::Level::WARN);
    }

    let configuration = match build_configuration(&args) {
        Ok(configuration) => configuration,
        Err(e) => {
            output::display_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    if args.show_config {
        let rendered = toml::to_string_pretty(&configuration).context("Failed to render configuration")?;
        println!("{}", rendered);
        return Ok(());
    }

    let repository = match Git2Repository::open(&args.path) {
        Ok(repository) => repository,
        Err(e) => {
            output::display_error(&format!("Git repository error: {}", e));
            std::process::exit(1);
        }
    };

    let options = CalculationOptions {
        target_branch: args.branch.clone(),
        target_commit: args.commit.clone(),
    };
    let variables = match GitVersionCalculator::new(&repository, configuration)
        .with_options(options)
        .calculate()
    {
        Ok(variables) => variables,
        Err(e) => {
            output::display_error(&e.to_string());
            std::process::exit(1);
        }
    };

    if let Some(name) = &args.show_variable {
        match variables.get(name) {
            Some(value) => println!("{}", value),
            None => {
                output::display_error(&format!(
                    "Unknown variable '{}'. Available: {}",
                    name,
                    output::VARIABLE_NAMES.join(", ")
                ));
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    match args.output {
        OutputFormat::Json => println!("{}", output::to_json(&variables)?),
        OutputFormat::Text => println!("{}", output::to_text(&variables)),
    }
    Ok(())
}

/// Built-in workflow, then the configuration file, then command line overrides
fn build_configuration(args: &Args) -> Result<GitVersionConfiguration> {
    let working_dir = if args.path.is_dir() {
        args.path.clone()
    } else {
        std::env::current_dir()?
    };

    let mut builder = ConfigurationBuilder::new();
    if let Some(file) = load_configuration(args.config.as_deref(), &working_dir)? {
        builder.add_override(file);
    }
    if !args.overrides.is_empty() {
        let table = ConfigurationBuilder::parse_cli_overrides(&args.overrides)?;
        builder.add_override_table(table)?;
    }
    Ok(builder.build()?)
}
