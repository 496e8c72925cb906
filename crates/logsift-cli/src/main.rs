use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use logsift_cli::OutputFormat;
use logsift_cli::commands;
use logsift_cli::commands::report::ReportArgs;
use logsift_core::RunConfig;
use logsift_core::analysis::SortKey;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Parser)]
#[command(name = "logsift")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Build HTML timing reports from rotated NGINX access logs",
    long_about = "logsift finds the newest rotated access log in a directory, aggregates \
                  request times per URL and renders the slowest URLs into a static HTML \
                  report. It is meant to be run periodically, e.g. from cron."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format for terminal output
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the report for the newest log in the log directory
    Report(ReportArgs),

    /// Print per-URL statistics for a single log file
    Stats {
        /// Path to the access log (.log or .gz)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of URLs to show
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Metric to rank URLs by
        #[arg(long, default_value = "time_sum")]
        sort_by: SortKey,

        /// Minimum fraction of parsable lines (0.0 - 1.0)
        #[arg(long, value_name = "RATIO")]
        min_quality: Option<f64>,
    },

    /// Generate shell completion scripts
    #[command(after_long_help = "SUPPORTED SHELLS:\n  \
        bash, zsh, fish, powershell, elvish\n\n\
        INSTALLATION:\n  \
        bash: logsift completion --shell bash >> ~/.bashrc\n  \
        zsh:  logsift completion --shell zsh > ~/.zfunc/_logsift\n  \
        fish: logsift completion --shell fish > ~/.config/fish/completions/logsift.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report(args) => {
            let config = args.resolve_config()?;
            init_logging(cli.verbose, config.logging_file.as_deref())?;
            commands::report::execute(&config)
        }
        Commands::Stats {
            file,
            top,
            sort_by,
            min_quality,
        } => {
            init_logging(cli.verbose, None)?;
            let min_quality = min_quality.unwrap_or(RunConfig::default().min_quality);
            commands::stats::execute(&file, top, sort_by, min_quality, cli.format)
        }
        Commands::Completion { shell } => {
            init_logging(cli.verbose, None)?;
            commands::completion::execute(shell, &mut Cli::command())
        }
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::time::ChronoLocal;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("logsift=debug,logsift_cli=debug,logsift_core=debug")
        } else {
            EnvFilter::new("logsift=info,logsift_cli=info,logsift_core=info")
        }
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(ChronoLocal::new("[%Y.%m.%d %H:%M:%S]".to_string()));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open logging file {}", path.display()))?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
