//! pepsite CLI tool
//!
//! Command-line interface for compiling a proposal corpus into a static site.
//!
//! ## Commands
//!
//! - `build [path]`: Compile the corpus and write the output tree
//! - `check [path]`: Compile the corpus without writing anything
//! - `config`: Print the effective configuration as TOML
//!
//! ## Configuration Precedence
//!
//! Defaults, then the `--config` file, then the `PEPSITE_BASE_URL` and `SOURCE_DATE_EPOCH`
//! environment variables, then command line flags.
//!
//! ## Exit Status
//!
//! - `0`: every document published without warnings
//! - `1`: the build was aborted (corpus errors, invalid configuration, I/O failure)
//! - `2`: the site was published, but some documents have warnings or were skipped

use clap::{Args, Parser, Subcommand};
use pepsite::{
    codec::BuildSummary, compiler::SiteCompiler, config::BuildConfig, SiteError,
};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "pepsite")]
#[command(author, version, about = "Compile proposal documents into a static site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct BuildArgs {
    /// Source directory containing the documents (overrides the config file)
    path: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL for sitemap and canonical URLs (e.g., <https://peps.example.org>)
    /// Can also be set via PEPSITE_BASE_URL environment variable
    #[arg(long)]
    base_url: Option<String>,

    /// Number of worker threads (default: available cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Remove the output directory before writing
    #[arg(long)]
    clean: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the corpus and write the site
    Build(BuildArgs),

    /// Compile the corpus and report problems without writing any output
    Check(BuildArgs),

    /// Print the effective configuration
    Config(BuildArgs),
}

impl BuildArgs {
    fn resolve(&self) -> Result<BuildConfig, SiteError> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::from_file(path)?,
            None => BuildConfig::default(),
        };
        config.apply_env()?;
        if let Some(path) = &self.path {
            config.source_dir = path.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if self.clean {
            config.clean = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report_failure(error: &SiteError) -> ExitCode {
    eprintln!("Error: {error}");
    for corpus_error in error.corpus_errors() {
        eprintln!("  - {corpus_error}");
    }
    ExitCode::from(1)
}

fn report_summary(summary: &BuildSummary) -> ExitCode {
    println!("\n=== Build Results ===");
    print!("{summary}");
    ExitCode::from(summary.status().exit_code())
}

fn run(command: Commands) -> Result<ExitCode, SiteError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match command {
        Commands::Build(args) => {
            let compiler = SiteCompiler::new(args.resolve()?)?;
            if args.verbose {
                println!(
                    "Building {:?} into {:?}",
                    compiler.config().source_dir,
                    compiler.config().output_dir
                );
            }
            let summary = runtime.block_on(compiler.build())?;
            Ok(report_summary(&summary))
        }

        Commands::Check(args) => {
            let compiler = SiteCompiler::new(args.resolve()?)?;
            let summary = runtime.block_on(async {
                let paths = compiler.discover()?;
                let corpus = compiler.load_sources(paths).await;
                Ok::<BuildSummary, SiteError>(compiler.compile(corpus)?.summary)
            })?;
            Ok(report_summary(&summary))
        }

        Commands::Config(args) => {
            print!("{}", args.resolve()?.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Commands::Build(args) | Commands::Check(args) | Commands::Config(args) => args.verbose,
    };
    init_tracing(verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(error) => report_failure(&error),
    }
}
