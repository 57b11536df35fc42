//! svcart - service artifact versioning CLI
//!
//! Build scripts call `svcart` to stamp artifacts with their source-control
//! context.
//!
//! ## Commands
//!
//! - `version`: Print the annotated version for a base version
//! - `info`: Show which SCM was detected and its revision
//! - `metadata`: Write the build metadata file for a packaging pass

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use svcart_scm::{
    write_version_metadata, Environment, ResolutionSpan, ScmConfig, ScmContext, ScmResolver,
    VersionMetadata, DEFAULT_METADATA_PATH, METRICS,
};

#[derive(Parser)]
#[command(name = "svcart")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Derive SCM-annotated versions and build metadata for service artifacts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Project directory to probe (default: current directory)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the annotated version for BASE
    Version {
        /// Base version, e.g. 1.2.3
        base: String,
    },

    /// Show the detected SCM and revision
    Info {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Write the build metadata file
    Metadata {
        /// Project (service) name
        #[arg(short, long)]
        name: String,

        /// Base version to annotate
        #[arg(short, long)]
        base: String,

        /// Output file (default: build/version.json under the project directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    svcart_scm::init_tracing(cli.json, level);

    let mut env = Environment::from_process();
    if let Some(dir) = &cli.dir {
        env = env.at(dir);
    }
    let config = ScmConfig::from_env(&env);
    let resolver = ScmResolver::with_defaults(&env, &config);

    let result = match cli.command {
        Commands::Version { base } => cmd_version(&resolver, env.work_dir(), &base),
        Commands::Info { format } => cmd_info(&resolver, env.work_dir(), format),
        Commands::Metadata { name, base, output } => {
            let output = output.unwrap_or_else(|| env.resolve(DEFAULT_METADATA_PATH));
            cmd_metadata(&resolver, &env, &name, &base, &output)
        }
    };

    METRICS.flush();
    result
}

fn resolve<'a>(resolver: &'a ScmResolver, work_dir: &Path) -> &'a ScmContext {
    let _span = ResolutionSpan::enter(work_dir);
    resolver.resolve()
}

fn cmd_version(resolver: &ScmResolver, work_dir: &Path, base: &str) -> Result<()> {
    let context = resolve(resolver, work_dir);
    println!("{}", context.version(base));
    Ok(())
}

fn cmd_info(resolver: &ScmResolver, work_dir: &Path, format: OutputFormat) -> Result<()> {
    let info = resolve(resolver, work_dir).info();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("serialize scm info")?
            );
        }
        OutputFormat::Text => match (&info.kind, &info.handler) {
            (Some(kind), Some(handler)) => {
                println!("scm:      {} ({})", kind, handler);
                println!("revision: {}", info.revision.as_deref().unwrap_or("-"));
            }
            _ => println!("scm:      none"),
        },
    }
    Ok(())
}

fn cmd_metadata(
    resolver: &ScmResolver,
    env: &Environment,
    name: &str,
    base: &str,
    output: &Path,
) -> Result<()> {
    let context = resolve(resolver, env.work_dir());
    let version = context.version(base);
    let metadata = VersionMetadata::build(name, &version, context, env);

    write_version_metadata(output, &metadata)
        .with_context(|| format!("Failed to write metadata for {name}"))?;
    info!(name = %name, version = %version, "metadata ready");
    println!("{}", output.display());
    Ok(())
}
