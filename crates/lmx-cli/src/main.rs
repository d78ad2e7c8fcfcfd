use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lmx")]
#[command(about = "Directory -> MARC 21 authority sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, diff against the stored snapshot, write MARCXML, rotate the snapshot
    Sync {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Map every fetched record even when a snapshot exists
        #[arg(long, default_value_t = false)]
        full: bool,

        /// Write the run report here (overrides output.report_path)
        #[arg(long)]
        report: Option<String>,

        /// Fail instead of warn when the config has keys nothing reads
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// One-shot fetch to MARCXML and/or raw JSON. No snapshot involved.
    Export {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// MARCXML base path (defaults to output.full_path when no --json is given)
        #[arg(long)]
        xml: Option<String>,

        /// Raw JSON dump of the fetched records
        #[arg(long)]
        json: Option<String>,

        /// Records per MARCXML document; <= 0 writes a single file
        #[arg(long, allow_hyphen_values = true)]
        chunk_size: Option<i64>,
    },

    /// Reconcile two snapshot files offline and print the differences
    Diff {
        #[arg(long)]
        current: String,

        #[arg(long)]
        previous: String,

        /// Key attribute
        #[arg(long, default_value = lmx_schemas::DEFAULT_KEY_ATTRIBUTE)]
        key: String,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Sync {
            config_paths,
            full,
            report,
            strict,
        } => commands::sync::run(&config_paths, full, report.as_deref(), strict).await?,

        Commands::Export {
            config_paths,
            xml,
            json,
            chunk_size,
        } => {
            commands::export::run(&config_paths, xml.as_deref(), json.as_deref(), chunk_size)
                .await?
        }

        Commands::Diff {
            current,
            previous,
            key,
        } => commands::diff::run(&current, &previous, &key)?,

        Commands::ConfigHash { paths } => {
            let loaded = commands::load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
