use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod prompt;
mod signal;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Staged cloud provisioning pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: stacks, wiring, smoke test
    Up {
        /// Path to the pipeline config (defaults to the user config dir)
        #[arg(short, long)]
        config: Option<String>,

        /// Rehearse against an in-memory cloud without real calls
        #[arg(long)]
        dry_run: bool,

        /// Keep going past failed stacks instead of halting
        #[arg(long)]
        keep_going: bool,
    },

    /// Deploy a single stack and wait for it to settle
    Deploy {
        /// Stack name
        name: String,

        /// Template URL
        template_url: String,

        /// Capability tokens (e.g. CAPABILITY_IAM)
        #[arg(short = 'c', long = "capability")]
        capabilities: Vec<String>,

        /// Target region
        #[arg(short, long, default_value = "us-east-1")]
        region: String,
    },

    /// Print the artifact bucket policy for the given identifiers
    Policy {
        /// Artifact bucket name
        bucket: String,

        /// Account id owning the resources
        #[arg(short, long)]
        account: String,

        /// Hosting application id
        #[arg(long)]
        app: String,

        /// Target region
        #[arg(short, long, default_value = "us-east-1")]
        region: String,
    },

    /// Wire the artifact bucket to the deployment function
    Wire {
        /// Artifact bucket name
        bucket: String,

        /// Deployment function name
        #[arg(short, long)]
        function: String,

        /// Invocation ARN of the deployment function
        #[arg(long)]
        arn: String,

        /// Account id owning the resources
        #[arg(short, long)]
        account: String,

        /// Hosting application id
        #[arg(long)]
        app: String,

        /// Target region
        #[arg(short, long, default_value = "us-east-1")]
        region: String,
    },

    /// Upload a file to the artifact bucket
    Upload {
        /// Artifact bucket name
        bucket: String,

        /// Local file to upload
        file: String,

        /// Object key
        #[arg(short, long, default_value = strata_core::ARTIFACT_KEY)]
        key: String,

        /// Target region
        #[arg(short, long, default_value = "us-east-1")]
        region: String,
    },

    /// Write a starter config file
    Init {
        /// Where to write it (defaults to the user config dir)
        #[arg(short, long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Up { config, dry_run, keep_going } => {
            commands::up::up(config.as_deref(), dry_run, keep_going).await?;
        }

        Commands::Deploy { name, template_url, capabilities, region } => {
            commands::deploy::deploy(&name, &template_url, &capabilities, &region).await?;
        }

        Commands::Policy { bucket, account, app, region } => {
            commands::policy::policy(&bucket, &account, &app, &region)?;
        }

        Commands::Wire { bucket, function, arn, account, app, region } => {
            commands::wire::wire(&bucket, &function, &arn, &account, &app, &region).await?;
        }

        Commands::Upload { bucket, file, key, region } => {
            commands::upload::upload(&bucket, &key, &file, &region).await?;
        }

        Commands::Init { path } => {
            commands::init::init(path.as_deref())?;
        }
    }

    Ok(())
}
