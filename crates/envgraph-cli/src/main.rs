use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "envgraph",
    about = "envgraph — plan and provision multi-tenant cloud environments",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print the build order for an environment (dry run)
    Plan {
        /// Environment: unstable, staging or production
        #[arg(short, long)]
        env: String,
        /// Comma-separated tenant ids; overrides the config file's list
        #[arg(short, long, value_delimiter = ',')]
        tenants: Option<Vec<String>>,
        /// Path to envgraph.toml (default: ./envgraph.toml when present)
        #[arg(short, long)]
        config: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Plan, then provision through the simulated backend
    Apply {
        #[arg(short, long)]
        env: String,
        #[arg(short, long, value_delimiter = ',')]
        tenants: Option<Vec<String>>,
        #[arg(short, long)]
        config: Option<String>,
        /// Backend state file
        #[arg(short, long, default_value = "envgraph-state.json")]
        state: String,
    },
    /// Write a scaffold envgraph.toml
    Init {
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Product name used in resource names
        #[arg(long, default_value = "api")]
        name: String,
        /// Apex domain environments and tenants are served under
        #[arg(long, default_value = "example.io")]
        domain: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("envgraph=info".parse()?);
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    match cli.command {
        Commands::Plan {
            env,
            tenants,
            config,
            format,
        } => commands::plan::plan(&env, tenants, config.as_deref(), &format),
        Commands::Apply {
            env,
            tenants,
            config,
            state,
        } => commands::apply::apply(&env, tenants, config.as_deref(), &state),
        Commands::Init { path, name, domain } => commands::init::init(&path, &name, &domain),
    }
}
