use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "retailseed",
    about = "Populate MongoDB and Cassandra with the same referentially consistent retail dataset",
    version,
    after_help = "Examples:\n  retailseed generate                               # defaults, retailseed.toml if present\n  retailseed generate --workers 20 --seed 42\n  retailseed generate --mongo-uri mongodb://db:27017 --cassandra-host 10.0.0.5:9042 --create-tables\n  retailseed generate --dry-run                     # in-memory sinks, nothing leaves the process\n  retailseed preview --rows 3"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the dataset into both stores
    Generate(GenerateArgs),

    /// Print sample records without touching any store
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Config file (default: ./retailseed.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Worker tasks per stage
    #[arg(long)]
    pub workers: Option<usize>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI")]
    pub mongo_uri: Option<String>,

    /// Cassandra contact point (host:port); repeat for several
    #[arg(long, env = "CASSANDRA_HOST", value_delimiter = ',')]
    pub cassandra_host: Vec<String>,

    /// Create the Cassandra tables if they do not exist
    #[arg(long)]
    pub create_tables: bool,

    /// Write into in-memory sinks instead of the real stores
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Number of sample records to show per entity
    #[arg(long, default_value = "5")]
    pub rows: usize,

    /// Random seed for the sample
    #[arg(long, default_value = "42")]
    pub seed: u64,
}
