use crate::cli::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wetbulb-monitor")]
#[command(about = "Ranks weather stations by wet-bulb temperature and keeps the history in SQLite")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        env = "WETBULB_CONFIG",
        help = "Configuration file [default: ./wetbulb.toml if present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "SQLite database path")]
    pub database: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, rank and store on a fixed interval until interrupted
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,

        #[arg(short, long, help = "Seconds between runs [default: 3600]")]
        interval_secs: Option<u64>,
    },

    /// Perform a single pipeline run and exit
    Once {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Create or upgrade the database schema and exit
    Migrate,

    /// Serve stored observations over HTTP
    Serve {
        #[arg(short, long, help = "Address to bind [default: 127.0.0.1:5000]")]
        bind: Option<SocketAddr>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    #[arg(short = 'k', long, help = "Number of stations kept per run [default: 50]")]
    pub top_k: Option<usize>,

    #[arg(short, long, help = "Station reference CSV (stationId,latitude,longitude)")]
    pub stations: Option<PathBuf>,

    #[arg(long, help = "Provider base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Name of the CSV inside the provider archive")]
    pub expected_entry: Option<String>,

    #[arg(long, help = "HTTP timeout in seconds [default: 30]")]
    pub fetch_timeout_secs: Option<u64>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            database_path: self.database.clone(),
            log_file: self.log_file.clone(),
            log_level: self.verbose.then(|| "debug".to_string()),
            ..Default::default()
        };

        match &self.command {
            Commands::Run {
                pipeline,
                interval_secs,
            } => {
                pipeline.apply(&mut overrides);
                overrides.interval_secs = *interval_secs;
            }
            Commands::Once { pipeline } => pipeline.apply(&mut overrides),
            Commands::Migrate => {}
            Commands::Serve { bind } => overrides.bind = *bind,
        }

        overrides
    }
}

impl PipelineArgs {
    fn apply(&self, overrides: &mut ConfigOverrides) {
        overrides.top_k = self.top_k;
        overrides.stations_path = self.stations.clone();
        overrides.base_url = self.base_url.clone();
        overrides.expected_entry = self.expected_entry.clone();
        overrides.fetch_timeout_secs = self.fetch_timeout_secs;
    }
}
