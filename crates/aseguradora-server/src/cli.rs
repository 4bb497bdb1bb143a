use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "aseguradora-server")]
#[command(author, version, about = "Insurance policy CRUD API", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ASEGURADORA_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Storage connection URL (memory:// or redis://host:port/db)
    #[arg(short, long, env = "STORAGE_URL")]
    pub storage_url: Option<String>,

    /// Listen address
    #[arg(short = 'l', long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "PORT")]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}
