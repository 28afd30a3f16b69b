use clap::{Parser, Subcommand};
use gomoku_server::config::{ServerConfig, DEFAULT_CONFIG_PATH};
use gomoku_server::logic::ForbiddenPolicy;
use gomoku_server::network::client::NetworkClient;
use gomoku_server::network::server::start_server;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Two-player Gomoku over TCP
#[derive(Parser, Debug)]
#[command(name = "gomoku", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the match server
    Server {
        /// JSON config file (optional)
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Address to bind, overrides the config file
        #[arg(long)]
        addr: Option<String>,

        /// Board dimension, overrides the config file
        #[arg(long)]
        board_size: Option<usize>,

        /// Forbidden-move policy, overrides the config file
        #[arg(long, value_enum)]
        policy: Option<ForbiddenPolicy>,
    },

    /// Connect to a server from the terminal
    Client {
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Server {
            config,
            addr,
            board_size,
            policy,
        } => {
            let mut server_config = ServerConfig::load_or_default(&config)?;
            if let Some(addr) = addr {
                server_config.addr = addr;
            }
            if let Some(size) = board_size {
                server_config.board_size = size;
            }
            if let Some(policy) = policy {
                server_config.forbidden_policy = policy;
            }
            start_server(server_config).await
        }
        Command::Client { addr } => {
            let client = NetworkClient::connect(&addr).await?;
            client.run().await
        }
    }
}
