use anyhow::Result;
use clap::{Parser, Subcommand};
use pdfcast::web::{AppState, ServerConfig, WebServer, DEFAULT_BIND, DEFAULT_PORT};
use pdfcast::AppConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfcast", version, about = "PDF to podcast and quiz server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Address to bind
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,
    },
    /// Load and validate configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfcast=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port, bind } => {
            let config = AppConfig::load()?;
            config.validate()?;
            let state = AppState::new(&config)?;
            let server = WebServer::new(ServerConfig::default().with_port(port).with_bind(bind));
            server.serve(state).await?;
        }
        Command::CheckConfig => {
            let config = AppConfig::load()?;
            config.validate()?;
            println!("configuration ok: {:?}", config);
        }
    }

    Ok(())
}
