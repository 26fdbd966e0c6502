use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use fin_manager::database::db::{connection, migrate};
use fin_manager::{backend, logging, AppConfig, AppState};

#[derive(Debug, Parser)]
#[command(name = "fin-manager", version, about = "Personal finance tracking backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (the default).
    Serve {
        /// Apply pending migrations before accepting requests.
        #[arg(long)]
        migrate: bool,

        /// Overrides BIND_ADDR.
        #[arg(long, env = "BIND_ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Apply pending migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    logging::init_tracing(config.log_format);

    let pool = connection::get_db_pool(&config).await?;

    match cli.command.unwrap_or(Command::Serve {
        migrate: false,
        bind: None,
    }) {
        Command::Migrate => migrate::run_migrations(&pool).await?,
        Command::Serve { migrate, bind } => {
            if migrate {
                migrate::run_migrations(&pool).await?;
            }
            let addr = bind.unwrap_or(config.bind_addr);
            let state = AppState::new(pool, config.session_ttl);
            backend::run_server(state, addr).await?;
        }
    }
    Ok(())
}
