use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use wayfarer::config::Config;
use wayfarer::{build_app, cli, db, AppState};

#[derive(Parser, Debug)]
#[command(about = "Location ratings and visit tracking service")]
struct CliArgs {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a user and print their invite code
    CreateUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Seed locations from a JSON file
    ImportLocations {
        #[arg(long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();
    let config = Config::load()?;
    let pool = db::init_pool(&config.database_url).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = AppState::new(pool, config.nearby_strategy);
            let app = build_app(state, config.secure_cookies).await?;

            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            let listener = TcpListener::bind(addr).await?;

            tracing::info!("listening on {}", addr);
            axum::serve(listener, app).await?;
        }
        Command::CreateUser { name, email } => {
            cli::create_user(&pool, &name, email.as_deref()).await?;
        }
        Command::ImportLocations { file } => {
            cli::import_locations(&pool, &file).await?;
        }
    }

    Ok(())
}
