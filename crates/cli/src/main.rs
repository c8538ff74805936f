use std::path::PathBuf;

use anyhow::Context;
use bookshelf_app::{app, Application};
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookshelf catalog service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    /// Deployment environment (local, staging, production)
    #[arg(long, env = "BOOKSHELF_ENV", default_value = "local", global = true)]
    env: String,

    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, env = "BOOKSHELF_CONFIG_DIR", default_value = "config", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve HTTP until interrupted (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Allow missing `.env` files without failing.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config_dir, &cli.env)
        .with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!(env = ?settings.environment, "starting bookshelf server");
            let application = Application::bootstrap(settings).await?;
            application.serve(bookshelf_http::shutdown_signal()).await
        }
        Command::Migrate => {
            let applied = app::migrate(&settings).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
    }
}
