/// Exercise catalog server and maintenance commands

use anyhow::Result;
use clap::{Parser, Subcommand};
use exercise_catalog::{
    api::auth::UserStore,
    config::Config,
    db::DatabaseManager,
    i18n,
    server::{init_tracing, start_server},
    CatalogStorage,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Exercise catalog - multilingual exercise database", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Write category, muscle and equipment names to a gettext template
    #[command(name = "extract-i18n")]
    ExtractI18n {
        /// Output file
        #[arg(default_value = "i18n.pot")]
        path: PathBuf,
    },
    /// Create or update an API user
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Value of the `Authorization: Token <token>` header
        #[arg(long)]
        token: String,
        /// Granted permission, e.g. exercises.change_exercise (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    // Configuration comes from CATALOG_* environment variables
    let config = Config::default();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => start_server(config).await?,
        Commands::ExtractI18n { path } => {
            let db = DatabaseManager::connect(&config.database, &config.default_language).await?;
            let written = i18n::extract(&CatalogStorage::new(db.pool()), &path).await?;
            println!("Wrote {} strings to {}", written, path.display());
        }
        Commands::CreateUser {
            username,
            email,
            token,
            permissions,
        } => {
            let db = DatabaseManager::connect(&config.database, &config.default_language).await?;
            let id = UserStore::new(db.pool()).upsert(&username, &email, &token, &permissions).await?;
            println!("User {} stored with id {}", username, id);
        }
    }

    Ok(())
}
