//! OpenCourse admin tool
//!
//! Prepares the database and performs administrative resets.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use opencourse_core::{init_database, Config, Repository};

/// OpenCourse catalog database administration
#[derive(Parser)]
#[command(name = "opencourse-core")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the category and course tables (default)
    Migrate,
    /// Delete every category and course
    Reset {
        /// Required to actually delete anything
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!(
        categories = config.store.categories_table(),
        courses = config.store.courses_table(),
        "Using tables"
    );

    // Initialize database
    let pool = init_database(&config.db_path, &config.store).await?;
    let repo = Repository::new(pool, config.store.clone());

    match cli.command.unwrap_or(Command::Migrate) {
        Command::Migrate => {
            tracing::info!("Schema is up to date");
        }
        Command::Reset { yes: false } => {
            tracing::warn!("Refusing to reset without --yes");
        }
        Command::Reset { yes: true } => {
            let courses = repo.courses().clear_courses().await?;
            let categories = repo.categories().clear_categories().await?;
            tracing::info!(courses, categories, "Catalog reset");
        }
    }

    Ok(())
}
