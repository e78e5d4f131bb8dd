use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use steel_erp_api::{config, db, migrator::Migrator};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "migration", about = "Manage the steel-erp-api database schema")]
struct Cli {
    /// Database URL; defaults to DATABASE_URL, then to the application config
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        /// Apply at most this many migrations
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// List applied and pending migrations
    Status,
    /// Drop every table then apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing("info", false);

    let database_url = match cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
    {
        Some(url) => url,
        None => config::load_config()
            .context("no --database-url or DATABASE_URL and the application config did not load")?
            .database_url,
    };

    let pool = db::establish_connection(&database_url)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&pool, steps).await.context("migration failed")?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps))
                .await
                .context("rollback failed")?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => {
            let (applied, pending) = db::migration_status(&pool).await?;
            for name in &applied {
                println!("applied  {}", name);
            }
            for name in &pending {
                println!("pending  {}", name);
            }
            println!(
                "{} applied, {} pending",
                applied.len(),
                pending.len()
            );
        }
        Command::Fresh => {
            Migrator::fresh(&pool).await.context("fresh migration failed")?;
            info!("Schema recreated");
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
