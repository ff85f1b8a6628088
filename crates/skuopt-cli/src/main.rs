mod history;
mod users;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use skuopt_core::Plan;

#[derive(Debug, Parser)]
#[command(name = "skuopt-cli")]
#[command(about = "SKU Optimizer operations command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database connectivity and schema
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect and adjust user accounts
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Credit maintenance
    Credits {
        #[command(subcommand)]
        command: CreditsCommands,
    },
    /// Generation history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Subcommand)]
enum UsersCommands {
    /// Show plan, balance and trial state
    Show {
        #[arg(long)]
        email: String,
    },
    /// Move a user to a plan and reset their balance to its allowance
    SetPlan {
        #[arg(long)]
        email: String,
        #[arg(long)]
        plan: Plan,
    },
    /// Add (or, with a negative value, remove) credits
    Grant {
        #[arg(long)]
        email: String,
        #[arg(long, allow_hyphen_values = true)]
        credits: i32,
    },
}

#[derive(Debug, Subcommand)]
enum CreditsCommands {
    /// Reset every limited-plan balance to its monthly allowance now
    Refill,
}

#[derive(Debug, Subcommand)]
enum HistoryCommands {
    /// Write a user's full history as CSV
    Export {
        #[arg(long)]
        email: String,
        /// Output path; defaults to the download file name
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("skuopt-cli: run with --help for available commands");
        return Ok(());
    };

    let config = skuopt_core::load_app_config()?;
    let pool_config = skuopt_db::PoolConfig::from_app_config(&config);
    let pool = skuopt_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                skuopt_db::ping(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                skuopt_db::run_migrations(&pool).await?;
                println!("migrations applied");
            }
        },
        Commands::Users { command } => match command {
            UsersCommands::Show { email } => users::run_show(&pool, &config, &email).await?,
            UsersCommands::SetPlan { email, plan } => {
                users::run_set_plan(&pool, &email, plan).await?;
            }
            UsersCommands::Grant { email, credits } => {
                users::run_grant(&pool, &email, credits).await?;
            }
        },
        Commands::Credits {
            command: CreditsCommands::Refill,
        } => {
            let refilled = skuopt_db::refill_monthly_credits(&pool).await?;
            tracing::info!(profiles = refilled, "manual credit refill");
            println!("refilled {refilled} profiles");
        }
        Commands::History {
            command: HistoryCommands::Export { email, out },
        } => history::run_export(&pool, &email, out).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
