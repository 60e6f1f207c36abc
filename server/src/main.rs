use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use bookman_core::{install, Config, Database, InstallOptions, PasswordPolicy};

#[derive(Parser)]
#[command(name = "bookman")]
#[command(about = "Book catalog administration server", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "BOOKMAN_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the admin screens over HTTP
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Create the database and the admin account
    Install {
        #[arg(long, default_value = "admin")]
        admin_username: String,

        #[arg(long, env = "BOOKMAN_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: String,

        #[arg(long)]
        admin_email: Option<String>,

        /// Also add three sample books to an empty catalog
        #[arg(long)]
        with_samples: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    bookman_core::init_logging();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            bookman_lib::serve(config).await
        }
        Commands::Install {
            admin_username,
            admin_password,
            admin_email,
            with_samples,
        } => {
            if admin_password.is_empty() {
                bail!("--admin-password must not be empty");
            }

            let db = Database::open(&config.database_path)?;
            let options = InstallOptions {
                admin_username,
                admin_password,
                admin_email,
                with_samples,
            };
            let report = install(&db, &options, &PasswordPolicy::default())?;

            println!("Database: {}", config.database_path.display());
            if report.created_admin {
                println!("Created user '{}'", options.admin_username);
            } else {
                println!("User '{}' already exists; password unchanged", options.admin_username);
            }
            if report.samples_added > 0 {
                println!("Added {} sample books", report.samples_added);
            }
            Ok(())
        }
    }
}
