mod config;
mod plan_cmd;
mod serve_cmd;
mod task_cmds;
#[cfg(test)]
mod test_util;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use sqlx::SqlitePool;

use studyplan_db::pool;

use config::StudyplanConfig;

#[derive(Parser)]
#[command(name = "studyplan", about = "Study-task tracker and daily planner")]
struct Cli {
    /// Database URL (overrides STUDYPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a studyplan config file
    Init {
        /// SQLite connection URL (defaults to a file in the platform data dir)
        #[arg(long)]
        db_url: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database file and run migrations
    DbInit,
    /// Serve the JSON API over HTTP
    Serve {
        /// Address to bind (default from config, else 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default from config, else 5000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Show total, completed, and pending task counts
    Stats,
    /// Generate a time-boxed plan from pending tasks
    Plan {
        /// Minutes available (default 180)
        #[arg(long)]
        minutes: Option<i64>,
        /// Plan date as YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task from explicit fields
    Add {
        /// Task title
        #[arg(long)]
        title: String,
        /// Subject (default General)
        #[arg(long)]
        subject: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Deadline as YYYY-MM-DD
        #[arg(long)]
        deadline: Option<String>,
        /// Estimated minutes (default 60)
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Add a task from free text, e.g. "Physics homework on 2025-11-22 2 hours"
    AddText {
        /// Text to parse
        text: String,
    },
    /// List tasks ordered by deadline
    List {
        /// Only show tasks that are not completed
        #[arg(long)]
        pending: bool,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: i64,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },
}

/// Execute the `studyplan init` command: write config file.
fn cmd_init(db_url: Option<String>, force: bool) -> Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let db_url = db_url.unwrap_or_else(studyplan_db::config::DbConfig::default_url);
    let cfg = config::ConfigFile {
        database: config::DatabaseSection { url: db_url.clone() },
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!();
    println!("Next: run `studyplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `studyplan db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &StudyplanConfig) -> Result<()> {
    println!("Initializing studyplan database...");

    let db_pool = open_pool(resolved).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("studyplan db-init complete.");
    Ok(())
}

/// Create the database if needed, connect, and apply pending migrations.
async fn open_pool(resolved: &StudyplanConfig) -> Result<SqlitePool> {
    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;
    Ok(db_pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(db_url, force)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "studyplan",
                &mut std::io::stdout(),
            );
        }
        Commands::DbInit => {
            let resolved = StudyplanConfig::resolve(cli.database_url.as_deref())?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = StudyplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = open_pool(&resolved).await?;
            let bind = bind.unwrap_or_else(|| resolved.bind.clone());
            let port = port.unwrap_or(resolved.port);
            let result = serve_cmd::run_serve(db_pool.clone(), &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Task { command } => {
            let resolved = StudyplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = open_pool(&resolved).await?;
            let result = task_cmds::run_task_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Stats => {
            let resolved = StudyplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = open_pool(&resolved).await?;
            let result = task_cmds::run_stats(&db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { minutes, date } => {
            let resolved = StudyplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = open_pool(&resolved).await?;
            let result = plan_cmd::run_plan(&db_pool, minutes, date).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
