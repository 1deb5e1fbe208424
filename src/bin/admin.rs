//! CLI administration tool for linkrelay.
//!
//! Inspects and repairs the analytics backlog and checks the database
//! without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Number of access events waiting in the fallback queue
//! cargo run --bin admin -- backlog status
//!
//! # Run one reconciliation pass against the broker
//! cargo run --bin admin -- backlog drain
//!
//! # Drop every queued event (asks for confirmation)
//! cargo run --bin admin -- backlog purge
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see `linkrelay::config`). `backlog` commands need
//! Redis; `backlog drain` also needs RabbitMQ.

use linkrelay::application::workers::{BacklogReconciler, DrainStatus, SkipReason};
use linkrelay::config::{self, Config, mask_connection_string};
use linkrelay::infrastructure::broker::{AmqpBroker, EventBroker};
use linkrelay::infrastructure::cache::RedisCache;
use linkrelay::infrastructure::queue::{FallbackQueue, RedisFallbackQueue};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// CLI tool for managing linkrelay.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Inspect or drain the analytics fallback queue
    Backlog {
        #[command(subcommand)]
        action: BacklogAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Fallback queue subcommands.
#[derive(Subcommand)]
enum BacklogAction {
    /// Show how many events are queued
    Status,

    /// Re-publish queued events to the broker once
    Drain,

    /// Delete every queued event
    Purge {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection and count live links
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    match cli.command {
        Commands::Backlog { action } => handle_backlog_action(action, &config).await?,
        Commands::Db { action } => handle_db_action(action, &config).await?,
    }

    Ok(())
}

/// Dispatches fallback queue commands.
async fn handle_backlog_action(action: BacklogAction, config: &Config) -> Result<()> {
    let queue = connect_queue(config).await?;

    match action {
        BacklogAction::Status => backlog_status(&queue).await?,
        BacklogAction::Drain => drain_backlog(queue, config).await?,
        BacklogAction::Purge { yes } => purge_backlog(&queue, yes).await?,
    }

    Ok(())
}

async fn connect_queue(config: &Config) -> Result<RedisFallbackQueue> {
    let redis_url = config
        .redis_url
        .as_deref()
        .context("REDIS_URL or REDIS_HOST must be set for backlog commands")?;

    let cache = RedisCache::connect(redis_url, Duration::from_secs(config.cache_ttl_seconds))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {}", e))?;

    Ok(cache.fallback_queue(config.fallback_queue_key.clone()))
}

async fn backlog_status(queue: &RedisFallbackQueue) -> Result<()> {
    println!("{}", "📦 Analytics Backlog".bright_blue().bold());
    println!();

    let len = queue
        .len()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read queue length: {}", e))?;

    let count = if len == 0 {
        len.to_string().bright_green().bold()
    } else {
        len.to_string().bright_yellow().bold()
    };

    println!("  Key:    {}", queue.key().cyan());
    println!("  Queued: {}", count);
    println!();

    Ok(())
}

/// Runs a single reconciliation pass and prints what happened.
///
/// The pass stops at the first publish failure; the failed event stays at
/// the head of the queue for the next pass.
async fn drain_backlog(queue: RedisFallbackQueue, config: &Config) -> Result<()> {
    println!("{}", "🔁 Draining backlog...".bright_blue().bold());
    println!();

    let rabbitmq_url = config
        .rabbitmq_url
        .as_deref()
        .context("RABBITMQ_URL or RABBITMQ_HOST must be set to drain the backlog")?;

    println!("  Broker: {}", mask_connection_string(rabbitmq_url).bright_black());

    let broker: Arc<dyn EventBroker> = Arc::new(AmqpBroker::new(
        rabbitmq_url,
        config.analytics_exchange.clone(),
    ));

    let reconciler = BacklogReconciler::new(
        Arc::new(queue),
        Some(broker),
        config.analytics_exchange.clone(),
        config.publish_timeout(),
    );

    let report = reconciler.drain_once().await;

    let status = match report.status {
        DrainStatus::Empty => "EMPTY".green(),
        DrainStatus::Completed => "COMPLETED".green(),
        DrainStatus::Halted => "HALTED".yellow(),
        DrainStatus::QueueUnavailable => "QUEUE UNAVAILABLE".red(),
        DrainStatus::Skipped(SkipReason::BrokerUnavailable) => "BROKER UNAVAILABLE".red(),
        DrainStatus::Skipped(SkipReason::AlreadyRunning) => "ALREADY RUNNING".yellow(),
    };

    println!("  Status:    {}", status.bold());
    println!(
        "  Published: {}",
        report.published.to_string().bright_green().bold()
    );
    println!(
        "  Requeued:  {}",
        report.requeued.to_string().bright_yellow().bold()
    );
    println!(
        "  Discarded: {}",
        report.discarded.to_string().bright_red().bold()
    );
    println!("  Lost:      {}", report.lost.to_string().bright_red().bold());
    println!();

    Ok(())
}

async fn purge_backlog(queue: &RedisFallbackQueue, skip_confirm: bool) -> Result<()> {
    println!("{}", "🗑️  Purge Backlog".bright_blue().bold());
    println!();

    let len = queue
        .len()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read queue length: {}", e))?;

    if len == 0 {
        println!("{}", "  Nothing to purge".yellow());
        return Ok(());
    }

    println!("  Key:    {}", queue.key().cyan());
    println!("  Queued: {}", len.to_string().bright_yellow().bold());
    println!();
    println!(
        "{}",
        "⚠️  Purged events are lost; their accesses will never be counted."
            .red()
            .bold()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete every queued event?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    queue
        .clear()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to purge queue: {}", e))?;

    println!("{}", "✅ Backlog purged".green().bold());
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, config: &Config) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());
            println!(
                "  {}",
                mask_connection_string(&config.database_url).bright_black()
            );

            let pool = PgPool::connect(&config.database_url)
                .await
                .context("Failed to connect to database")?;

            sqlx::query("SELECT 1").fetch_one(&pool).await?;

            let live_links: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM short_links WHERE deleted_at IS NULL")
                    .fetch_one(&pool)
                    .await?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!(
                "  Live links: {}",
                live_links.to_string().bright_green().bold()
            );
            println!();
        }
    }

    Ok(())
}
