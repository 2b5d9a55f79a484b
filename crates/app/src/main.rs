use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use shopfront_app::{AppConfig, Storefront, replay};
use shopfront_infra::migrations::{self, Migrator};

#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(version)]
#[command(about = "Storefront record store with low-stock and new-order notifications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Replay a JSON mutation script and print the notifications it produced
    Replay {
        /// Path to a JSON array of create/update/delete steps
        script: PathBuf,
    },
    /// List the schema migrations and whether each is applied
    Migrations,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    shopfront_observability::init(&config.log);

    match cli.command {
        Command::Replay { script } => replay_script(&config, &script),
        Command::Migrations => list_migrations(&config),
    }
}

/// Replay a mutation script and print every notification write as a JSON line.
fn replay_script(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let script = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let steps = replay::parse_script(&script)?;

    let app = Storefront::build(config.notifications.clone())?;
    let feed = app.subscribe();

    let report = replay::run(app.store().as_ref(), &steps)?;
    info!(
        created = report.created,
        updated = report.updated,
        deleted = report.deleted,
        "replay finished"
    );

    let mut out = std::io::stdout().lock();
    for event in feed.drain() {
        if event.collection() != config.notifications.notifications_collection {
            continue;
        }
        let line = json!({
            "event": event.event_type(),
            "at": event.occurred_at(),
            "record": event.record(),
        });
        writeln!(out, "{line}")?;
    }

    let counts = app.inbox().count_by_type()?;
    writeln!(out, "{}", json!({ "summary": counts }))?;
    Ok(())
}

fn list_migrations(config: &AppConfig) -> anyhow::Result<()> {
    let app = Storefront::build(config.notifications.clone())?;
    let migrator = Migrator::new(migrations::all()?);
    let applied = migrator.applied(app.store().inner())?;

    let mut out = std::io::stdout().lock();
    for m in migrator.migrations() {
        let line = json!({
            "id": m.id(),
            "description": m.description(),
            "applied": applied.iter().any(|a| a == m.id()),
        });
        writeln!(out, "{line}")?;
    }
    Ok(())
}
