pub mod commands;
pub mod logging;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use expireassist_core::config::{AppConfig, LoadOptions};

use crate::commands::inventory::{AddStock, InventoryAction};
use crate::commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "expireassist",
    about = "ExpireAssist pantry CLI",
    long_about = "Track perishable stock, load the sample pantry, and rank meals by how much of each one is already on hand.",
    after_help = "Examples:\n  expireassist seed\n  expireassist recommend --hide-complete --limit 5\n  expireassist inventory add Milk --quantity 2 --bin fridge"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the bundled sample pantry (items, meals, starter stock) idempotently")]
    Seed,
    #[command(about = "Rank every catalog meal against current stock and print the batch")]
    Recommend {
        #[arg(long, help = "Hide meals scoring below this fraction (0.0 to 1.0)")]
        min_score: Option<f64>,
        #[arg(long, help = "Hide meals whose ingredients are all in stock")]
        hide_complete: bool,
        #[arg(long, help = "Show at most this many meals")]
        limit: Option<usize>,
        #[arg(long, help = "Do not persist the generated batch")]
        no_save: bool,
    },
    #[command(about = "List, add, or consume inventory entries")]
    Inventory {
        #[command(subcommand)]
        action: InventoryCommand,
    },
    #[command(about = "Attach item photos from a manifest (defaults to the bundled one)")]
    Photos {
        #[arg(long, help = "Path to a TOML photo manifest")]
        manifest: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and meal catalog readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum InventoryCommand {
    #[command(about = "Show active inventory entries")]
    List,
    #[command(about = "Record newly acquired stock of a catalog item")]
    Add {
        item: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        bin: Option<String>,
        #[arg(long, help = "Purchase cost as a decimal, e.g. 3.49")]
        cost: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    #[command(about = "Mark an inventory entry as consumed")]
    Consume { entry_id: String },
}

impl From<InventoryCommand> for InventoryAction {
    fn from(command: InventoryCommand) -> Self {
        match command {
            InventoryCommand::List => Self::List,
            InventoryCommand::Add { item, quantity, unit, bin, cost, notes } => {
                Self::Add(AddStock { item, quantity, unit, bin, cost, notes })
            }
            InventoryCommand::Consume { entry_id } => Self::Consume { entry_id },
        }
    }
}

pub fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Commands re-load config themselves and report failures as outcomes.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Recommend { min_score, hide_complete, limit, no_save } => {
            commands::recommend::run(RecommendArgs { min_score, hide_complete, limit, no_save })
        }
        Command::Inventory { action } => commands::inventory::run(action.into()),
        Command::Photos { manifest } => commands::photos::run(manifest),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", result.output).context("failed to write command output")?;
    stdout.flush().context("failed to flush command output")?;
    Ok(ExitCode::from(result.exit_code))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command, InventoryCommand};
    use crate::commands::inventory::InventoryAction;

    #[test]
    fn recommend_flags_parse() {
        let cli = Cli::try_parse_from([
            "expireassist",
            "recommend",
            "--min-score",
            "0.5",
            "--hide-complete",
            "--limit",
            "3",
        ])
        .expect("parse");

        match cli.command {
            Command::Recommend { min_score, hide_complete, limit, no_save } => {
                assert_eq!(min_score, Some(0.5));
                assert!(hide_complete);
                assert_eq!(limit, Some(3));
                assert!(!no_save);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn inventory_add_defaults_quantity_to_one() {
        let cli =
            Cli::try_parse_from(["expireassist", "inventory", "add", "Milk", "--bin", "fridge"])
                .expect("parse");

        let Command::Inventory { action } = cli.command else {
            panic!("expected inventory command");
        };
        assert!(matches!(action, InventoryCommand::Add { quantity: 1, .. }));

        match InventoryAction::from(action) {
            InventoryAction::Add(stock) => {
                assert_eq!(stock.item, "Milk");
                assert_eq!(stock.bin.as_deref(), Some("fridge"));
                assert_eq!(stock.cost, None);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn inventory_requires_an_action() {
        assert!(Cli::try_parse_from(["expireassist", "inventory"]).is_err());
    }
}
