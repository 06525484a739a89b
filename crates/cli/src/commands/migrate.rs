use expireassist_core::config::LoadOptions;
use tracing::info;

use crate::commands::{load_config, with_database, CommandResult, Failure};

pub fn run() -> CommandResult {
    let config = match load_config("migrate", LoadOptions::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let result = with_database("migrate", &config, |_pool| async {
        info!(event_name = "cli.migrate.applied", "pending migrations applied");
        Ok::<(), Failure>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(result) => result,
    }
}
