use expireassist_core::config::LoadOptions;
use expireassist_db::{DatasetSummary, SampleDataset};
use tracing::{info, warn};

use crate::commands::{load_config, with_database, CommandResult, Failure};

pub fn run() -> CommandResult {
    let config = match load_config("seed", LoadOptions::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let dataset = match SampleDataset::bundled() {
        Ok(dataset) => dataset,
        Err(error) => {
            return CommandResult::failure("seed", "seed_fixture", error.to_string(), 6);
        }
    };

    let result = with_database("seed", &config, |pool| async move {
        let seed_result = dataset
            .load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        for issue in &seed_result.issues {
            warn!(
                event_name = "cli.seed.skipped_record",
                record = %issue.record,
                problem = %issue.problem,
                "sample record skipped"
            );
        }

        let verification = dataset
            .verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        if !verification.all_present {
            return Err(("seed_verification", verification_message(&verification.checks), 6));
        }

        let summary = SampleDataset::summary(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        info!(
            event_name = "cli.seed.completed",
            items_inserted = seed_result.items_inserted,
            meals_saved = seed_result.meals_saved,
            inventory_added = seed_result.inventory_added,
            "sample pantry loaded"
        );
        Ok::<DatasetSummary, Failure>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success_with_data(
            "seed",
            format!(
                "sample pantry loaded: {} items, {} meals ({} meal items), {} inventory entries",
                summary.items, summary.meals, summary.meal_items, summary.inventory
            ),
            &summary,
        ),
        Err(result) => result,
    }
}

fn verification_message(checks: &[(String, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
