use std::path::PathBuf;

use expireassist_core::config::LoadOptions;
use expireassist_db::repositories::SqlItemRepository;
use expireassist_db::{PhotoManifest, PhotoUpdateReport};
use tracing::info;

use crate::commands::{load_config, repository_failure, with_database, CommandResult, Failure};

/// Apply `manifest` (or the bundled one) to the item catalog.
pub fn run(manifest: Option<PathBuf>) -> CommandResult {
    let config = match load_config("photos", LoadOptions::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let manifest = match manifest {
        Some(path) => PhotoManifest::from_path(&path),
        None => PhotoManifest::bundled(),
    };
    let manifest = match manifest {
        Ok(manifest) => manifest,
        Err(error) => {
            return CommandResult::failure("photos", "photo_manifest", error.to_string(), 6);
        }
    };

    let result = with_database("photos", &config, |pool| async move {
        let report =
            manifest.apply(&SqlItemRepository::new(pool)).await.map_err(repository_failure)?;
        info!(
            event_name = "cli.photos.applied",
            updated = report.updated.len(),
            unknown = report.unknown.len(),
            "photo manifest applied"
        );
        Ok::<PhotoUpdateReport, Failure>(report)
    });

    match result {
        Ok(report) => CommandResult::success_with_data(
            "photos",
            format!(
                "{} item photos updated, {} unknown items",
                report.updated.len(),
                report.unknown.len()
            ),
            &report,
        ),
        Err(result) => result,
    }
}
