use expireassist_core::config::{ConfigOverrides, LoadOptions, RecommendationsConfig};
use expireassist_core::domain::recommendation::RecommendationBatch;
use expireassist_core::recommendations::{RecommendationEngine, RecommendationFilter};
use expireassist_db::load_snapshot;
use expireassist_db::repositories::{RecommendationRepository, SqlRecommendationRepository};
use tracing::info;

use crate::commands::{load_config, repository_failure, with_database, CommandResult, Failure};

/// Flags layered over the `[recommendations]` config section.
#[derive(Clone, Debug, Default)]
pub struct RecommendArgs {
    pub min_score: Option<f64>,
    pub hide_complete: bool,
    pub limit: Option<usize>,
    pub no_save: bool,
}

impl RecommendArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            min_score: self.min_score,
            hide_complete: self.hide_complete.then_some(true),
            max_results: self.limit,
            ..ConfigOverrides::default()
        }
    }
}

pub fn run(args: RecommendArgs) -> CommandResult {
    let options = LoadOptions { overrides: args.overrides(), ..LoadOptions::default() };
    let config = match load_config("recommend", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let engine = RecommendationEngine::with_tie_break(config.recommendations.tie_break);
    let filter = display_filter(&config.recommendations);
    let persist = !args.no_save;

    let result = with_database("recommend", &config, |pool| async move {
        let snapshot = load_snapshot(&pool).await.map_err(repository_failure)?;
        let batch = engine.generate_recommendations(&snapshot.inventory, &snapshot.catalog);

        if persist {
            SqlRecommendationRepository::new(pool.clone())
                .save_batch(&batch)
                .await
                .map_err(repository_failure)?;
        }

        info!(
            event_name = "cli.recommend.generated",
            batch_id = %batch.id.0,
            scored = batch.recommendations.len(),
            rejected = batch.rejected.len(),
            persisted = persist,
            "recommendations generated"
        );
        Ok::<RecommendationBatch, Failure>(batch)
    });

    match result {
        Ok(batch) => {
            let scored = batch.recommendations.len();
            let shown = filter.apply(batch);
            CommandResult::success_with_data("recommend", summary_line(&shown, scored), &shown)
        }
        Err(result) => result,
    }
}

fn display_filter(config: &RecommendationsConfig) -> RecommendationFilter {
    RecommendationFilter {
        min_score: config.min_score,
        hide_complete: config.hide_complete,
        max_results: config.max_results,
    }
}

fn summary_line(shown: &RecommendationBatch, scored: usize) -> String {
    let mut line = format!(
        "{} of {scored} meals shown, {} ready to cook",
        shown.recommendations.len(),
        shown.complete_count()
    );
    if !shown.rejected.is_empty() {
        line.push_str(&format!(", {} rejected", shown.rejected.len()));
    }
    line
}
