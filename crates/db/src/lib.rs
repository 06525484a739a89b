pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod photos;
pub mod repositories;
pub mod snapshot;

pub use connection::{connect, connect_with_config, connect_with_settings, ping, DbPool};
pub use fixtures::{
    DatasetSummary, FixtureError, FixtureIssue, SampleDataset, SeedResult, VerificationResult,
};
pub use photos::{PhotoManifest, PhotoUpdateReport};
pub use repositories::RepositoryError;
pub use snapshot::{load_snapshot, PantrySnapshot};
