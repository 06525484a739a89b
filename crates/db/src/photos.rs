use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use expireassist_core::domain::item::ItemName;

use crate::fixtures::FixtureError;
use crate::repositories::{ItemRepository, RepositoryError};

/// Item photo references, one `[[photos]]` table per item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoManifest {
    #[serde(default)]
    pub photos: Vec<PhotoEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoEntry {
    pub item: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PhotoUpdateReport {
    pub updated: Vec<String>,
    pub unknown: Vec<String>,
}

impl PhotoManifest {
    pub const TOML: &'static str = include_str!("../../../config/fixtures/photo_manifest.toml");

    pub fn bundled() -> Result<Self, FixtureError> {
        Self::parse(Self::TOML)
    }

    pub fn parse(raw: &str) -> Result<Self, FixtureError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| FixtureError::Read { path: path.display().to_string(), source })?;
        Self::parse(&raw)
    }

    pub async fn apply<R>(&self, items: &R) -> Result<PhotoUpdateReport, RepositoryError>
    where
        R: ItemRepository + ?Sized,
    {
        let mut report = PhotoUpdateReport::default();

        for entry in &self.photos {
            let name = ItemName::from(entry.item.as_str());
            if items.update_photo_path(&name, &entry.path).await? {
                debug!(
                    event_name = "photos.updated",
                    item = %entry.item,
                    path = %entry.path,
                    "item photo updated"
                );
                report.updated.push(entry.item.clone());
            } else {
                warn!(event_name = "photos.unknown_item", item = %entry.item, "no such item");
                report.unknown.push(entry.item.clone());
            }
        }

        Ok(report)
    }
}
