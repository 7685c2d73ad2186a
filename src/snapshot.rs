use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{CustomAverage, Subject};
use crate::tree;

/// A user's subject forest and custom averages, as exported by the API layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub custom_averages: Vec<CustomAverage>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json).context("snapshot is not valid JSON")?;
        tree::validate(&snapshot.subjects).context("snapshot holds an invalid subject tree")?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let snapshot = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            subjects = snapshot.subjects.len(),
            custom_averages = snapshot.custom_averages.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }
}
