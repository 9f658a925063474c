use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::effect::EffectDef;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCatalog {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub buildings: Vec<BuildingDef>,
    #[serde(default)]
    pub developments: Vec<DevelopmentDef>,
    #[serde(default)]
    pub population_roles: Vec<PopulationRoleDef>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub on_build: Vec<EffectDef>,
    /// Run once per owned copy during the upkeep phase.
    #[serde(default)]
    pub upkeep: Vec<EffectDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub on_build: Vec<EffectDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationRoleDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub on_assigned: Vec<EffectDef>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

pub fn load_content_catalog(path: impl AsRef<Path>) -> Result<ContentCatalog, ContentError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let catalog: ContentCatalog =
        serde_json::from_str(&raw).map_err(|source| ContentError::Json {
            path: path.display().to_string(),
            source,
        })?;
    catalog.validate()?;
    Ok(catalog)
}

impl ContentCatalog {
    pub fn validate(&self) -> Result<(), ContentError> {
        check_ids("building", self.buildings.iter().map(|b| b.id.as_str()))?;
        check_ids("development", self.developments.iter().map(|d| d.id.as_str()))?;
        check_ids(
            "population role",
            self.population_roles.iter().map(|r| r.id.as_str()),
        )?;
        Ok(())
    }

    pub fn building(&self, id: &str) -> Option<&BuildingDef> {
        self.buildings.iter().find(|building| building.id == id)
    }

    pub fn development(&self, id: &str) -> Option<&DevelopmentDef> {
        self.developments.iter().find(|development| development.id == id)
    }

    pub fn population_role(&self, id: &str) -> Option<&PopulationRoleDef> {
        self.population_roles.iter().find(|role| role.id == id)
    }
}

fn check_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), ContentError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(ContentError::Validation(format!("{} id cannot be empty", kind)));
        }
        if !seen.insert(id) {
            return Err(ContentError::Validation(format!("duplicate {} id {}", kind, id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("kingdom-ledger-{}-{}", std::process::id(), name));
        fs::write(&path, contents).expect("write temp file");
        path
    }

    #[test]
    fn bundled_catalog_loads() {
        let catalog = load_content_catalog(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/data/kingdom.json"),
        )
        .expect("bundled catalog");
        assert!(catalog.building("farm").is_some());
        assert!(catalog.population_role("legion").is_some());
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let catalog: ContentCatalog = serde_json::from_value(json!({
            "buildings": [
                { "id": "farm", "name": "Farm" },
                { "id": "farm", "name": "Other Farm" }
            ]
        }))
        .unwrap();
        assert!(matches!(catalog.validate(), Err(ContentError::Validation(_))));
    }

    #[test]
    fn blank_ids_fail_validation() {
        let catalog: ContentCatalog = serde_json::from_value(json!({
            "populationRoles": [{ "id": " ", "name": "Nobody" }]
        }))
        .unwrap();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn malformed_file_reports_path() {
        let path = write_temp("broken.json", "{ \"buildings\": [");
        let err = load_content_catalog(&path).unwrap_err();
        assert!(matches!(err, ContentError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_content_catalog("./does/not/exist.json").unwrap_err();
        assert!(matches!(err, ContentError::Io { .. }));
    }
}
