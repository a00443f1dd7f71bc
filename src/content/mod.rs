//! Data layer: action catalog and unit templates loaded from TOML
//!
//! Content is validated before any simulation can be built from it.

pub mod templates;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{ConfigError, Result};
use crate::orders::actions::{ActionSpec, ActionTable};

pub use templates::{UnitKind, UnitTemplate, WeaponTemplate};

const STANDARD_CONTENT: &str = include_str!("../../data/content.toml");

#[derive(Debug, Deserialize)]
struct ContentFile {
    actions: Vec<ActionSpec>,
    #[serde(default)]
    units: Vec<UnitTemplate>,
}

/// Validated content bundle
#[derive(Debug, Clone)]
pub struct Content {
    pub actions: ActionTable,
    pub templates: BTreeMap<String, UnitTemplate>,
}

impl Content {
    /// The content shipped with the crate
    pub fn standard() -> Result<Self> {
        Self::from_toml_str(STANDARD_CONTENT)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ContentFile = toml::from_str(text)?;
        let actions = ActionTable::new(&file.actions)?;

        let mut templates = BTreeMap::new();
        for template in file.units {
            template.validate()?;
            if templates.contains_key(&template.name) {
                return Err(ConfigError::InvalidSetting(format!(
                    "duplicate unit template {}",
                    template.name
                ))
                .into());
            }
            templates.insert(template.name.clone(), template);
        }

        tracing::info!(
            "Loaded content: {} actions, {} unit templates",
            actions.len(),
            templates.len()
        );
        Ok(Self { actions, templates })
    }

    pub fn template(&self, name: &str) -> std::result::Result<&UnitTemplate, ConfigError> {
        self.templates
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTemplate(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SimError;

    #[test]
    fn test_standard_content_loads() {
        let content = Content::standard().unwrap();
        assert!(content.template("rifleman").is_ok());
        assert!(content.template("light_tank").is_ok());
        assert!(matches!(
            content.template("dragon"),
            Err(ConfigError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_cyclic_content_prevents_start() {
        let text = r#"
            [[actions]]
            name = "a"
            kind = "hold"
            requires = ["is_crouched"]
            adds = ["is_standing"]

            [[actions]]
            name = "b"
            kind = "walk"
            requires = ["is_standing"]
            adds = ["is_crouched"]
        "#;
        let err = Content::from_toml_str(text).unwrap_err();
        assert!(matches!(
            err,
            SimError::Configuration(ConfigError::PrerequisiteCycle(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(
            Content::from_toml_str("actions = 3"),
            Err(SimError::TomlError(_))
        ));
    }
}
