//! Engine configuration loaded from TOML.
//!
//! Every setting has a built-in default matching the BCPP deployment, so a
//! config file only needs the keys it changes:
//!
//! ```toml
//! app_label = "bcpp_subject"
//! last_survey = "bcpp-year-3"
//! microtube_panel = "Microtube"
//!
//! [entities]
//! hivresult = "bcpp_subject.hivresult"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crf_model::EntityName;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::registry::EntityRegistry;

/// Default app label for CRF models.
pub const DEFAULT_APP_LABEL: &str = "bcpp_subject";

/// Survey schedule after which HIC enrollment is no longer offered.
pub const DEFAULT_LAST_SURVEY: &str = "bcpp-year-3";

/// Panel name of the point-of-care microtube requisition.
pub const DEFAULT_MICROTUBE_PANEL: &str = "Microtube";

/// Forms the predicates and rule groups read from.
pub const DEFAULT_MODELS: &[&str] = &[
    "subjectvisit",
    "circumcision",
    "hicenrollment",
    "hivtestinghistory",
    "hivtestreview",
    "hivresult",
    "hivresultdocumentation",
    "elisahivresult",
    "hivcareadherence",
    "subjectrequisition",
    "sexualbehaviour",
    "householdmember",
    "resourceutilization",
    "reproductivehealth",
    "medicaldiagnoses",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub app_label: String,
    pub last_survey: String,
    pub microtube_panel: String,
    /// Logical name -> storage name.
    pub entities: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    app_label: Option<String>,
    last_survey: Option<String>,
    microtube_panel: Option<String>,
    #[serde(default)]
    entities: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_app(DEFAULT_APP_LABEL)
    }
}

impl EngineConfig {
    /// Default configuration with every default model under `app_label`.
    pub fn for_app(app_label: &str) -> Self {
        let entities = DEFAULT_MODELS
            .iter()
            .map(|model| (model.to_string(), format!("{app_label}.{model}")))
            .collect();
        Self {
            app_label: app_label.to_string(),
            last_survey: DEFAULT_LAST_SURVEY.to_string(),
            microtube_panel: DEFAULT_MICROTUBE_PANEL.to_string(),
            entities,
        }
    }

    /// Load a TOML file on top of the defaults.
    ///
    /// A changed `app_label` re-qualifies the default entities before the
    /// file's own `[entities]` are applied.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&contents).map_err(|error| match error {
            ConfigError::Toml { source, .. } => ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: "<inline>".into(),
            source,
        })?;
        let mut config = match &file.app_label {
            Some(label) if label.trim().is_empty() => {
                return Err(ConfigError::Invalid {
                    message: "app_label must not be empty".to_string(),
                });
            }
            Some(label) => Self::for_app(label.trim()),
            None => Self::default(),
        };
        if let Some(last_survey) = file.last_survey {
            config.last_survey = last_survey;
        }
        if let Some(panel) = file.microtube_panel {
            config.microtube_panel = panel;
        }
        config.entities.extend(file.entities);
        Ok(config)
    }

    /// Build the entity registry, validating every storage name.
    pub fn entity_registry(&self) -> Result<EntityRegistry, ConfigError> {
        let mut registry = EntityRegistry::new();
        for (logical, storage) in &self.entities {
            let name = EntityName::new(storage.as_str()).map_err(|source| {
                ConfigError::InvalidEntity {
                    logical: logical.clone(),
                    storage: storage.clone(),
                    source,
                }
            })?;
            registry.insert(logical, name);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_bcpp_models() {
        let config = EngineConfig::default();
        let registry = config.entity_registry().unwrap();
        assert_eq!(registry.len(), DEFAULT_MODELS.len());
        assert_eq!(
            registry.resolve("sexualbehaviour").unwrap().as_str(),
            "bcpp_subject.sexualbehaviour"
        );
    }

    #[test]
    fn file_overrides_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            app_label = "ess_subject"
            last_survey = "ess-year-2"

            [entities]
            circumcision = "legacy.circumcision_v2"
            "#,
        )
        .unwrap();
        assert_eq!(config.app_label, "ess_subject");
        assert_eq!(config.last_survey, "ess-year-2");
        assert_eq!(config.microtube_panel, DEFAULT_MICROTUBE_PANEL);
        assert_eq!(config.entities["hivresult"], "ess_subject.hivresult");
        assert_eq!(config.entities["circumcision"], "legacy.circumcision_v2");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = EngineConfig::from_toml_str("app_lable = \"x\"").unwrap_err();
        assert!(matches!(error, ConfigError::Toml { .. }));
    }

    #[test]
    fn invalid_storage_name_is_reported() {
        let config = EngineConfig::from_toml_str("[entities]\nhivresult = \"  \"").unwrap();
        assert!(matches!(
            config.entity_registry(),
            Err(ConfigError::InvalidEntity { .. })
        ));
    }
}
