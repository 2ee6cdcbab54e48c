//! Content types defined in configuration

use std::collections::BTreeMap;

use crate::config::ContentTypeConfig;
use crate::domain::ContentType;
use crate::infrastructure::traits::TypeRepository;

/// Type registry built from the `[types.<Name>]` tables of the settings.
///
/// Ids are assigned in name order starting at 1, so they are stable for a given config.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTypeRepository {
    types: Vec<ContentType>,
}

impl ConfiguredTypeRepository {
    pub fn new(configs: &BTreeMap<String, ContentTypeConfig>) -> Self {
        let types = configs
            .iter()
            .zip(1u32..)
            .map(|((name, cfg), id)| ContentType {
                id,
                name: name.clone(),
                properties: cfg.properties.clone(),
                required: cfg.required.clone(),
            })
            .collect();
        Self { types }
    }
}

impl TypeRepository for ConfiguredTypeRepository {
    fn load(&self, name: &str) -> Option<ContentType> {
        self.types.iter().find(|t| t.name == name).cloned()
    }

    fn load_by_id(&self, id: u32) -> Option<ContentType> {
        self.types.iter().find(|t| t.id == id).cloned()
    }

    fn list(&self) -> Vec<ContentType> {
        self.types.clone()
    }
}
