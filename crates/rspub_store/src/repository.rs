//! Saved configurations.
//!
//! Configurations are stored as JSON so operators can inspect them:
//!
//! ```json
//! { "format_version": 1, "configuration": { "id": "...", ... } }
//! ```

use crate::backend::StoreBackend;
use crate::error::{StoreError, StoreResult};
use rspub_model::{ConfigId, Configuration};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Blob holding a saved configuration.
pub const CONFIG_BLOB: &str = "config.json";
/// Current configuration document format.
pub const CONFIG_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    configuration: &'a Configuration,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    configuration: Configuration,
}

/// Loads and saves configurations.
#[derive(Clone)]
pub struct ConfigurationRepository {
    backend: Arc<dyn StoreBackend>,
}

impl ConfigurationRepository {
    /// Creates a repository over a backend.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Lists saved configuration ids in order.
    pub fn list(&self) -> StoreResult<Vec<ConfigId>> {
        let mut saved = Vec::new();
        for config in self.backend.configs()? {
            if self.backend.read(&config, CONFIG_BLOB)?.is_some() {
                saved.push(config);
            }
        }
        Ok(saved)
    }

    /// Loads a configuration. Returns `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Fails on malformed documents, newer format versions and documents
    /// whose id does not match `id`.
    pub fn load(&self, id: &ConfigId) -> StoreResult<Option<Configuration>> {
        let Some(bytes) = self.backend.read(id, CONFIG_BLOB)? else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if envelope.format_version > CONFIG_FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormat {
                found: envelope.format_version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        if &envelope.configuration.id != id {
            return Err(StoreError::Corrupted(format!(
                "configuration stored under '{id}' is named '{}'",
                envelope.configuration.id
            )));
        }
        debug!(config = %id, "loaded configuration");
        Ok(Some(envelope.configuration))
    }

    /// Saves a configuration under its id, replacing any previous version.
    pub fn save(&self, configuration: &Configuration) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&EnvelopeRef {
            format_version: CONFIG_FORMAT_VERSION,
            configuration,
        })?;
        self.backend.replace(&configuration.id, CONFIG_BLOB, &bytes)?;
        info!(config = %configuration.id, "saved configuration");
        Ok(())
    }

    /// Removes a saved configuration. Returns true if it existed.
    ///
    /// Published state is left alone.
    pub fn remove(&self, id: &ConfigId) -> StoreResult<bool> {
        let removed = self.backend.remove(id, CONFIG_BLOB)?;
        if removed {
            info!(config = %id, "removed configuration");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for ConfigurationRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationRepository").finish_non_exhaustive()
    }
}
