use std::path::Path;
use std::time::Duration;

use dor_crypto::ChecksumType;
use dor_gate::GateConfig;
use dor_model::DEFAULT_BINDING_TARGET;
use dor_translation::{TranslationConfig, SERVICE_PLACEHOLDER};
use serde::{Deserialize, Serialize};

use crate::error::{ManagementError, ManagementResult};

/// Repository-wide settings, built once and handed to [`crate::Management`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Base of public content URLs in exports.
    pub public_base_url: String,
    /// Base that relative migration paths (`/get/...`) are fetched from
    /// during ingest.
    pub migration_base_url: String,
    /// Datastream that bindings with an empty datastream id resolve to.
    pub default_binding_target: String,
    pub staging_ttl_secs: u64,
    /// Namespace of generated pids.
    pub pid_namespace: String,
    /// Most pids one `get_next_pid` call may reserve.
    pub max_pids_per_request: usize,
    /// Algorithm applied to new datastreams that do not name one.
    /// `DISABLED` turns checksumming off.
    pub checksum_type: String,
    pub service_placeholder: String,
    pub gate: GateConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080/fedora".into(),
            migration_base_url: "http://localhost:8080/fedora".into(),
            default_binding_target: DEFAULT_BINDING_TARGET.into(),
            staging_ttl_secs: 3600,
            pid_namespace: "changeme".into(),
            max_pids_per_request: 1000,
            checksum_type: ChecksumType::Disabled.name().into(),
            service_placeholder: SERVICE_PLACEHOLDER.into(),
            gate: GateConfig::default(),
        }
    }
}

impl RepositoryConfig {
    pub fn from_toml(text: &str) -> ManagementResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ManagementError::validation(format!("invalid configuration: {e}")))?;
        config.default_checksum()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ManagementResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ManagementError::StreamIo(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn default_checksum(&self) -> ManagementResult<ChecksumType> {
        Ok(ChecksumType::parse(&self.checksum_type)?)
    }

    pub fn staging_ttl(&self) -> Duration {
        Duration::from_secs(self.staging_ttl_secs)
    }

    pub fn translation_config(&self) -> TranslationConfig {
        TranslationConfig {
            public_base_url: self.public_base_url.clone(),
            service_placeholder: self.service_placeholder.clone(),
            default_binding_target: self.default_binding_target.clone(),
        }
    }
}
