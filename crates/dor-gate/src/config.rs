use serde::{Deserialize, Serialize};

use crate::policy::Policy;

/// Configuration for the policy gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// When `true`, every call is permitted without evaluating policies.
    pub permissive: bool,
    /// Policy consulted before any added ones.
    pub default_policy: Policy,
    /// Further policies, evaluated in order.
    pub policies: Vec<Policy>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            permissive: false,
            default_policy: Policy::permissive(),
            policies: Vec::new(),
        }
    }
}

impl GateConfig {
    /// A configuration that permits everything, for local single-user
    /// repositories and tests.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Default::default()
        }
    }
}
