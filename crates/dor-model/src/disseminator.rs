use serde::{Deserialize, Serialize};

use dor_types::{Pid, State, Timestamp};

use crate::datastream::{check_version_id, next_version_id};
use crate::error::{ModelError, ModelResult};

/// One entry of a binding map: a mechanism input key bound to a datastream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub bind_key: String,
    /// Bound datastream id. Empty means the object's default binding target.
    pub datastream_id: String,
    pub label: String,
    pub order: u32,
}

impl Binding {
    pub fn new(bind_key: impl Into<String>, datastream_id: impl Into<String>) -> Self {
        Self {
            bind_key: bind_key.into(),
            datastream_id: datastream_id.into(),
            label: String::new(),
            order: 0,
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Whether this binding relies on the implicit default target.
    pub fn is_implicit(&self) -> bool {
        self.datastream_id.is_empty()
    }

    /// The datastream id this binding resolves to.
    pub fn resolved_datastream_id<'a>(&'a self, default_target: &'a str) -> &'a str {
        if self.is_implicit() {
            default_target
        } else {
            &self.datastream_id
        }
    }
}

/// Ordered bindings from mechanism input keys to datastreams.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingMap {
    pub label: String,
    pub bindings: Vec<Binding>,
}

impl BindingMap {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            label: String::new(),
            bindings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether any binding resolves to `datastream_id`.
    pub fn binds(&self, datastream_id: &str, default_target: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.resolved_datastream_id(default_target) == datastream_id)
    }

    /// Bindings for one input key, sorted by order.
    pub fn for_key(&self, bind_key: &str) -> Vec<&Binding> {
        let mut found: Vec<&Binding> =
            self.bindings.iter().filter(|b| b.bind_key == bind_key).collect();
        found.sort_by_key(|b| b.order);
        found
    }
}

/// One immutable snapshot of a service binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisseminatorVersion {
    pub version_id: String,
    pub label: String,
    /// Mechanism implementing the behavior definition.
    pub bmech_pid: Pid,
    pub created: Timestamp,
    pub binding_map: BindingMap,
}

/// The version history of one disseminator id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disseminator {
    pub id: String,
    /// Behavior definition (service contract) this disseminator fulfils.
    pub bdef_pid: Pid,
    pub state: State,
    pub versionable: bool,
    versions: Vec<DisseminatorVersion>,
}

impl Disseminator {
    pub fn new(id: impl Into<String>, bdef_pid: Pid) -> Self {
        Self {
            id: id.into(),
            bdef_pid,
            state: State::Active,
            versionable: true,
            versions: Vec::new(),
        }
    }

    pub fn versions(&self) -> &[DisseminatorVersion] {
        &self.versions
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn current(&self) -> Option<&DisseminatorVersion> {
        self.versions.last()
    }

    pub fn version_as_of(&self, at: Timestamp) -> Option<&DisseminatorVersion> {
        self.versions.iter().rev().find(|v| v.created <= at)
    }

    pub fn next_version_id(&self) -> String {
        next_version_id(&self.id, self.versions.iter().map(|v| v.version_id.as_str()))
    }

    /// Whether any version, in any state, binds `datastream_id`.
    pub fn ever_binds(&self, datastream_id: &str, default_target: &str) -> bool {
        self.versions
            .iter()
            .any(|v| v.binding_map.binds(datastream_id, default_target))
    }

    /// Append a version, keeping creation order.
    pub fn push_version(&mut self, version: DisseminatorVersion) -> ModelResult<()> {
        check_version_id(&self.id, &version.version_id)?;
        if self.versions.iter().any(|v| v.version_id == version.version_id) {
            return Err(ModelError::DuplicateVersion(version.version_id));
        }
        let pos = self
            .versions
            .iter()
            .rposition(|v| v.created <= version.created)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.versions.insert(pos, version);
        Ok(())
    }

    /// Append a version that replaces the whole history.
    pub fn replace_with(&mut self, version: DisseminatorVersion) -> ModelResult<()> {
        let previous = std::mem::take(&mut self.versions);
        if let Err(e) = self.push_version(version) {
            self.versions = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Remove every version created within `[start, end]`.
    pub fn purge_range(&mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Vec<Timestamp> {
        let in_range = |v: &DisseminatorVersion| {
            start.map_or(true, |s| v.created >= s) && end.map_or(true, |e| v.created <= e)
        };
        let removed = self
            .versions
            .iter()
            .filter(|v| in_range(v))
            .map(|v| v.created)
            .collect();
        self.versions.retain(|v| !in_range(v));
        removed
    }
}
