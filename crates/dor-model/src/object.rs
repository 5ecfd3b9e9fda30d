use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dor_types::{ObjectType, Pid, State, Timestamp};

use crate::audit::AuditRecord;
use crate::datastream::Datastream;
use crate::disseminator::Disseminator;
use crate::error::{ModelError, ModelResult};

/// Datastream that bindings with an empty datastream id resolve to, unless
/// configured otherwise.
pub const DEFAULT_BINDING_TARGET: &str = "DC";

/// A persistent digital object: properties, version histories, and the
/// audit log.
///
/// `pid` is optional only so that an object can be populated by a
/// deserializer before its identity is known; a stored object always has one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalObject {
    pub pid: Option<Pid>,
    pub label: String,
    pub owner_id: String,
    pub content_model_id: String,
    pub state: State,
    pub object_type: ObjectType,
    pub create_date: Option<Timestamp>,
    pub last_mod_date: Option<Timestamp>,
    /// Extension properties keyed by property URI.
    pub properties: BTreeMap<String, String>,
    /// Namespace prefix to URI, as declared by the document the object was
    /// read from.
    pub namespaces: BTreeMap<String, String>,
    audit: Vec<AuditRecord>,
    datastreams: BTreeMap<String, Datastream>,
    disseminators: BTreeMap<String, Disseminator>,
}

impl DigitalObject {
    /// An empty object with the given identity.
    pub fn new(pid: Pid) -> Self {
        Self {
            pid: Some(pid),
            ..Default::default()
        }
    }

    pub fn pid(&self) -> Option<&Pid> {
        self.pid.as_ref()
    }

    // ---- Datastreams ----

    pub fn datastream(&self, id: &str) -> Option<&Datastream> {
        self.datastreams.get(id)
    }

    pub fn datastream_mut(&mut self, id: &str) -> Option<&mut Datastream> {
        self.datastreams.get_mut(id)
    }

    /// Datastream histories in id order.
    pub fn datastreams(&self) -> impl Iterator<Item = &Datastream> {
        self.datastreams.values()
    }

    pub fn datastream_ids(&self) -> Vec<String> {
        self.datastreams.keys().cloned().collect()
    }

    pub fn has_datastream(&self, id: &str) -> bool {
        self.datastreams.contains_key(id)
    }

    /// Insert or replace a whole history.
    pub fn put_datastream(&mut self, datastream: Datastream) {
        self.datastreams.insert(datastream.id.clone(), datastream);
    }

    pub fn remove_datastream(&mut self, id: &str) -> ModelResult<Datastream> {
        self.datastreams
            .remove(id)
            .ok_or_else(|| ModelError::DatastreamNotFound(id.to_string()))
    }

    /// First unused `{prefix}{n}` id, counting from 1.
    pub fn next_datastream_id(&self, prefix: &str) -> String {
        next_free_id(prefix, |id| self.datastreams.contains_key(id))
    }

    // ---- Disseminators ----

    pub fn disseminator(&self, id: &str) -> Option<&Disseminator> {
        self.disseminators.get(id)
    }

    pub fn disseminator_mut(&mut self, id: &str) -> Option<&mut Disseminator> {
        self.disseminators.get_mut(id)
    }

    pub fn disseminators(&self) -> impl Iterator<Item = &Disseminator> {
        self.disseminators.values()
    }

    pub fn disseminator_ids(&self) -> Vec<String> {
        self.disseminators.keys().cloned().collect()
    }

    pub fn put_disseminator(&mut self, disseminator: Disseminator) {
        self.disseminators
            .insert(disseminator.id.clone(), disseminator);
    }

    pub fn remove_disseminator(&mut self, id: &str) -> ModelResult<Disseminator> {
        self.disseminators
            .remove(id)
            .ok_or_else(|| ModelError::DisseminatorNotFound(id.to_string()))
    }

    pub fn next_disseminator_id(&self, prefix: &str) -> String {
        next_free_id(prefix, |id| self.disseminators.contains_key(id))
    }

    /// Ids of disseminators that bind `datastream_id` in any version and any
    /// state, counting bindings that resolve to it implicitly.
    pub fn disseminators_binding(&self, datastream_id: &str, default_target: &str) -> Vec<String> {
        self.disseminators
            .values()
            .filter(|d| d.ever_binds(datastream_id, default_target))
            .map(|d| d.id.clone())
            .collect()
    }

    // ---- Audit log ----

    pub fn audit_records(&self) -> &[AuditRecord] {
        &self.audit
    }

    /// Append a record, assigning it the next `AUDREC{n}` id. Returns the id.
    pub fn append_audit(&mut self, mut record: AuditRecord) -> String {
        let next = self
            .audit
            .iter()
            .filter_map(AuditRecord::ordinal)
            .max()
            .map(|n| n + 1)
            .unwrap_or(1);
        record.id = format!("AUDREC{next}");
        debug!(
            audit_id = %record.id,
            action = %record.action,
            component = record.component_id.as_deref().unwrap_or("-"),
            "audit record appended"
        );
        self.audit.push(record.clone());
        record.id
    }

    /// Append a record exactly as read from a document, keeping its id.
    pub fn restore_audit(&mut self, record: AuditRecord) {
        self.audit.push(record);
    }
}

fn next_free_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    (1u64..)
        .map(|n| format!("{prefix}{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| format!("{prefix}0"))
}
