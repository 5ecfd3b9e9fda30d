use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the caller, threaded through every repository call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Login of the caller. Recorded as the responsibility of audit records.
    pub subject: String,
    /// Roles the transport layer established for the caller.
    pub roles: Vec<String>,
}

impl CallContext {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A repository call subject to authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Ingest,
    Export,
    GetObject,
    ModifyObject,
    PurgeObject,
    GetDatastream,
    AddDatastream,
    ModifyDatastreamByValue,
    ModifyDatastreamByReference,
    PurgeDatastream,
    SetDatastreamState,
    SetDatastreamVersionable,
    CompareDatastreamChecksum,
    GetDisseminator,
    AddDisseminator,
    ModifyDisseminator,
    PurgeDisseminator,
    SetDisseminatorState,
    GetNextPid,
    PutTempStream,
}

impl Action {
    /// Operation name as used in audit records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Export => "export",
            Self::GetObject => "getObject",
            Self::ModifyObject => "modifyObject",
            Self::PurgeObject => "purgeObject",
            Self::GetDatastream => "getDatastream",
            Self::AddDatastream => "addDatastream",
            Self::ModifyDatastreamByValue => "modifyDatastreamByValue",
            Self::ModifyDatastreamByReference => "modifyDatastreamByReference",
            Self::PurgeDatastream => "purgeDatastream",
            Self::SetDatastreamState => "setDatastreamState",
            Self::SetDatastreamVersionable => "setDatastreamVersionable",
            Self::CompareDatastreamChecksum => "compareDatastreamChecksum",
            Self::GetDisseminator => "getDisseminator",
            Self::AddDisseminator => "addDisseminator",
            Self::ModifyDisseminator => "modifyDisseminator",
            Self::PurgeDisseminator => "purgeDisseminator",
            Self::SetDisseminatorState => "setDisseminatorState",
            Self::GetNextPid => "getNextPid",
            Self::PutTempStream => "putTempStream",
        }
    }

    /// Whether the call can change repository state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Export
                | Self::GetObject
                | Self::GetDatastream
                | Self::GetDisseminator
                | Self::CompareDatastreamChecksum
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
