use dor_model::{BindingMap, DatastreamVersion, DisseminatorVersion};
use dor_types::{ControlGroup, Pid, State};

/// Parameters of `add_datastream`.
#[derive(Clone, Debug)]
pub struct NewDatastream {
    /// `None` asks the repository to generate a `DS{n}` id.
    pub id: Option<String>,
    pub control_group: ControlGroup,
    pub label: String,
    pub mime_type: String,
    pub format_uri: Option<String>,
    pub alt_ids: Vec<String>,
    pub versionable: bool,
    /// Single-letter state code.
    pub state: String,
    /// Content location for managed and referenced datastreams: a URL, a
    /// staging id, or an internal content id.
    pub location: Option<String>,
    /// XML for inline datastreams.
    pub content: Option<Vec<u8>>,
    /// Algorithm name. `None` uses the repository default.
    pub checksum_type: Option<String>,
    /// Expected checksum of the final content.
    pub checksum: Option<String>,
    pub log_message: String,
}

impl NewDatastream {
    pub fn inline(id: impl Into<String>, xml: impl Into<Vec<u8>>) -> Self {
        Self {
            content: Some(xml.into()),
            mime_type: "text/xml".into(),
            ..Self::empty(Some(id.into()), ControlGroup::Inline)
        }
    }

    pub fn managed(id: Option<String>, location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::empty(id, ControlGroup::Managed)
        }
    }

    pub fn referenced(id: Option<String>, url: impl Into<String>) -> Self {
        Self {
            location: Some(url.into()),
            ..Self::empty(id, ControlGroup::Referenced)
        }
    }

    fn empty(id: Option<String>, control_group: ControlGroup) -> Self {
        Self {
            id,
            control_group,
            label: String::new(),
            mime_type: String::new(),
            format_uri: None,
            alt_ids: Vec::new(),
            versionable: true,
            state: State::Active.code().into(),
            location: None,
            content: None,
            checksum_type: None,
            checksum: None,
            log_message: String::new(),
        }
    }
}

/// Attribute changes for a new datastream version. `None` carries the
/// previous value forward.
#[derive(Clone, Debug, Default)]
pub struct DatastreamUpdate {
    pub label: Option<String>,
    pub mime_type: Option<String>,
    pub format_uri: Option<String>,
    pub alt_ids: Option<Vec<String>>,
    pub checksum_type: Option<String>,
    pub checksum: Option<String>,
    pub log_message: String,
}

/// Content location for `modify_datastream_by_reference`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocationUpdate {
    /// Keep the current content.
    Preserve,
    /// Point the new version at this location.
    Replace(String),
}

/// Parameters of `add_disseminator`.
#[derive(Clone, Debug)]
pub struct NewDisseminator {
    pub bdef_pid: Pid,
    pub bmech_pid: Pid,
    pub label: String,
    pub binding_map: BindingMap,
    pub state: String,
    pub log_message: String,
}

impl NewDisseminator {
    pub fn new(bdef_pid: Pid, bmech_pid: Pid, binding_map: BindingMap) -> Self {
        Self {
            bdef_pid,
            bmech_pid,
            label: String::new(),
            binding_map,
            state: State::Active.code().into(),
            log_message: String::new(),
        }
    }
}

/// Changes for a new disseminator version. `None` carries the previous
/// value forward.
#[derive(Clone, Debug, Default)]
pub struct DisseminatorUpdate {
    pub bmech_pid: Option<Pid>,
    pub label: Option<String>,
    pub binding_map: Option<BindingMap>,
    pub state: Option<String>,
    pub log_message: String,
}

/// One datastream version together with its history's attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatastreamSnapshot {
    pub id: String,
    pub control_group: ControlGroup,
    pub state: State,
    pub versionable: bool,
    pub version: DatastreamVersion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisseminatorSnapshot {
    pub id: String,
    pub bdef_pid: Pid,
    pub state: State,
    pub versionable: bool,
    pub version: DisseminatorVersion,
}
