use serde::{Deserialize, Serialize};

use dor_crypto::Checksum;
use dor_types::{ControlGroup, State, Timestamp};

use crate::error::{ModelError, ModelResult};
use crate::legacy::LegacyMetadata;

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Where the bytes of a managed datastream version currently are.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagedContent {
    /// An identifier the repository can resolve: an internal content-store
    /// id, a staging id, or a migration path.
    Location(String),
    /// Bytes carried inside the object itself, as produced by reading an
    /// archival export. Ingest moves them into the content store.
    Embedded(Vec<u8>),
}

/// The content of one datastream version, tagged by control group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    /// Well-formed XML embedded in the object.
    Inline(Vec<u8>),
    /// Repository-owned bytes.
    Managed(ManagedContent),
    /// Externally hosted bytes, addressed by URL.
    Referenced(String),
}

impl Content {
    pub fn control_group(&self) -> ControlGroup {
        match self {
            Self::Inline(_) => ControlGroup::Inline,
            Self::Managed(_) => ControlGroup::Managed,
            Self::Referenced(_) => ControlGroup::Referenced,
        }
    }

    /// The location string, for managed and referenced content.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Managed(ManagedContent::Location(loc)) => Some(loc),
            Self::Referenced(url) => Some(url),
            _ => None,
        }
    }

    /// Bytes held directly by the object, if any.
    pub fn embedded_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Inline(xml) => Some(xml),
            Self::Managed(ManagedContent::Embedded(bytes)) => Some(bytes),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DatastreamVersion
// ---------------------------------------------------------------------------

/// One immutable snapshot of a datastream's content and attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamVersion {
    /// `{datastream id}.{ordinal}`.
    pub version_id: String,
    pub label: String,
    pub mime_type: String,
    pub format_uri: Option<String>,
    pub alt_ids: Vec<String>,
    pub created: Timestamp,
    pub size: u64,
    pub checksum: Checksum,
    pub content: Content,
    /// Classification decoded from a legacy format URI.
    pub legacy_metadata: Option<LegacyMetadata>,
}

impl DatastreamVersion {
    /// A version with empty descriptive attributes around `content`.
    pub fn new(version_id: impl Into<String>, created: Timestamp, content: Content) -> Self {
        Self {
            version_id: version_id.into(),
            label: String::new(),
            mime_type: String::new(),
            format_uri: None,
            alt_ids: Vec::new(),
            created,
            size: 0,
            checksum: Checksum::disabled(),
            content,
            legacy_metadata: None,
        }
    }

    /// Set the format URI and re-derive the legacy classification from it.
    pub fn set_format_uri(&mut self, format_uri: Option<String>) {
        self.legacy_metadata = format_uri.as_deref().and_then(LegacyMetadata::decode);
        self.format_uri = format_uri;
    }

    pub fn control_group(&self) -> ControlGroup {
        self.content.control_group()
    }
}

// ---------------------------------------------------------------------------
// Datastream
// ---------------------------------------------------------------------------

/// The version history of one datastream id.
///
/// State and versionability belong to the history: every version shares
/// them, and changing either does not create a version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastream {
    pub id: String,
    pub control_group: ControlGroup,
    pub state: State,
    pub versionable: bool,
    versions: Vec<DatastreamVersion>,
}

impl Datastream {
    /// An empty history. Add content with [`Self::push_version`].
    pub fn new(id: impl Into<String>, control_group: ControlGroup) -> Self {
        Self {
            id: id.into(),
            control_group,
            state: State::Active,
            versionable: true,
            versions: Vec::new(),
        }
    }

    /// Versions in creation order, oldest first.
    pub fn versions(&self) -> &[DatastreamVersion] {
        &self.versions
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The most recent version.
    pub fn current(&self) -> Option<&DatastreamVersion> {
        self.versions.last()
    }

    pub fn version(&self, version_id: &str) -> Option<&DatastreamVersion> {
        self.versions.iter().find(|v| v.version_id == version_id)
    }

    /// The version in effect at `at`: the latest one created at or before it.
    pub fn version_as_of(&self, at: Timestamp) -> Option<&DatastreamVersion> {
        self.versions.iter().rev().find(|v| v.created <= at)
    }

    /// Next unused version id. Ordinals continue past purged versions.
    pub fn next_version_id(&self) -> String {
        next_version_id(&self.id, self.versions.iter().map(|v| v.version_id.as_str()))
    }

    /// Append a version, keeping the history ordered by creation date.
    ///
    /// The version's content must match the history's control group and its
    /// id must be new.
    pub fn push_version(&mut self, version: DatastreamVersion) -> ModelResult<()> {
        let actual = version.control_group();
        if actual != self.control_group {
            return Err(ModelError::ControlGroupMismatch {
                id: self.id.clone(),
                version_id: version.version_id,
                expected: self.control_group,
                actual,
            });
        }
        check_version_id(&self.id, &version.version_id)?;
        if self.version(&version.version_id).is_some() {
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

    /// Append a version that replaces the whole history, as done for
    /// non-versionable datastreams.
    pub fn replace_with(&mut self, version: DatastreamVersion) -> ModelResult<()> {
        let previous = std::mem::take(&mut self.versions);
        if let Err(e) = self.push_version(version) {
            self.versions = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Remove every version created within `[start, end]` (either bound
    /// open when `None`). Returns the creation dates of removed versions.
    pub fn purge_range(&mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Vec<Timestamp> {
        let in_range = |v: &DatastreamVersion| {
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

    /// Whether purging `[start, end]` would leave no versions.
    pub fn purge_would_empty(&self, start: Option<Timestamp>, end: Option<Timestamp>) -> bool {
        self.versions.iter().all(|v| {
            start.map_or(true, |s| v.created >= s) && end.map_or(true, |e| v.created <= e)
        })
    }
}

/// Shared by datastream and disseminator histories.
pub(crate) fn next_version_id<'a>(id: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let next = existing
        .filter_map(|vid| vid.strip_prefix(id)?.strip_prefix('.')?.parse::<u64>().ok())
        .max()
        .map(|n| n + 1)
        .unwrap_or(0);
    format!("{id}.{next}")
}

pub(crate) fn check_version_id(id: &str, version_id: &str) -> ModelResult<()> {
    let belongs = version_id
        .strip_prefix(id)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with('.'));
    if !belongs {
        return Err(ModelError::ForeignVersion {
            id: id.to_string(),
            version_id: version_id.to_string(),
        });
    }
    Ok(())
}
