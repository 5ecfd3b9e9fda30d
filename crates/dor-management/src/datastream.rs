use tracing::{debug, warn};

use dor_crypto::{ChecksumType, DISABLED_VALUE};
use dor_gate::{Action, CallContext};
use dor_model::{Content, Datastream, DatastreamVersion, ManagedContent};
use dor_store::internal_content_id;
use dor_translation::{check_well_formed, classify, LocationKind};
use dor_types::{
    is_reserved_datastream_id, validate_component_id, ControlGroup, Pid, State, Timestamp,
};

use crate::content::{seal_checksum, PendingContent};
use crate::error::{ManagementError, ManagementResult};
use crate::repository::{existing_datastream, Management, Writer};
use crate::request::{DatastreamUpdate, LocationUpdate, NewDatastream};

fn reject_reserved(dsid: &str, what: &str) -> ManagementResult<()> {
    if is_reserved_datastream_id(dsid) {
        return Err(ManagementError::general(format!(
            "{what} of the system-controlled {dsid} datastream is not permitted"
        )));
    }
    Ok(())
}

fn parse_checksum_type(name: Option<&str>) -> ManagementResult<Option<ChecksumType>> {
    Ok(name.map(ChecksumType::parse).transpose()?)
}

fn check_inline(dsid: &str, xml: &[u8]) -> ManagementResult<()> {
    if xml.iter().all(u8::is_ascii_whitespace) {
        return Err(ManagementError::validation(format!(
            "inline datastream {dsid} needs XML content"
        )));
    }
    check_well_formed(xml).map_err(|e| {
        ManagementError::validation(format!("inline content of {dsid} is not well-formed: {e}"))
    })
}

fn check_reference(url: &str) -> ManagementResult<()> {
    match classify(url) {
        Ok(LocationKind::Url) => Ok(()),
        _ => Err(ManagementError::validation(format!(
            "referenced content must be an absolute URL, got '{url}'"
        ))),
    }
}

/// A datastream that may receive a new version.
fn modifiable<'a>(
    writer: &'a Writer<'_>,
    pid: &Pid,
    dsid: &str,
) -> ManagementResult<(&'a Datastream, &'a DatastreamVersion)> {
    let datastream = existing_datastream(writer.object(), pid, dsid)?;
    if datastream.state == State::Deleted {
        return Err(ManagementError::general(format!(
            "datastream {dsid} of {pid} is deleted and cannot be modified"
        )));
    }
    let current = datastream
        .current()
        .ok_or_else(|| ManagementError::general(format!("datastream {dsid} has no versions")))?;
    Ok((datastream, current))
}

impl Management {
    /// Create a datastream with one version. Returns its id.
    pub fn add_datastream(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        request: NewDatastream,
    ) -> ManagementResult<String> {
        self.authorize(ctx, Action::AddDatastream, Some(pid), request.id.as_deref())?;
        if let Some(id) = &request.id {
            if is_reserved_datastream_id(id) {
                return Err(ManagementError::general(format!(
                    "creation of a datastream with the reserved id {id} is not permitted"
                )));
            }
            validate_component_id(id)?;
        }
        let state = State::from_code(&request.state)?;
        let kind = parse_checksum_type(request.checksum_type.as_deref())?
            .unwrap_or(self.default_checksum);
        match request.control_group {
            ControlGroup::Inline => {
                let xml = request.content.as_deref().unwrap_or_default();
                check_inline(request.id.as_deref().unwrap_or("new"), xml)?;
            }
            ControlGroup::Managed | ControlGroup::Referenced => {
                let location = request.location.as_deref().ok_or_else(|| {
                    ManagementError::validation(format!(
                        "a content location is required for {} datastreams",
                        request.control_group
                    ))
                })?;
                if request.control_group == ControlGroup::Referenced {
                    check_reference(location)?;
                }
            }
        }

        let mut writer = self.open(pid)?;
        let dsid = match request.id {
            Some(id) if writer.object().has_datastream(&id) => {
                return Err(ManagementError::general(format!(
                    "datastream {id} already exists on {pid}"
                )));
            }
            Some(id) => id,
            None => writer.object().next_datastream_id("DS"),
        };
        let version_id = format!("{dsid}.0");
        let now = Timestamp::now_after(writer.object().last_mod_date);

        let mut pending = PendingContent::new(self.contents.as_ref(), &self.staging);
        let (content, data) = match request.control_group {
            ControlGroup::Inline => {
                let xml = request.content.unwrap_or_default();
                (Content::Inline(xml.clone()), Some(xml))
            }
            ControlGroup::Managed => {
                let location = request.location.unwrap_or_default();
                let data = self.load_location(ctx, &location, &mut pending)?;
                let target = internal_content_id(pid, &dsid, &version_id);
                pending.put(&target, data.clone())?;
                (Content::Managed(ManagedContent::Location(target)), Some(data))
            }
            ControlGroup::Referenced => {
                let url = request.location.unwrap_or_default();
                let data = if kind.is_enabled() {
                    Some(self.fetcher.fetch(&url, ctx)?)
                } else {
                    None
                };
                (Content::Referenced(url), data)
            }
        };

        let mut version = DatastreamVersion::new(version_id, now, content);
        version.label = request.label;
        version.mime_type = request.mime_type;
        version.alt_ids = request.alt_ids;
        version.set_format_uri(request.format_uri);
        if let Some(data) = &data {
            version.size = data.len() as u64;
            version.checksum = seal_checksum(kind, request.checksum.as_deref(), data)?;
        }

        let mut datastream = Datastream::new(dsid.clone(), request.control_group);
        datastream.state = state;
        datastream.versionable = request.versionable;
        datastream.push_version(version)?;
        writer.object_mut().put_datastream(datastream);

        self.finish(
            writer,
            ctx,
            Action::AddDatastream,
            Some(&dsid),
            now,
            &request.log_message,
        )?;
        pending.keep();
        Ok(dsid)
    }

    /// Append a version of an inline datastream. `None` content carries the
    /// current XML forward.
    pub fn modify_datastream_by_value(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
        update: DatastreamUpdate,
        content: Option<Vec<u8>>,
        force: bool,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::ModifyDatastreamByValue, Some(pid), Some(dsid))?;
        reject_reserved(dsid, "modification")?;
        if let Some(xml) = &content {
            check_inline(dsid, xml)?;
        }
        let requested = parse_checksum_type(update.checksum_type.as_deref())?;

        let mut writer = self.open(pid)?;
        let (datastream, current) = modifiable(&writer, pid, dsid)?;
        if datastream.control_group != ControlGroup::Inline {
            return Err(ManagementError::general(format!(
                "datastream {dsid} is {}; only inline datastreams can be modified by value",
                datastream.control_group
            )));
        }
        let xml = match (content, &current.content) {
            (Some(xml), _) => xml,
            (None, Content::Inline(xml)) => xml.clone(),
            (None, _) => Vec::new(),
        };
        let kind = requested.unwrap_or(current.checksum.kind);
        let now = Timestamp::now_after(writer.object().last_mod_date.max(Some(current.created)));
        let mut version = next_version(datastream, current, &update, now, Content::Inline(xml.clone()));
        version.size = xml.len() as u64;
        version.checksum = seal_checksum(kind, update.checksum.as_deref(), &xml)?;

        self.apply_version(&mut writer, dsid, version, force)?;
        self.finish(
            writer,
            ctx,
            Action::ModifyDatastreamByValue,
            Some(dsid),
            now,
            &update.log_message,
        )?;
        Ok(now)
    }

    /// Append a version of a managed or referenced datastream.
    pub fn modify_datastream_by_reference(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
        update: DatastreamUpdate,
        location: LocationUpdate,
        force: bool,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::ModifyDatastreamByReference, Some(pid), Some(dsid))?;
        reject_reserved(dsid, "modification")?;
        let requested = parse_checksum_type(update.checksum_type.as_deref())?;

        let mut writer = self.open(pid)?;
        let (datastream, current) = modifiable(&writer, pid, dsid)?;
        let kind = requested.unwrap_or(current.checksum.kind);
        let now = Timestamp::now_after(writer.object().last_mod_date.max(Some(current.created)));
        let version_id = datastream.next_version_id();

        let mut pending = PendingContent::new(self.contents.as_ref(), &self.staging);
        let (content, data) = match datastream.control_group {
            ControlGroup::Inline => {
                return Err(ManagementError::general(format!(
                    "datastream {dsid} is inline; it can only be modified by value"
                )));
            }
            ControlGroup::Managed => {
                let data = match &location {
                    LocationUpdate::Replace(loc) => self.load_location(ctx, loc, &mut pending)?,
                    LocationUpdate::Preserve => self.read_content(ctx, &current.content)?,
                };
                let target = internal_content_id(pid, dsid, &version_id);
                pending.put(&target, data.clone())?;
                (Content::Managed(ManagedContent::Location(target)), Some(data))
            }
            ControlGroup::Referenced => {
                let url = match location {
                    LocationUpdate::Replace(url) => {
                        check_reference(&url)?;
                        url
                    }
                    LocationUpdate::Preserve => current.content.location().unwrap_or_default().to_string(),
                };
                let data = if kind.is_enabled() {
                    Some(self.fetcher.fetch(&url, ctx)?)
                } else {
                    None
                };
                (Content::Referenced(url), data)
            }
        };

        let mut version = next_version(datastream, current, &update, now, content);
        version.version_id = version_id;
        match &data {
            Some(data) => {
                version.size = data.len() as u64;
                version.checksum = seal_checksum(kind, update.checksum.as_deref(), data)?;
            }
            None => {
                version.size = 0;
                version.checksum = dor_crypto::Checksum::disabled();
            }
        }

        let replaced = if datastream.versionable {
            Vec::new()
        } else {
            managed_locations(datastream.versions())
        };
        self.apply_version(&mut writer, dsid, version, force)?;
        self.finish(
            writer,
            ctx,
            Action::ModifyDatastreamByReference,
            Some(dsid),
            now,
            &update.log_message,
        )?;
        pending.keep();
        self.discard_content(&replaced);
        Ok(now)
    }

    /// Append `version`, guarding bound disseminators against a MIME change
    /// unless forced. Contracts are checked before and after the change;
    /// only newly broken bindings are refused.
    fn apply_version(
        &self,
        writer: &mut Writer<'_>,
        dsid: &str,
        version: DatastreamVersion,
        force: bool,
    ) -> ManagementResult<()> {
        let old_mime = writer
            .object()
            .datastream(dsid)
            .and_then(Datastream::current)
            .map(|v| v.mime_type.clone())
            .unwrap_or_default();
        let guarded = !force && version.mime_type != old_mime;
        let before = if guarded {
            self.contract_problems(writer.object(), dsid)
        } else {
            Default::default()
        };

        let datastream = writer
            .object_mut()
            .datastream_mut(dsid)
            .ok_or_else(|| ManagementError::general(format!("datastream {dsid} vanished")))?;
        if datastream.versionable {
            datastream.push_version(version)?;
        } else {
            datastream.replace_with(version)?;
        }

        if guarded {
            let after = self.contract_problems(writer.object(), dsid);
            if let Some((dissid, reason)) = after.iter().find(|(id, _)| !before.contains_key(*id)) {
                return Err(ManagementError::general(format!(
                    "changing the MIME type of {dsid} from '{old_mime}' breaks disseminator {dissid}: {reason}"
                )));
            }
        }
        Ok(())
    }

    /// Remove the versions of `dsid` created within `[start, end]`. Removing
    /// the last version removes the datastream, which is refused while any
    /// disseminator binds it.
    #[allow(clippy::too_many_arguments)]
    pub fn purge_datastream(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
        log_message: &str,
        force: bool,
    ) -> ManagementResult<Vec<Timestamp>> {
        self.authorize(ctx, Action::PurgeDatastream, Some(pid), Some(dsid))?;
        reject_reserved(dsid, "purging")?;
        if force {
            return Err(ManagementError::general(
                "forced datastream removal is not supported",
            ));
        }
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ManagementError::general(format!(
                    "purge range starts at {s}, after its end {e}"
                )));
            }
        }

        let mut writer = self.open(pid)?;
        let datastream = existing_datastream(writer.object(), pid, dsid)?;
        let empties = datastream.purge_would_empty(start, end);
        if empties {
            let target = self.config.default_binding_target.as_str();
            let blocking = writer.object().disseminators_binding(dsid, target);
            if !blocking.is_empty() {
                return Err(ManagementError::general(format!(
                    "cannot purge datastream {dsid}: it is bound by disseminator(s) {}",
                    blocking.join(", ")
                )));
            }
        }
        let doomed: Vec<&DatastreamVersion> = datastream
            .versions()
            .iter()
            .filter(|v| start.map_or(true, |s| v.created >= s) && end.map_or(true, |e| v.created <= e))
            .collect();
        let obsolete = managed_locations(doomed.iter().copied());

        let object = writer.object_mut();
        let removed = match object.datastream_mut(dsid) {
            Some(ds) => ds.purge_range(start, end),
            None => Vec::new(),
        };
        if removed.is_empty() {
            return Err(ManagementError::general(format!(
                "no versions of datastream {dsid} fall within the purge range"
            )));
        }
        if empties {
            object.remove_datastream(dsid)?;
        }
        let now = Timestamp::now_after(object.last_mod_date);
        self.finish(writer, ctx, Action::PurgeDatastream, Some(dsid), now, log_message)?;
        self.discard_content(&obsolete);
        debug!(pid = %pid, datastream = dsid, purged = removed.len(), removed_id = empties, "datastream purged");
        Ok(removed)
    }

    pub fn set_datastream_state(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
        state: &str,
        log_message: &str,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::SetDatastreamState, Some(pid), Some(dsid))?;
        reject_reserved(dsid, "modification")?;
        let state = State::from_code(state)?;
        let mut writer = self.open(pid)?;
        existing_datastream(writer.object(), pid, dsid)?;
        let now = Timestamp::now_after(writer.object().last_mod_date);
        if let Some(ds) = writer.object_mut().datastream_mut(dsid) {
            ds.state = state;
        }
        self.finish(writer, ctx, Action::SetDatastreamState, Some(dsid), now, log_message)?;
        Ok(now)
    }

    pub fn set_datastream_versionable(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
        versionable: bool,
        log_message: &str,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::SetDatastreamVersionable, Some(pid), Some(dsid))?;
        reject_reserved(dsid, "modification")?;
        let mut writer = self.open(pid)?;
        existing_datastream(writer.object(), pid, dsid)?;
        let now = Timestamp::now_after(writer.object().last_mod_date);
        if let Some(ds) = writer.object_mut().datastream_mut(dsid) {
            ds.versionable = versionable;
        }
        self.finish(
            writer,
            ctx,
            Action::SetDatastreamVersionable,
            Some(dsid),
            now,
            log_message,
        )?;
        Ok(now)
    }

    /// Recompute the checksum of a version's content. Returns the checksum
    /// when it still matches the recorded one, otherwise
    /// `"Checksum validation error"`.
    pub fn compare_datastream_checksum(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
        as_of: Option<Timestamp>,
    ) -> ManagementResult<String> {
        self.authorize(ctx, Action::CompareDatastreamChecksum, Some(pid), Some(dsid))?;
        let snapshot = self.get_datastream(ctx, pid, dsid, as_of)?;
        let recorded = &snapshot.version.checksum;
        if !recorded.kind.is_enabled() {
            return Ok(DISABLED_VALUE.to_string());
        }
        let data = self.read_content(ctx, &snapshot.version.content)?;
        let computed = recorded.kind.compute(&data);
        if recorded.matches(&computed) {
            Ok(computed)
        } else {
            warn!(pid = %pid, datastream = dsid, version = %snapshot.version.version_id, "checksum no longer matches content");
            Ok(CHECKSUM_VALIDATION_ERROR.to_string())
        }
    }

    fn discard_content(&self, ids: &[String]) {
        for id in ids {
            if let Err(e) = self.contents.delete(id) {
                warn!(id = %id, error = %e, "failed to delete purged content");
            }
        }
    }
}

/// Returned by checksum comparison when content no longer matches.
pub const CHECKSUM_VALIDATION_ERROR: &str = "Checksum validation error";

/// A new version carrying `update` over `current`. The caller fills in size
/// and checksum.
fn next_version(
    datastream: &Datastream,
    current: &DatastreamVersion,
    update: &DatastreamUpdate,
    created: Timestamp,
    content: Content,
) -> DatastreamVersion {
    let mut version = DatastreamVersion::new(datastream.next_version_id(), created, content);
    version.label = update.label.clone().unwrap_or_else(|| current.label.clone());
    version.mime_type = update
        .mime_type
        .clone()
        .unwrap_or_else(|| current.mime_type.clone());
    version.alt_ids = update
        .alt_ids
        .clone()
        .unwrap_or_else(|| current.alt_ids.clone());
    version.set_format_uri(update.format_uri.clone().or_else(|| current.format_uri.clone()));
    version
}

/// Internal content ids held by managed versions.
fn managed_locations<'a>(versions: impl IntoIterator<Item = &'a DatastreamVersion>) -> Vec<String> {
    versions
        .into_iter()
        .filter_map(|v| match &v.content {
            Content::Managed(ManagedContent::Location(loc))
                if matches!(classify(loc), Ok(LocationKind::Internal)) =>
            {
                Some(loc.clone())
            }
            _ => None,
        })
        .collect()
}
