use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use tracing::{debug, info};

use dor_crypto::{Checksum, ChecksumType, DISABLED_VALUE};
use dor_gate::{Action, Authorization, CallContext, PolicyGate};
use dor_model::{
    AuditRecord, Content, Datastream, DigitalObject, IntegrityValidator, ManagedContent,
};
use dor_store::{
    internal_content_id, ContentStore, InMemoryContentStore, InMemoryObjectStore,
    InMemoryPidAllocator, ObjectStore, ObjectWriter, PidAllocator, ReadView, StagingArea,
};
use dor_translation::{classify, LocationKind, TranslationContext, TranslatorRegistry};
use dor_types::{Pid, State, Timestamp};

use crate::config::RepositoryConfig;
use crate::content::{seal_checksum, PendingContent, RepositoryContent};
use crate::contract::{ContractResolver, StoreContractResolver};
use crate::error::{ManagementError, ManagementResult};
use crate::fetch::{ContentFetcher, NoFetcher};
use crate::request::{DatastreamSnapshot, DisseminatorSnapshot};

pub(crate) type Writer<'a> = ObjectWriter<'a, dyn ObjectStore>;

/// The repository management API.
///
/// Every mutation authorizes, loads the definitive object under an
/// exclusive writer, validates, applies its change to the working copy,
/// appends one audit record and commits. Any failure drops the writer and
/// the stored object is left as it was.
pub struct Management {
    pub(crate) config: RepositoryConfig,
    pub(crate) default_checksum: ChecksumType,
    pub(crate) objects: Arc<dyn ObjectStore>,
    pub(crate) contents: Arc<dyn ContentStore>,
    pub(crate) pids: Arc<dyn PidAllocator>,
    pub(crate) gate: Arc<dyn Authorization>,
    pub(crate) fetcher: Arc<dyn ContentFetcher>,
    pub(crate) contracts: Arc<dyn ContractResolver>,
    pub(crate) staging: StagingArea,
    pub(crate) translators: TranslatorRegistry,
}

impl Management {
    pub fn new(
        config: RepositoryConfig,
        objects: Arc<dyn ObjectStore>,
        contents: Arc<dyn ContentStore>,
        pids: Arc<dyn PidAllocator>,
    ) -> ManagementResult<Self> {
        let default_checksum = config.default_checksum()?;
        let gate = PolicyGate::new(config.gate.clone())
            .map_err(|e| ManagementError::validation(e.to_string()))?;
        let contracts = Arc::new(StoreContractResolver::new(Arc::clone(&objects)));
        Ok(Self {
            default_checksum,
            staging: StagingArea::new(config.staging_ttl()),
            translators: TranslatorRegistry::new(config.translation_config()),
            gate: Arc::new(gate),
            fetcher: Arc::new(NoFetcher),
            contracts,
            objects,
            contents,
            pids,
            config,
        })
    }

    /// A repository backed entirely by memory.
    pub fn in_memory(config: RepositoryConfig) -> ManagementResult<Self> {
        Self::new(
            config,
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryContentStore::new()),
            Arc::new(InMemoryPidAllocator::new()),
        )
    }

    pub fn with_gate(mut self, gate: Arc<dyn Authorization>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_contract_resolver(mut self, contracts: Arc<dyn ContractResolver>) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn translators(&self) -> &TranslatorRegistry {
        &self.translators
    }

    /// Bytes held by the content store under an internal id.
    pub fn managed_content(&self, location: &str) -> ManagementResult<Vec<u8>> {
        Ok(self.contents.get(location)?)
    }

    // ---- Shared steps ----

    pub(crate) fn authorize(
        &self,
        ctx: &CallContext,
        action: Action,
        pid: Option<&Pid>,
        component: Option<&str>,
    ) -> ManagementResult<()> {
        Ok(self.gate.enforce(ctx, action, pid, component)?)
    }

    pub(crate) fn open(&self, pid: &Pid) -> ManagementResult<Writer<'_>> {
        Ok(ObjectWriter::open(self.objects.as_ref(), pid)?)
    }

    /// Stamp the working copy, append the audit record and persist.
    pub(crate) fn finish(
        &self,
        mut writer: Writer<'_>,
        ctx: &CallContext,
        action: Action,
        component: Option<&str>,
        now: Timestamp,
        log_message: &str,
    ) -> ManagementResult<()> {
        let pid = writer.pid().clone();
        let object = writer.object_mut();
        object.last_mod_date = Some(now);
        let audit_id = object.append_audit(AuditRecord::management(
            action.name(),
            component.map(str::to_string),
            ctx.subject.clone(),
            now,
            log_message,
        ));
        writer.commit()?;
        info!(
            pid = %pid,
            action = action.name(),
            component = component.unwrap_or("-"),
            audit_id = %audit_id,
            "mutation committed"
        );
        Ok(())
    }

    /// Bytes behind a location supplied by a client or a document.
    /// Staged uploads are marked for consumption on `pending`.
    pub(crate) fn load_location(
        &self,
        ctx: &CallContext,
        location: &str,
        pending: &mut PendingContent<'_>,
    ) -> ManagementResult<Vec<u8>> {
        let kind = classify(location).map_err(|_| {
            ManagementError::validation(format!("invalid content location: {location}"))
        })?;
        match kind {
            LocationKind::Staged => {
                let data = self.staging.get(location).map_err(|_| {
                    ManagementError::validation(format!("no uploaded content at {location}"))
                })?;
                pending.consume_staged(location);
                Ok(data)
            }
            LocationKind::Internal => Ok(self.contents.get(location)?),
            LocationKind::MigrationPath => {
                let url = format!(
                    "{}{location}",
                    self.config.migration_base_url.trim_end_matches('/')
                );
                self.fetcher.fetch(&url, ctx)
            }
            LocationKind::Url => self.fetcher.fetch(location, ctx),
        }
    }

    /// Bytes of an existing version's content.
    pub(crate) fn read_content(
        &self,
        ctx: &CallContext,
        content: &Content,
    ) -> ManagementResult<Vec<u8>> {
        match content {
            Content::Inline(xml) => Ok(xml.clone()),
            Content::Managed(ManagedContent::Embedded(data)) => Ok(data.clone()),
            Content::Managed(ManagedContent::Location(loc)) => match classify(loc) {
                Ok(LocationKind::Internal) => Ok(self.contents.get(loc)?),
                _ => Err(ManagementError::general(format!(
                    "managed content at {loc} is not held by the repository"
                ))),
            },
            Content::Referenced(url) => self.fetcher.fetch(url, ctx),
        }
    }

    // ---- Ingest and export ----

    /// Read a document into a new object and store it. Returns the pid,
    /// which is generated when the document carries none.
    pub fn ingest(
        &self,
        ctx: &CallContext,
        input: &mut dyn Read,
        format: &str,
        encoding: &str,
        log_message: &str,
    ) -> ManagementResult<Pid> {
        self.authorize(ctx, Action::Ingest, None, None)?;
        let mut object = DigitalObject::default();
        self.translators.deserialize(
            input,
            &mut object,
            format,
            encoding,
            TranslationContext::Migration,
        )?;

        let pid = match object.pid.clone() {
            Some(pid) => {
                self.pids.reserve(&pid)?;
                pid
            }
            None => {
                let pid = self
                    .pids
                    .generate(&self.config.pid_namespace, 1)?
                    .pop()
                    .ok_or_else(|| ManagementError::general("pid allocator returned no pid"))?;
                object.pid = Some(pid.clone());
                pid
            }
        };

        // Lock the pid before any content is written under it.
        let mut writer = ObjectWriter::create(self.objects.as_ref(), object)?;
        let mut pending = PendingContent::new(self.contents.as_ref(), &self.staging);
        let object = writer.object_mut();
        for id in object.datastream_ids() {
            let datastream = object.remove_datastream(&id)?;
            let settled = self.settle_datastream(ctx, &pid, datastream, &mut pending)?;
            object.put_datastream(settled);
        }

        let report = IntegrityValidator::validate(object, &self.config.default_binding_target);
        if !report.is_valid() {
            return Err(ManagementError::general(report.summary()));
        }

        let now = Timestamp::now_after(object.last_mod_date.max(object.create_date));
        if object.create_date.is_none() {
            object.create_date = Some(now);
        }
        self.finish(writer, ctx, Action::Ingest, None, now, log_message)?;
        pending.keep();
        Ok(pid)
    }

    /// Move every managed version's bytes into the content store under its
    /// internal id and verify declared checksums.
    fn settle_datastream(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        datastream: Datastream,
        pending: &mut PendingContent<'_>,
    ) -> ManagementResult<Datastream> {
        let mut settled = Datastream::new(datastream.id.clone(), datastream.control_group);
        settled.state = datastream.state;
        settled.versionable = datastream.versionable;

        for version in datastream.versions() {
            let mut version = version.clone();
            let data = match &version.content {
                Content::Inline(xml) => Some(xml.clone()),
                Content::Managed(managed) => {
                    let target = internal_content_id(pid, &datastream.id, &version.version_id);
                    let data = match managed {
                        ManagedContent::Embedded(data) => data.clone(),
                        ManagedContent::Location(loc) => self.load_location(ctx, loc, pending)?,
                    };
                    let already_stored = matches!(managed, ManagedContent::Location(loc) if *loc == target);
                    if !already_stored {
                        pending.put(&target, data.clone())?;
                    }
                    version.content = Content::Managed(ManagedContent::Location(target));
                    Some(data)
                }
                Content::Referenced(_) => None,
            };

            if let Some(data) = data {
                let declared = &version.checksum;
                if declared.kind.is_enabled() && declared.value != DISABLED_VALUE {
                    version.checksum = seal_checksum(declared.kind, Some(&declared.value), &data)?;
                } else if self.default_checksum.is_enabled() {
                    version.checksum = Checksum::compute(self.default_checksum, &data);
                }
                if version.size == 0 {
                    version.size = data.len() as u64;
                }
            }
            settled.push_version(version)?;
        }
        debug!(pid = %pid, datastream = %settled.id, versions = settled.version_count(), "datastream settled");
        Ok(settled)
    }

    /// Render an object in `format` under `context`.
    pub fn export(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        format: &str,
        context: TranslationContext,
        encoding: &str,
    ) -> ManagementResult<Vec<u8>> {
        self.authorize(ctx, Action::Export, Some(pid), None)?;
        let object = self.objects.read(pid, ReadView::Cached)?;
        let resolver = RepositoryContent {
            contents: self.contents.as_ref(),
            staging: &self.staging,
        };
        let mut out = Vec::new();
        self.translators
            .serialize(&object, &mut out, format, encoding, context, &resolver)?;
        Ok(out)
    }

    // ---- Object operations ----

    /// Change object properties. `None` leaves a property as it is.
    pub fn modify_object(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        state: Option<&str>,
        label: Option<&str>,
        owner_id: Option<&str>,
        log_message: &str,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::ModifyObject, Some(pid), None)?;
        let state = state.map(State::from_code).transpose()?;

        let mut writer = self.open(pid)?;
        let object = writer.object_mut();
        if let Some(state) = state {
            object.state = state;
        }
        if let Some(label) = label {
            object.label = label.to_string();
        }
        if let Some(owner_id) = owner_id {
            object.owner_id = owner_id.to_string();
        }
        let now = Timestamp::now_after(object.last_mod_date);
        self.finish(writer, ctx, Action::ModifyObject, None, now, log_message)?;
        Ok(now)
    }

    /// Remove an object and its managed content.
    pub fn purge_object(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        log_message: &str,
        force: bool,
    ) -> ManagementResult<Timestamp> {
        self.authorize(ctx, Action::PurgeObject, Some(pid), None)?;
        if force {
            return Err(ManagementError::general(
                "forced object removal is not supported",
            ));
        }
        let writer = self.open(pid)?;
        writer.purge()?;
        let prefix = format!("{pid}+");
        for id in self.contents.ids_with_prefix(&prefix)? {
            self.contents.delete(&id)?;
        }
        let now = Timestamp::now();
        info!(pid = %pid, subject = %ctx.subject, message = log_message, "object purged");
        Ok(now)
    }

    // ---- Reads ----

    pub fn get_object(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        view: ReadView,
    ) -> ManagementResult<Arc<DigitalObject>> {
        self.authorize(ctx, Action::GetObject, Some(pid), None)?;
        Ok(self.objects.read(pid, view)?)
    }

    /// The datastream version in effect at `as_of`, or the current one.
    pub fn get_datastream(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
        as_of: Option<Timestamp>,
    ) -> ManagementResult<DatastreamSnapshot> {
        self.authorize(ctx, Action::GetDatastream, Some(pid), Some(dsid))?;
        let object = self.objects.read(pid, ReadView::Cached)?;
        let datastream = existing_datastream(&object, pid, dsid)?;
        let version = match as_of {
            Some(at) => datastream.version_as_of(at),
            None => datastream.current(),
        }
        .ok_or_else(|| {
            ManagementError::general(format!("datastream {dsid} of {pid} has no version at that date"))
        })?;
        Ok(snapshot(datastream, version.clone()))
    }

    /// Every version of a datastream, newest first.
    pub fn get_datastream_history(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dsid: &str,
    ) -> ManagementResult<Vec<DatastreamSnapshot>> {
        self.authorize(ctx, Action::GetDatastream, Some(pid), Some(dsid))?;
        let object = self.objects.read(pid, ReadView::Cached)?;
        let datastream = existing_datastream(&object, pid, dsid)?;
        Ok(datastream
            .versions()
            .iter()
            .rev()
            .map(|v| snapshot(datastream, v.clone()))
            .collect())
    }

    pub fn get_disseminator(
        &self,
        ctx: &CallContext,
        pid: &Pid,
        dissid: &str,
        as_of: Option<Timestamp>,
    ) -> ManagementResult<DisseminatorSnapshot> {
        self.authorize(ctx, Action::GetDisseminator, Some(pid), Some(dissid))?;
        let object = self.objects.read(pid, ReadView::Cached)?;
        let disseminator = object.disseminator(dissid).ok_or_else(|| {
            ManagementError::general(format!("disseminator {dissid} not found on {pid}"))
        })?;
        let version = match as_of {
            Some(at) => disseminator.version_as_of(at),
            None => disseminator.current(),
        }
        .ok_or_else(|| {
            ManagementError::general(format!(
                "disseminator {dissid} of {pid} has no version at that date"
            ))
        })?;
        Ok(DisseminatorSnapshot {
            id: disseminator.id.clone(),
            bdef_pid: disseminator.bdef_pid.clone(),
            state: disseminator.state,
            versionable: disseminator.versionable,
            version: version.clone(),
        })
    }

    // ---- Staging and pids ----

    /// Stage uploaded bytes for a later add or modify. Returns the
    /// `uploaded://N` id to pass as a location.
    pub fn put_temp_stream(&self, ctx: &CallContext, data: Vec<u8>) -> ManagementResult<String> {
        self.authorize(ctx, Action::PutTempStream, None, None)?;
        Ok(self.staging.put(data))
    }

    /// Reserve `count` new pids. `None` uses the configured namespace.
    pub fn get_next_pid(
        &self,
        ctx: &CallContext,
        namespace: Option<&str>,
        count: usize,
    ) -> ManagementResult<Vec<Pid>> {
        self.authorize(ctx, Action::GetNextPid, None, None)?;
        let namespace = namespace.unwrap_or(&self.config.pid_namespace);
        let limit = self.config.max_pids_per_request;
        if count > limit {
            return Err(ManagementError::validation(format!(
                "cannot reserve {count} pids in one request, the limit is {limit}"
            )));
        }
        Ok(self.pids.generate(namespace, count.max(1))?)
    }

    /// Disseminators whose current binding map names `dsid` and fails its
    /// mechanism's contract, with the reason.
    pub(crate) fn contract_problems(
        &self,
        object: &DigitalObject,
        dsid: &str,
    ) -> BTreeMap<String, String> {
        let target = self.config.default_binding_target.as_str();
        let mut problems = BTreeMap::new();
        for disseminator in object.disseminators() {
            let Some(current) = disseminator.current() else {
                continue;
            };
            if !current.binding_map.binds(dsid, target) {
                continue;
            }
            let verdict = self.contracts.resolve(&current.bmech_pid).and_then(|contract| {
                contract
                    .check(object, &current.binding_map, target)
                    .map_err(ManagementError::General)
            });
            if let Err(e) = verdict {
                problems.insert(disseminator.id.clone(), e.to_string());
            }
        }
        problems
    }
}

pub(crate) fn existing_datastream<'a>(
    object: &'a DigitalObject,
    pid: &Pid,
    dsid: &str,
) -> ManagementResult<&'a Datastream> {
    object
        .datastream(dsid)
        .ok_or_else(|| ManagementError::general(format!("datastream {dsid} not found on {pid}")))
}

fn snapshot(datastream: &Datastream, version: dor_model::DatastreamVersion) -> DatastreamSnapshot {
    DatastreamSnapshot {
        id: datastream.id.clone(),
        control_group: datastream.control_group,
        state: datastream.state,
        versionable: datastream.versionable,
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use dor_gate::{GateConfig, Policy, PolicyRule, PolicyScope};
    use dor_store::StoreError;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<foxml:digitalObject VERSION="1.1" PID="demo:1"
    xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Active"/>
    <foxml:property NAME="info:fedora/fedora-system:def/model#label" VALUE="Sample"/>
  </foxml:objectProperties>
  <foxml:datastream ID="DC" STATE="A" CONTROL_GROUP="X" VERSIONABLE="true">
    <foxml:datastreamVersion ID="DC.0" LABEL="Dublin Core" CREATED="2023-11-14T22:13:20.000Z" MIMETYPE="text/xml">
      <foxml:xmlContent><dc>A</dc></foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
  <foxml:datastream ID="IMG" STATE="A" CONTROL_GROUP="M" VERSIONABLE="true">
    <foxml:datastreamVersion ID="IMG.0" LABEL="Image" CREATED="2023-11-14T22:13:21.000Z" MIMETYPE="image/png">
      <foxml:binaryContent>aGVsbG8=</foxml:binaryContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
</foxml:digitalObject>"#;

    fn repo() -> Management {
        Management::in_memory(RepositoryConfig::default()).unwrap()
    }

    fn ctx() -> CallContext {
        CallContext::new("fedoraAdmin")
    }

    fn ingest(repo: &Management, doc: &str) -> Pid {
        repo.ingest(&ctx(), &mut doc.as_bytes(), "foxml1.1", "UTF-8", "initial")
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    #[test]
    fn ingest_stores_embedded_bytes_under_internal_id() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        let obj = repo.get_object(&ctx(), &pid, ReadView::Definitive).unwrap();
        let img = obj.datastream("IMG").unwrap().current().unwrap();
        assert_eq!(
            img.content,
            Content::Managed(ManagedContent::Location("demo:1+IMG+IMG.0".into()))
        );
        assert_eq!(img.size, 5);
        assert_eq!(repo.managed_content("demo:1+IMG+IMG.0").unwrap(), b"hello");
    }

    #[test]
    fn ingest_appends_one_audit_record() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        let obj = repo.get_object(&ctx(), &pid, ReadView::Cached).unwrap();
        let records = obj.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "AUDREC1");
        assert_eq!(records[0].action, "ingest");
        assert_eq!(records[0].responsibility, "fedoraAdmin");
        assert_eq!(records[0].justification, "initial");
        assert!(obj.create_date.is_some());
        assert_eq!(obj.last_mod_date, Some(records[0].date));
    }

    #[test]
    fn ingest_twice_fails() {
        let repo = repo();
        ingest(&repo, DOC);
        let err = repo
            .ingest(&ctx(), &mut DOC.as_bytes(), "foxml1.1", "UTF-8", "again")
            .unwrap_err();
        assert!(matches!(err, ManagementError::General(_)));
    }

    #[test]
    fn ingest_without_pid_generates_one() {
        let repo = Management::in_memory(RepositoryConfig {
            pid_namespace: "test".into(),
            ..Default::default()
        })
        .unwrap();
        let doc = DOC.replace(r#"PID="demo:1""#, r#"PID="""#);
        let pid = ingest(&repo, &doc);
        assert_eq!(pid.as_str(), "test:1");
        assert!(repo.managed_content("test:1+IMG+IMG.0").is_ok());
    }

    #[test]
    fn ingest_fetches_migration_paths() {
        let fetcher = StaticFetcher::new().with(
            "http://old.example/fedora/get/demo:1/IMG/2023-11-14T22:13:21.000Z",
            "old bytes",
        );
        let repo = Management::in_memory(RepositoryConfig {
            migration_base_url: "http://old.example/fedora/".into(),
            ..Default::default()
        })
        .unwrap()
        .with_fetcher(Arc::new(fetcher));
        let doc = DOC.replace(
            "<foxml:binaryContent>aGVsbG8=</foxml:binaryContent>",
            r#"<foxml:contentLocation TYPE="URL" REF="/get/demo:1/IMG/2023-11-14T22:13:21.000Z"/>"#,
        );
        ingest(&repo, &doc);
        assert_eq!(repo.managed_content("demo:1+IMG+IMG.0").unwrap(), b"old bytes");
    }

    #[test]
    fn ingest_rejects_wrong_declared_checksum() {
        let repo = repo();
        let doc = DOC.replace(
            "<foxml:binaryContent>",
            r#"<foxml:contentDigest TYPE="MD5" DIGEST="deadbeef"/><foxml:binaryContent>"#,
        );
        let err = repo
            .ingest(&ctx(), &mut doc.as_bytes(), "foxml1.1", "UTF-8", "")
            .unwrap_err();
        assert!(err.to_string().starts_with("Checksum Mismatch: "));
        assert!(repo.managed_content("demo:1+IMG+IMG.0").is_err());
        assert!(!repo.objects.exists(&Pid::parse("demo:1").unwrap()).unwrap());
    }

    #[test]
    fn ingest_resolves_staged_uploads() {
        let repo = repo();
        let upload = repo.put_temp_stream(&ctx(), b"staged".to_vec()).unwrap();
        let doc = DOC.replace(
            "<foxml:binaryContent>aGVsbG8=</foxml:binaryContent>",
            &format!(r#"<foxml:contentLocation TYPE="INTERNAL_ID" REF="{upload}"/>"#),
        );
        ingest(&repo, &doc);
        assert_eq!(repo.managed_content("demo:1+IMG+IMG.0").unwrap(), b"staged");
        assert!(repo.staging.get(&upload).is_err());
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    #[test]
    fn archival_export_embeds_stored_bytes() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        let doc = repo
            .export(&ctx(), &pid, "foxml1.1", TranslationContext::Archival, "UTF-8")
            .unwrap();
        let text = String::from_utf8(doc).unwrap();
        assert!(text.contains("aGVsbG8="));
        assert!(text.contains("AUDREC1"));
    }

    #[test]
    fn public_export_uses_public_urls() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        let doc = repo
            .export(&ctx(), &pid, "foxml", TranslationContext::Public, "UTF-8")
            .unwrap();
        let text = String::from_utf8(doc).unwrap();
        assert!(text.contains("http://localhost:8080/fedora/get/demo:1/IMG/2023-11-14T22:13:21.000Z"));
    }

    // -----------------------------------------------------------------------
    // Object operations
    // -----------------------------------------------------------------------

    #[test]
    fn modify_object_updates_properties() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        let date = repo
            .modify_object(&ctx(), &pid, Some("I"), Some("Renamed"), None, "rename")
            .unwrap();
        let obj = repo.get_object(&ctx(), &pid, ReadView::Definitive).unwrap();
        assert_eq!(obj.state, State::Inactive);
        assert_eq!(obj.label, "Renamed");
        assert_eq!(obj.last_mod_date, Some(date));
        assert_eq!(obj.audit_records().last().unwrap().action, "modifyObject");
    }

    #[test]
    fn modify_object_rejects_bad_state() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        let err = repo
            .modify_object(&ctx(), &pid, Some("X"), None, None, "")
            .unwrap_err();
        assert!(matches!(err, ManagementError::Validation(_)));
    }

    #[test]
    fn purge_object_removes_object_and_content() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        assert!(repo.purge_object(&ctx(), &pid, "bye", true).is_err());
        repo.purge_object(&ctx(), &pid, "bye", false).unwrap();
        assert!(matches!(
            repo.get_object(&ctx(), &pid, ReadView::Definitive),
            Err(ManagementError::ObjectNotFound(_))
        ));
        assert!(repo.managed_content("demo:1+IMG+IMG.0").is_err());
    }

    #[test]
    fn missing_object_is_reported() {
        let repo = repo();
        let pid = Pid::parse("demo:404").unwrap();
        let err = repo
            .modify_object(&ctx(), &pid, None, Some("x"), None, "")
            .unwrap_err();
        assert!(matches!(err, ManagementError::ObjectNotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Gate, staging and pids
    // -----------------------------------------------------------------------

    #[test]
    fn refused_calls_are_opaque() {
        let mut gate = GateConfig::default();
        gate.policies.push(Policy {
            id: "read-only".into(),
            name: "Read only".into(),
            rules: vec![PolicyRule::ReadOnly],
            applies_to: PolicyScope::All,
        });
        let repo = Management::in_memory(RepositoryConfig {
            gate,
            ..Default::default()
        })
        .unwrap();
        let err = repo
            .ingest(&ctx(), &mut DOC.as_bytes(), "foxml1.1", "UTF-8", "")
            .unwrap_err();
        assert!(matches!(err, ManagementError::NotAuthorized));
        assert_eq!(err.to_string(), "not authorized");
    }

    #[test]
    fn staged_ids_are_read_back_as_staged_locations() {
        let repo = repo();
        let id = repo.put_temp_stream(&ctx(), b"upload".to_vec()).unwrap();
        assert!(id.starts_with(dor_types::STAGING_SCHEME));
        assert_eq!(classify(&id).unwrap(), LocationKind::Staged);
    }

    #[test]
    fn next_pids_follow_namespace() {
        let repo = repo();
        let pids = repo.get_next_pid(&ctx(), Some("demo"), 2).unwrap();
        assert_eq!(pids[0].as_str(), "demo:1");
        assert_eq!(pids[1].as_str(), "demo:2");
        let pid = ingest(&repo, &DOC.replace("demo:1", "demo:7"));
        assert_eq!(pid.as_str(), "demo:7");
        let next = repo.get_next_pid(&ctx(), Some("demo"), 1).unwrap();
        assert_eq!(next[0].as_str(), "demo:8");
    }

    #[test]
    fn exhausted_namespace_fails_without_panicking() {
        let repo = repo();
        ingest(&repo, &DOC.replace("demo:1", "demo:18446744073709551615"));
        let err = repo.get_next_pid(&ctx(), Some("demo"), 1).unwrap_err();
        assert!(
            matches!(err, ManagementError::Store(StoreError::Allocation(_))),
            "{err:?}"
        );
        assert_eq!(repo.get_next_pid(&ctx(), Some("test"), 1).unwrap()[0].as_str(), "test:1");
    }

    #[test]
    fn oversized_pid_request_is_refused() {
        let repo = repo();
        for count in [usize::MAX, repo.config().max_pids_per_request + 1] {
            let err = repo.get_next_pid(&ctx(), Some("demo"), count).unwrap_err();
            assert!(matches!(err, ManagementError::Validation(_)), "{err:?}");
        }
        let limit = repo.config().max_pids_per_request;
        let pids = repo.get_next_pid(&ctx(), Some("demo"), limit).unwrap();
        assert_eq!(pids.len(), limit);
        assert_eq!(pids[0].as_str(), "demo:1");
    }

    #[test]
    fn history_is_newest_first() {
        let repo = repo();
        let pid = ingest(&repo, DOC);
        let history = repo.get_datastream_history(&ctx(), &pid, "DC").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version.version_id, "DC.0");
        assert_eq!(history[0].control_group, dor_types::ControlGroup::Inline);
        assert!(repo.get_datastream(&ctx(), &pid, "NOPE", None).is_err());
    }
}
