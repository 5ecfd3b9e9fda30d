//! The legacy METS packaging dialect (serialize only).
//!
//! Inline datastreams are placed into descriptive or administrative metadata
//! sections according to the classification decoded from their format URI;
//! managed and referenced datastreams go into the file section. Each
//! disseminator version becomes a structure map plus a behavior section
//! pointing at it.

use std::io::Write;

use tracing::debug;

use dor_model::{
    Datastream, DatastreamVersion, DigitalObject, Disseminator, LegacyMetadata, MetadataClass,
};
use dor_types::{ControlGroup, Pid};

use crate::audit;
use crate::context::{ContentResolver, TranslationConfig, TranslationContext};
use crate::dispatch::Serializer;
use crate::error::{TranslationError, TranslationResult};
use crate::foxml::{root_declarations, AUDIT_LABEL};
use crate::namespace::{METS_NS, METS_PREFIX, XLINK_NS};
use crate::render::{self, Rendered};
use crate::xml::{self, XmlOut};

pub const FORMAT: &str = "mets";

/// Profile URI written on the root element.
pub const PROFILE: &str = "fedora:mets";

/// Structure map type of a disseminator's binding map.
const BINDING_MAP_TYPE: &str = "fedora:dsBindingMap";

/// Writes METS documents.
pub struct MetsSerializer {
    config: TranslationConfig,
}

impl MetsSerializer {
    pub fn new(config: TranslationConfig) -> Self {
        Self { config }
    }

    /// Build the whole document in memory.
    pub fn render(
        &self,
        object: &DigitalObject,
        context: TranslationContext,
        resolver: &dyn ContentResolver,
    ) -> TranslationResult<Vec<u8>> {
        let pid = object
            .pid()
            .ok_or_else(|| TranslationError::integrity("object has no pid"))?;
        MetsWriter {
            object,
            pid,
            config: &self.config,
            context,
            resolver,
            out: XmlOut::new(),
        }
        .write()
    }
}

impl Serializer for MetsSerializer {
    fn serialize(
        &mut self,
        object: &DigitalObject,
        sink: &mut dyn Write,
        context: TranslationContext,
        resolver: &dyn ContentResolver,
    ) -> TranslationResult<()> {
        let document = self.render(object, context, resolver)?;
        xml::emit(&document, sink)
    }
}

fn status(datastream: &Datastream) -> &'static str {
    datastream.state.code()
}

/// Section a version's inline content belongs in. Unclassified inline
/// content is treated as descriptive.
fn class_of(version: &DatastreamVersion) -> MetadataClass {
    version
        .legacy_metadata
        .as_ref()
        .map(|m| m.class)
        .unwrap_or(MetadataClass::Descriptive)
}

struct MetsWriter<'a> {
    object: &'a DigitalObject,
    pid: &'a Pid,
    config: &'a TranslationConfig,
    context: TranslationContext,
    resolver: &'a dyn ContentResolver,
    out: XmlOut,
}

impl<'a> MetsWriter<'a> {
    fn write(mut self) -> TranslationResult<Vec<u8>> {
        let object = self.object;
        self.out.decl()?;

        let mut attrs = vec![
            (format!("xmlns:{METS_PREFIX}"), METS_NS.to_string()),
            ("xmlns:xlink".to_string(), XLINK_NS.to_string()),
        ];
        // The FOXML prefix is not used here, but the object's own prefixes
        // may be referenced by inline content.
        attrs.extend(
            root_declarations(object)
                .into_iter()
                .filter(|(k, _)| k != "xmlns:foxml"),
        );
        attrs.extend([
            ("OBJID".to_string(), self.pid.to_string()),
            ("TYPE".to_string(), object.object_type.rdf_type().to_string()),
            ("LABEL".to_string(), object.label.clone()),
            ("PROFILE".to_string(), PROFILE.to_string()),
        ]);
        self.out.start("METS:mets", &xml::borrowed(&attrs))?;

        self.write_header()?;
        self.write_descriptive()?;
        if !object.audit_records().is_empty() {
            self.write_audit()?;
        }
        self.write_administrative()?;
        self.write_files()?;
        for disseminator in object.disseminators() {
            self.write_struct_maps(disseminator)?;
        }
        for disseminator in object.disseminators() {
            self.write_behaviors(disseminator)?;
        }

        self.out.end("METS:mets")?;
        debug!(pid = %self.pid, context = %self.context, "mets document built");
        Ok(self.out.into_bytes())
    }

    fn write_header(&mut self) -> TranslationResult<()> {
        let object = self.object;
        let created = object.create_date.map(|t| t.to_string());
        let modified = object.last_mod_date.map(|t| t.to_string());
        let mut attrs = Vec::new();
        if let Some(created) = &created {
            attrs.push(("CREATEDATE", created.as_str()));
        }
        if let Some(modified) = &modified {
            attrs.push(("LASTMODDATE", modified.as_str()));
        }
        attrs.push(("RECORDSTATUS", object.state.code()));
        self.out.start("METS:metsHdr", &attrs)?;
        self.out
            .start("METS:agent", &[("ROLE", "IPOWNER"), ("TYPE", "INDIVIDUAL")])?;
        self.out
            .text_element("METS:name", &[], &object.owner_id)?;
        self.out.end("METS:agent")?;
        self.out.end("METS:metsHdr")
    }

    /// `mdWrap` around one inline version.
    fn write_md_wrap(&mut self, dsid: &str, version: &DatastreamVersion) -> TranslationResult<()> {
        let (md_type, other) = match &version.legacy_metadata {
            Some(LegacyMetadata {
                md_type,
                other_md_type,
                ..
            }) => (md_type.as_str(), other_md_type.as_deref()),
            None => ("OTHER", Some("UNSPECIFIED")),
        };
        let mut attrs = vec![
            ("MIMETYPE", version.mime_type.as_str()),
            ("LABEL", version.label.as_str()),
            ("MDTYPE", md_type),
        ];
        if let Some(other) = other {
            attrs.push(("OTHERMDTYPE", other));
        }
        self.out.start("METS:mdWrap", &attrs)?;
        self.out.start("METS:xmlData", &[])?;
        match render::render(
            self.object,
            self.pid,
            dsid,
            version,
            self.config,
            self.context,
            self.resolver,
        )? {
            Rendered::Xml(bytes) => self.out.fragment(&bytes)?,
            _ => {
                return Err(TranslationError::integrity(format!(
                    "inline datastream {dsid} has non-inline content"
                )))
            }
        }
        self.out.end("METS:xmlData")?;
        self.out.end("METS:mdWrap")
    }

    fn inline_datastreams(&self) -> impl Iterator<Item = &'a Datastream> {
        self.object
            .datastreams()
            .filter(|ds| ds.control_group == ControlGroup::Inline)
    }

    fn write_descriptive(&mut self) -> TranslationResult<()> {
        let descriptive: Vec<&Datastream> = self
            .inline_datastreams()
            .filter(|ds| ds.current().map(class_of) == Some(MetadataClass::Descriptive))
            .collect();
        for ds in descriptive {
            for version in ds.versions() {
                let created = version.created.to_string();
                self.out.start(
                    "METS:dmdSec",
                    &[
                        ("ID", version.version_id.as_str()),
                        ("GROUPID", ds.id.as_str()),
                        ("CREATED", created.as_str()),
                        ("STATUS", status(ds)),
                    ],
                )?;
                self.write_md_wrap(&ds.id, version)?;
                self.out.end("METS:dmdSec")?;
            }
        }
        Ok(())
    }

    fn write_audit(&mut self) -> TranslationResult<()> {
        let records = self.object.audit_records();
        self.out.start("METS:amdSec", &[("ID", "AUDIT")])?;
        for record in records {
            let created = record.date.to_string();
            self.out.start(
                "METS:digiprovMD",
                &[
                    ("ID", record.id.as_str()),
                    ("CREATED", created.as_str()),
                    ("STATUS", "A"),
                ],
            )?;
            self.out.start(
                "METS:mdWrap",
                &[
                    ("MIMETYPE", "text/xml"),
                    ("MDTYPE", "OTHER"),
                    ("OTHERMDTYPE", "FEDORA-AUDITTRAIL"),
                    ("LABEL", AUDIT_LABEL),
                ],
            )?;
            self.out.start("METS:xmlData", &[])?;
            audit::write_record(&mut self.out, record, true)?;
            self.out.end("METS:xmlData")?;
            self.out.end("METS:mdWrap")?;
            self.out.end("METS:digiprovMD")?;
        }
        self.out.end("METS:amdSec")
    }

    fn write_administrative(&mut self) -> TranslationResult<()> {
        let administrative: Vec<&Datastream> = self
            .inline_datastreams()
            .filter(|ds| {
                ds.current()
                    .map(class_of)
                    .is_some_and(|c| c.is_administrative())
            })
            .collect();
        for ds in administrative {
            self.out.start("METS:amdSec", &[("ID", ds.id.as_str())])?;
            for version in ds.versions() {
                let section = format!("METS:{}", class_of(version).section_name());
                let created = version.created.to_string();
                self.out.start(
                    &section,
                    &[
                        ("ID", version.version_id.as_str()),
                        ("CREATED", created.as_str()),
                        ("STATUS", status(ds)),
                    ],
                )?;
                self.write_md_wrap(&ds.id, version)?;
                self.out.end(&section)?;
            }
            self.out.end("METS:amdSec")?;
        }
        Ok(())
    }

    fn write_files(&mut self) -> TranslationResult<()> {
        let files: Vec<&Datastream> = self
            .object
            .datastreams()
            .filter(|ds| ds.control_group != ControlGroup::Inline)
            .collect();
        if files.is_empty() {
            return Ok(());
        }
        self.out.start("METS:fileSec", &[])?;
        self.out.start("METS:fileGrp", &[("ID", "DATASTREAMS")])?;
        for ds in files {
            self.out.start(
                "METS:fileGrp",
                &[("ID", ds.id.as_str()), ("STATUS", status(ds))],
            )?;
            for version in ds.versions() {
                self.write_file(ds, version)?;
            }
            self.out.end("METS:fileGrp")?;
        }
        self.out.end("METS:fileGrp")?;
        self.out.end("METS:fileSec")
    }

    fn write_file(&mut self, ds: &Datastream, version: &DatastreamVersion) -> TranslationResult<()> {
        let created = version.created.to_string();
        let size = version.size.to_string();
        let alt_ids = version.alt_ids.join(" ");
        let mut attrs = vec![
            ("ID", version.version_id.as_str()),
            ("CREATED", created.as_str()),
            ("MIMETYPE", version.mime_type.as_str()),
            ("OWNERID", ds.control_group.code()),
            ("STATUS", status(ds)),
            ("SIZE", size.as_str()),
        ];
        if let Some(format_uri) = &version.format_uri {
            attrs.push(("FORMAT_URI", format_uri.as_str()));
        }
        if !alt_ids.is_empty() {
            attrs.push(("ALT_IDS", alt_ids.as_str()));
        }
        if version.checksum.kind.is_enabled() {
            attrs.push(("CHECKSUM", version.checksum.value.as_str()));
            attrs.push(("CHECKSUMTYPE", version.checksum.kind.name()));
        }
        self.out.start("METS:file", &attrs)?;
        match render::render(
            self.object,
            self.pid,
            &ds.id,
            version,
            self.config,
            self.context,
            self.resolver,
        )? {
            Rendered::Location { href, .. } => {
                self.out.empty(
                    "METS:FLocat",
                    &[
                        ("LOCTYPE", "URL"),
                        ("xlink:href", href.as_str()),
                        ("xlink:title", version.label.as_str()),
                    ],
                )?;
            }
            Rendered::Binary(text) => {
                self.out.start("METS:FContent", &[])?;
                self.out.text_element("METS:binData", &[], &text)?;
                self.out.end("METS:FContent")?;
            }
            Rendered::Xml(_) => {
                return Err(TranslationError::integrity(format!(
                    "file datastream {} has inline content",
                    ds.id
                )))
            }
        }
        self.out.end("METS:file")
    }

    fn write_struct_maps(&mut self, disseminator: &Disseminator) -> TranslationResult<()> {
        let default_target = self.config.default_binding_target.as_str();
        for version in disseminator.versions() {
            let struct_id = format!("{}.STRUCT", version.version_id);
            let bmech = version.bmech_pid.to_string();
            self.out.start(
                "METS:structMap",
                &[("ID", struct_id.as_str()), ("TYPE", BINDING_MAP_TYPE)],
            )?;
            self.out.start(
                "METS:div",
                &[
                    ("TYPE", bmech.as_str()),
                    ("LABEL", version.binding_map.label.as_str()),
                ],
            )?;
            for binding in &version.binding_map.bindings {
                let order = binding.order.to_string();
                self.out.start(
                    "METS:div",
                    &[
                        ("TYPE", binding.bind_key.as_str()),
                        ("LABEL", binding.label.as_str()),
                        ("ORDER", order.as_str()),
                    ],
                )?;
                self.out.empty(
                    "METS:fptr",
                    &[("FILEID", binding.resolved_datastream_id(default_target))],
                )?;
                self.out.end("METS:div")?;
            }
            self.out.end("METS:div")?;
            self.out.end("METS:structMap")?;
        }
        Ok(())
    }

    fn write_behaviors(&mut self, disseminator: &Disseminator) -> TranslationResult<()> {
        let bdef = disseminator.bdef_pid.to_string();
        for version in disseminator.versions() {
            let struct_id = format!("{}.STRUCT", version.version_id);
            let created = version.created.to_string();
            let bmech = version.bmech_pid.to_string();
            self.out.start(
                "METS:behaviorSec",
                &[
                    ("ID", version.version_id.as_str()),
                    ("STRUCTID", struct_id.as_str()),
                    ("BTYPE", bdef.as_str()),
                    ("CREATED", created.as_str()),
                    ("LABEL", version.label.as_str()),
                    ("GROUPID", disseminator.id.as_str()),
                    ("STATUS", disseminator.state.code()),
                ],
            )?;
            self.out.empty(
                "METS:interfaceDef",
                &[("LOCTYPE", "URN"), ("xlink:href", bdef.as_str())],
            )?;
            self.out.empty(
                "METS:mechanism",
                &[("LOCTYPE", "URN"), ("xlink:href", bmech.as_str())],
            )?;
            self.out.end("METS:behaviorSec")?;
        }
        Ok(())
    }
}
