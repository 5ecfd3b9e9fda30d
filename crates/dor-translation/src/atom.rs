//! The Atom feed dialect (serialize only).
//!
//! One entry per datastream and disseminator, plus one entry per version
//! threaded to its component with `thr:in-reply-to`. Component attributes
//! travel as categories whose scheme is a model property URI.

use std::io::Write;

use tracing::debug;

use dor_model::{Datastream, DatastreamVersion, DigitalObject, Disseminator};
use dor_types::{Pid, Timestamp};

use crate::audit;
use crate::context::{ContentResolver, TranslationConfig, TranslationContext};
use crate::dispatch::Serializer;
use crate::error::{TranslationError, TranslationResult};
use crate::foxml::AUDIT_LABEL;
use crate::namespace::{
    ATOM_NS, AUDIT_FORMAT_URI, MODEL_NS, PROP_CONTENT_MODEL, PROP_CREATED, PROP_STATE, RDF_TYPE,
    THREAD_NS,
};
use crate::render::{self, Rendered};
use crate::xml::{self, XmlOut};

pub const FORMAT: &str = "atom";

fn info_uri(parts: &[&str]) -> String {
    format!("info:fedora/{}", parts.join("/"))
}

fn scheme(name: &str) -> String {
    format!("{MODEL_NS}{name}")
}

/// Writes Atom feeds.
pub struct AtomSerializer {
    config: TranslationConfig,
}

impl AtomSerializer {
    pub fn new(config: TranslationConfig) -> Self {
        Self { config }
    }

    /// Build the whole feed in memory.
    pub fn render(
        &self,
        object: &DigitalObject,
        context: TranslationContext,
        resolver: &dyn ContentResolver,
    ) -> TranslationResult<Vec<u8>> {
        let pid = object
            .pid()
            .ok_or_else(|| TranslationError::integrity("object has no pid"))?;
        AtomWriter {
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

impl Serializer for AtomSerializer {
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

struct AtomWriter<'a> {
    object: &'a DigitalObject,
    pid: &'a Pid,
    config: &'a TranslationConfig,
    context: TranslationContext,
    resolver: &'a dyn ContentResolver,
    out: XmlOut,
}

impl<'a> AtomWriter<'a> {
    fn write(mut self) -> TranslationResult<Vec<u8>> {
        let object = self.object;
        let pid = Pid::as_str(self.pid);
        self.out.decl()?;
        self.out
            .start("feed", &[("xmlns", ATOM_NS), ("xmlns:thr", THREAD_NS)])?;

        let updated = object
            .last_mod_date
            .or(object.create_date)
            .unwrap_or_else(Timestamp::now)
            .to_string();
        self.out.text_element("id", &[], &info_uri(&[pid]))?;
        self.out.text_element("title", &[("type", "text")], &object.label)?;
        self.out.text_element("updated", &[], &updated)?;
        self.out.start("author", &[])?;
        self.out.text_element("name", &[], &object.owner_id)?;
        self.out.end("author")?;
        self.category(PROP_STATE, object.state.name(), None)?;
        self.category(RDF_TYPE, object.object_type.rdf_type(), None)?;
        if let Some(created) = object.create_date {
            self.category(PROP_CREATED, &created.to_string(), None)?;
        }
        if !object.content_model_id.is_empty() {
            self.category(PROP_CONTENT_MODEL, &object.content_model_id, None)?;
        }
        for (name, value) in &object.properties {
            self.category(name, value, None)?;
        }

        if !object.audit_records().is_empty() {
            self.write_audit()?;
        }
        for datastream in object.datastreams() {
            self.write_datastream(datastream)?;
        }
        for disseminator in object.disseminators() {
            self.write_disseminator(disseminator)?;
        }

        self.out.end("feed")?;
        debug!(pid = %self.pid, context = %self.context, "atom feed built");
        Ok(self.out.into_bytes())
    }

    fn category(&mut self, scheme: &str, term: &str, label: Option<&str>) -> TranslationResult<()> {
        let mut attrs = vec![("scheme", scheme), ("term", term)];
        if let Some(label) = label {
            attrs.push(("label", label));
        }
        self.out.empty("category", &attrs)
    }

    /// Open an entry and write the fields every entry has.
    fn open_entry(&mut self, id: &str, title: &str, updated: &str) -> TranslationResult<()> {
        self.out.start("entry", &[])?;
        self.out.text_element("id", &[], id)?;
        self.out.text_element("title", &[("type", "text")], title)?;
        self.out.text_element("updated", &[], updated)
    }

    fn in_reply_to(&mut self, parent: &str) -> TranslationResult<()> {
        self.out.empty("thr:in-reply-to", &[("ref", parent)])
    }

    fn write_audit(&mut self) -> TranslationResult<()> {
        let pid = Pid::as_str(self.pid);
        let records = self.object.audit_records();
        let created = records
            .first()
            .map(|r| r.date.to_string())
            .unwrap_or_default();
        let updated = records
            .last()
            .map(|r| r.date.to_string())
            .unwrap_or_default();
        let parent = info_uri(&[pid, "AUDIT"]);

        self.open_entry(&parent, "AUDIT", &updated)?;
        self.category(&scheme("state"), "A", None)?;
        self.category(&scheme("controlGroup"), "X", None)?;
        self.category(&scheme("versionable"), "false", None)?;
        self.out.end("entry")?;

        self.open_entry(&info_uri(&[pid, "AUDIT", &created]), "AUDIT.0", &created)?;
        self.in_reply_to(&parent)?;
        self.category(&scheme("formatURI"), AUDIT_FORMAT_URI, None)?;
        self.category(&scheme("label"), AUDIT_LABEL, None)?;
        self.out.start("content", &[("type", "text/xml")])?;
        audit::write_trail(&mut self.out, records)?;
        self.out.end("content")?;
        self.out.end("entry")
    }

    fn write_datastream(&mut self, datastream: &Datastream) -> TranslationResult<()> {
        let pid = Pid::as_str(self.pid);
        let parent = info_uri(&[pid, &datastream.id]);
        let updated = datastream
            .current()
            .map(|v| v.created.to_string())
            .unwrap_or_default();

        self.open_entry(&parent, &datastream.id, &updated)?;
        self.category(&scheme("state"), datastream.state.code(), None)?;
        self.category(&scheme("controlGroup"), datastream.control_group.code(), None)?;
        self.category(
            &scheme("versionable"),
            if datastream.versionable { "true" } else { "false" },
            None,
        )?;
        self.out.end("entry")?;

        for version in datastream.versions() {
            self.write_datastream_version(datastream, version, &parent)?;
        }
        Ok(())
    }

    fn write_datastream_version(
        &mut self,
        datastream: &Datastream,
        version: &DatastreamVersion,
        parent: &str,
    ) -> TranslationResult<()> {
        let created = version.created.to_string();
        let id = info_uri(&[self.pid.as_str(), &datastream.id, &created]);
        self.open_entry(&id, &version.version_id, &created)?;
        self.in_reply_to(parent)?;
        self.category(&scheme("label"), &version.label, None)?;
        if let Some(format_uri) = &version.format_uri {
            self.category(&scheme("formatURI"), format_uri, None)?;
        }
        for alt_id in &version.alt_ids {
            self.category(&scheme("altIds"), alt_id, None)?;
        }
        if version.checksum.kind.is_enabled() {
            self.category(&scheme("digestType"), version.checksum.kind.name(), None)?;
            self.category(&scheme("digest"), &version.checksum.value, None)?;
        }
        self.category(&scheme("length"), &version.size.to_string(), None)?;

        let mime = version.mime_type.as_str();
        match render::render(
            self.object,
            self.pid,
            &datastream.id,
            version,
            self.config,
            self.context,
            self.resolver,
        )? {
            Rendered::Xml(bytes) => {
                self.out.start("content", &[("type", mime)])?;
                self.out.fragment(&bytes)?;
                self.out.end("content")?;
            }
            Rendered::Binary(text) => {
                self.out.text_element("content", &[("type", mime)], &text)?;
            }
            Rendered::Location { href, .. } => {
                self.out
                    .empty("content", &[("type", mime), ("src", href.as_str())])?;
            }
        }
        self.out.end("entry")
    }

    fn write_disseminator(&mut self, disseminator: &Disseminator) -> TranslationResult<()> {
        let pid = Pid::as_str(self.pid);
        let parent = info_uri(&[pid, &disseminator.id]);
        let bdef = disseminator.bdef_pid.to_string();
        let updated = disseminator
            .current()
            .map(|v| v.created.to_string())
            .unwrap_or_default();

        self.open_entry(&parent, &disseminator.id, &updated)?;
        self.category(&scheme("state"), disseminator.state.code(), None)?;
        self.category(&scheme("bDefPid"), &bdef, None)?;
        self.category(
            &scheme("versionable"),
            if disseminator.versionable { "true" } else { "false" },
            None,
        )?;
        self.out.end("entry")?;

        let default_target = self.config.default_binding_target.clone();
        for version in disseminator.versions() {
            let created = version.created.to_string();
            let id = info_uri(&[pid, &disseminator.id, &created]);
            self.open_entry(&id, &version.version_id, &created)?;
            self.in_reply_to(&parent)?;
            self.category(&scheme("label"), &version.label, None)?;
            self.category(&scheme("bMechPid"), version.bmech_pid.as_str(), None)?;
            if !version.binding_map.label.is_empty() {
                self.category(&scheme("bindingMapLabel"), &version.binding_map.label, None)?;
            }
            for binding in &version.binding_map.bindings {
                let term = format!(
                    "{}/{}",
                    binding.bind_key,
                    binding.resolved_datastream_id(&default_target)
                );
                let label = (!binding.label.is_empty()).then_some(binding.label.as_str());
                self.category(&scheme("binding"), &term, label)?;
            }
            self.out.end("entry")?;
        }
        Ok(())
    }
}
