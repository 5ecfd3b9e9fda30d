//! FOXML document builder.

use dor_model::{Datastream, DigitalObject, Disseminator};
use dor_types::{Pid, AUDIT_DATASTREAM_ID};

use crate::audit;
use crate::context::{ContentResolver, TranslationConfig, TranslationContext};
use crate::error::{TranslationError, TranslationResult};
use crate::namespace::{
    AUDIT_FORMAT_URI, PROP_CONTENT_MODEL, PROP_CREATED, PROP_LABEL, PROP_LAST_MODIFIED,
    PROP_OWNER, PROP_STATE, RDF_TYPE, STANDARD_DECLARATIONS,
};
use crate::render::{self, Rendered};
use crate::xml::{self, XmlOut};

pub(crate) const AUDIT_LABEL: &str = "Audit Trail for this object";

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Root namespace declarations: the standard set plus the object's own.
pub(crate) fn root_declarations(object: &DigitalObject) -> Vec<(String, String)> {
    let mut decls: Vec<(String, String)> = STANDARD_DECLARATIONS
        .iter()
        .map(|(p, u)| (format!("xmlns:{p}"), u.to_string()))
        .collect();
    for (prefix, uri) in &object.namespaces {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        if !decls.iter().any(|(k, _)| *k == key) {
            decls.push((key, uri.clone()));
        }
    }
    decls
}

pub(crate) struct FoxmlWriter<'a> {
    object: &'a DigitalObject,
    pid: &'a Pid,
    config: &'a TranslationConfig,
    context: TranslationContext,
    resolver: &'a dyn ContentResolver,
    out: XmlOut,
}

impl<'a> FoxmlWriter<'a> {
    pub(crate) fn new(
        object: &'a DigitalObject,
        config: &'a TranslationConfig,
        context: TranslationContext,
        resolver: &'a dyn ContentResolver,
    ) -> TranslationResult<Self> {
        let pid = object
            .pid()
            .ok_or_else(|| TranslationError::integrity("object has no pid"))?;
        Ok(Self {
            object,
            pid,
            config,
            context,
            resolver,
            out: XmlOut::new(),
        })
    }

    pub(crate) fn write(mut self) -> TranslationResult<Vec<u8>> {
        self.out.decl()?;
        let mut attrs = vec![
            ("VERSION".to_string(), "1.1".to_string()),
            ("PID".to_string(), self.pid.to_string()),
        ];
        attrs.extend(root_declarations(self.object));
        self.out
            .start("foxml:digitalObject", &xml::borrowed(&attrs))?;

        self.write_properties()?;
        if !self.object.audit_records().is_empty() {
            self.write_audit()?;
        }
        for datastream in self.object.datastreams() {
            self.write_datastream(datastream)?;
        }
        for disseminator in self.object.disseminators() {
            self.write_disseminator(disseminator)?;
        }

        self.out.end("foxml:digitalObject")?;
        Ok(self.out.into_bytes())
    }

    fn property(&mut self, element: &str, name: &str, value: &str) -> TranslationResult<()> {
        self.out
            .empty(element, &[("NAME", name), ("VALUE", value)])
    }

    fn write_properties(&mut self) -> TranslationResult<()> {
        let object = self.object;
        self.out.start("foxml:objectProperties", &[])?;
        self.property("foxml:property", RDF_TYPE, object.object_type.rdf_type())?;
        self.property("foxml:property", PROP_STATE, object.state.name())?;
        self.property("foxml:property", PROP_LABEL, &object.label)?;
        self.property("foxml:property", PROP_OWNER, &object.owner_id)?;
        if let Some(created) = object.create_date {
            self.property("foxml:property", PROP_CREATED, &created.to_string())?;
        }
        if let Some(modified) = object.last_mod_date {
            self.property("foxml:property", PROP_LAST_MODIFIED, &modified.to_string())?;
        }
        if !object.content_model_id.is_empty() {
            self.property("foxml:property", PROP_CONTENT_MODEL, &object.content_model_id)?;
        }
        for (name, value) in &object.properties {
            self.property("foxml:extproperty", name, value)?;
        }
        self.out.end("foxml:objectProperties")
    }

    fn write_audit(&mut self) -> TranslationResult<()> {
        let records = self.object.audit_records();
        let created = records
            .first()
            .map(|r| r.date.to_string())
            .unwrap_or_default();
        let version_id = format!("{AUDIT_DATASTREAM_ID}.0");
        self.out.start(
            "foxml:datastream",
            &[
                ("ID", AUDIT_DATASTREAM_ID),
                ("STATE", "A"),
                ("CONTROL_GROUP", "X"),
                ("VERSIONABLE", "false"),
            ],
        )?;
        self.out.start(
            "foxml:datastreamVersion",
            &[
                ("ID", version_id.as_str()),
                ("LABEL", AUDIT_LABEL),
                ("CREATED", created.as_str()),
                ("MIMETYPE", "text/xml"),
                ("FORMAT_URI", AUDIT_FORMAT_URI),
            ],
        )?;
        self.out.start("foxml:xmlContent", &[])?;
        audit::write_trail(&mut self.out, records)?;
        self.out.end("foxml:xmlContent")?;
        self.out.end("foxml:datastreamVersion")?;
        self.out.end("foxml:datastream")
    }

    fn write_datastream(&mut self, datastream: &Datastream) -> TranslationResult<()> {
        self.out.start(
            "foxml:datastream",
            &[
                ("ID", datastream.id.as_str()),
                ("STATE", datastream.state.code()),
                ("CONTROL_GROUP", datastream.control_group.code()),
                ("VERSIONABLE", bool_str(datastream.versionable)),
            ],
        )?;
        for version in datastream.versions() {
            let created = version.created.to_string();
            let size = version.size.to_string();
            let alt_ids = version.alt_ids.join(" ");
            let mut attrs = vec![
                ("ID", version.version_id.as_str()),
                ("LABEL", version.label.as_str()),
                ("CREATED", created.as_str()),
                ("MIMETYPE", version.mime_type.as_str()),
            ];
            if let Some(format_uri) = &version.format_uri {
                attrs.push(("FORMAT_URI", format_uri.as_str()));
            }
            if !alt_ids.is_empty() {
                attrs.push(("ALT_IDS", alt_ids.as_str()));
            }
            attrs.push(("SIZE", size.as_str()));
            self.out.start("foxml:datastreamVersion", &attrs)?;

            if version.checksum.kind.is_enabled() {
                self.out.empty(
                    "foxml:contentDigest",
                    &[
                        ("TYPE", version.checksum.kind.name()),
                        ("DIGEST", version.checksum.value.as_str()),
                    ],
                )?;
            }

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
                    self.out.start("foxml:xmlContent", &[])?;
                    self.out.fragment(&bytes)?;
                    self.out.end("foxml:xmlContent")?;
                }
                Rendered::Location { kind, href } => {
                    self.out.empty(
                        "foxml:contentLocation",
                        &[("TYPE", kind.foxml_type()), ("REF", href.as_str())],
                    )?;
                }
                Rendered::Binary(text) => {
                    self.out.text_element("foxml:binaryContent", &[], &text)?;
                }
            }
            self.out.end("foxml:datastreamVersion")?;
        }
        self.out.end("foxml:datastream")
    }

    fn write_disseminator(&mut self, disseminator: &Disseminator) -> TranslationResult<()> {
        let bdef = disseminator.bdef_pid.to_string();
        self.out.start(
            "foxml:disseminator",
            &[
                ("ID", disseminator.id.as_str()),
                ("BDEF_CONTRACT_PID", bdef.as_str()),
                ("STATE", disseminator.state.code()),
                ("VERSIONABLE", bool_str(disseminator.versionable)),
            ],
        )?;
        for version in disseminator.versions() {
            let bmech = version.bmech_pid.to_string();
            let created = version.created.to_string();
            self.out.start(
                "foxml:disseminatorVersion",
                &[
                    ("ID", version.version_id.as_str()),
                    ("LABEL", version.label.as_str()),
                    ("BMECH_SERVICE_PID", bmech.as_str()),
                    ("CREATED", created.as_str()),
                ],
            )?;
            let map = &version.binding_map;
            let map_attrs: Vec<(&str, &str)> = if map.label.is_empty() {
                Vec::new()
            } else {
                vec![("LABEL", map.label.as_str())]
            };
            if map.is_empty() {
                self.out.empty("foxml:serviceInputMap", &map_attrs)?;
            } else {
                self.out.start("foxml:serviceInputMap", &map_attrs)?;
                for binding in &map.bindings {
                    let order = binding.order.to_string();
                    self.out.empty(
                        "foxml:datastreamBinding",
                        &[
                            ("KEY", binding.bind_key.as_str()),
                            ("LABEL", binding.label.as_str()),
                            ("DATASTREAM_ID", binding.datastream_id.as_str()),
                            ("ORDER", order.as_str()),
                        ],
                    )?;
                }
                self.out.end("foxml:serviceInputMap")?;
            }
            self.out.end("foxml:disseminatorVersion")?;
        }
        self.out.end("foxml:disseminator")
    }
}
