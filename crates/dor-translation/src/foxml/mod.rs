//! FOXML 1.1, the canonical wire format.

mod reader;
mod writer;

use std::io::{Read, Write};

use dor_model::DigitalObject;

use crate::context::{ContentResolver, TranslationConfig, TranslationContext};
use crate::dispatch::{Deserializer, Serializer};
use crate::error::{TranslationError, TranslationResult};
use crate::xml;

pub(crate) use writer::{root_declarations, AUDIT_LABEL};

pub const FORMAT: &str = "foxml1.1";
pub const FORMAT_ALIAS: &str = "foxml";

/// Reads FOXML documents.
pub struct FoxmlDeserializer {
    config: TranslationConfig,
}

impl FoxmlDeserializer {
    pub fn new(config: TranslationConfig) -> Self {
        Self { config }
    }

    /// Parse a complete document held in memory.
    pub fn parse(
        &self,
        bytes: &[u8],
        context: TranslationContext,
    ) -> TranslationResult<DigitalObject> {
        reader::ParseContext::new(bytes, &self.config, context).parse()
    }
}

impl Deserializer for FoxmlDeserializer {
    fn deserialize(
        &mut self,
        input: &mut dyn Read,
        target: &mut DigitalObject,
        context: TranslationContext,
    ) -> TranslationResult<()> {
        let mut bytes = Vec::new();
        input
            .read_to_end(&mut bytes)
            .map_err(TranslationError::StreamRead)?;
        *target = self.parse(&bytes, context)?;
        Ok(())
    }
}

/// Writes FOXML documents.
pub struct FoxmlSerializer {
    config: TranslationConfig,
}

impl FoxmlSerializer {
    pub fn new(config: TranslationConfig) -> Self {
        Self { config }
    }

    /// Build the document in memory.
    pub fn render(
        &self,
        object: &DigitalObject,
        context: TranslationContext,
        resolver: &dyn ContentResolver,
    ) -> TranslationResult<Vec<u8>> {
        writer::FoxmlWriter::new(object, &self.config, context, resolver)?.write()
    }
}

impl Serializer for FoxmlSerializer {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoContentResolver;
    use dor_crypto::{Checksum, ChecksumType};
    use dor_model::{
        AuditRecord, Binding, BindingMap, Content, Datastream, DatastreamVersion, Disseminator,
        DisseminatorVersion, ManagedContent, MetadataClass,
    };
    use dor_types::{ControlGroup, ObjectType, Pid, State, Timestamp};
    use proptest::prelude::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

    fn parse(doc: &str) -> TranslationResult<DigitalObject> {
        FoxmlDeserializer::new(TranslationConfig::default())
            .parse(doc.as_bytes(), TranslationContext::Store)
    }

    fn write(obj: &DigitalObject, ctx: TranslationContext) -> String {
        let bytes = FoxmlSerializer::new(TranslationConfig::default())
            .render(obj, ctx, &NoContentResolver)
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn ts(millis: i64) -> Timestamp {
        Timestamp::from_millis(1_700_000_000_000 + millis)
    }

    fn pid(s: &str) -> Pid {
        Pid::parse(s).unwrap()
    }

    /// Wrap datastream and disseminator markup in a document for `demo:1`.
    fn document(body: &str) -> String {
        format!(
            r#"{HEADER}
<foxml:digitalObject VERSION="1.1" PID="demo:1"
    xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Active"/>
    <foxml:property NAME="info:fedora/fedora-system:def/model#label" VALUE="Sample"/>
  </foxml:objectProperties>
  {body}
</foxml:digitalObject>"#
        )
    }

    fn sample_object() -> DigitalObject {
        let mut obj = DigitalObject::new(pid("demo:1"));
        obj.label = "Sample & more".into();
        obj.owner_id = "fedoraAdmin".into();
        obj.create_date = Some(ts(0));
        obj.last_mod_date = Some(ts(5_000));
        obj.properties
            .insert("info:example/ext#color".into(), "blue".into());

        let mut dc = Datastream::new("DC", ControlGroup::Inline);
        let mut v = DatastreamVersion::new("DC.0", ts(1_000), Content::Inline(b"<dc>A</dc>".to_vec()));
        v.label = "Dublin Core".into();
        v.mime_type = "text/xml".into();
        v.size = 10;
        v.checksum = Checksum::compute(ChecksumType::Md5, b"<dc>A</dc>");
        dc.push_version(v).unwrap();
        obj.put_datastream(dc);

        let mut img = Datastream::new("IMG", ControlGroup::Managed);
        img.versionable = false;
        let mut v = DatastreamVersion::new(
            "IMG.0",
            ts(2_000),
            Content::Managed(ManagedContent::Location("demo:1+IMG+IMG.0".into())),
        );
        v.mime_type = "image/png".into();
        v.alt_ids = vec!["alt:one".into(), "alt:two".into()];
        v.set_format_uri(Some(
            "info:fedora/fedora-system:format/xml.mets.techMD.OTHER.PNG".into(),
        ));
        img.push_version(v).unwrap();
        obj.put_datastream(img);

        let mut ext = Datastream::new("EXT", ControlGroup::Referenced);
        ext.state = State::Inactive;
        ext.push_version(DatastreamVersion::new(
            "EXT.0",
            ts(3_000),
            Content::Referenced("http://example/x.txt".into()),
        ))
        .unwrap();
        obj.put_datastream(ext);

        let mut diss = Disseminator::new("DISS1", pid("demo:bdef"));
        let mut map = BindingMap::new(vec![
            Binding::new("MAIN", "IMG").with_label("image").with_order(1),
            Binding::new("META", ""),
        ]);
        map.label = "inputs".into();
        diss.push_version(DisseminatorVersion {
            version_id: "DISS1.0".into(),
            label: "viewer".into(),
            bmech_pid: pid("demo:bmech"),
            created: ts(4_000),
            binding_map: map,
        })
        .unwrap();
        obj.put_disseminator(diss);

        obj.append_audit(AuditRecord::management(
            "ingest",
            None,
            "fedoraAdmin",
            ts(0),
            "initial load",
        ));
        obj.append_audit(AuditRecord::management(
            "addDatastream",
            Some("EXT".into()),
            "fedoraAdmin",
            ts(3_000),
            "link",
        ));
        obj
    }

    // -----------------------------------------------------------------------
    // Round trip
    // -----------------------------------------------------------------------

    #[test]
    fn store_context_round_trip() {
        let obj = sample_object();
        let text = write(&obj, TranslationContext::Store);
        let back = parse(&text).unwrap();
        assert_eq!(back, obj);
    }

    #[test]
    fn second_round_trip_is_byte_stable() {
        let first = write(&sample_object(), TranslationContext::Store);
        let second = write(&parse(&first).unwrap(), TranslationContext::Store);
        assert_eq!(first, second);
    }

    #[test]
    fn archival_embeds_managed_bytes() {
        struct Bytes;
        impl ContentResolver for Bytes {
            fn resolve(&self, location: &str) -> TranslationResult<Vec<u8>> {
                assert_eq!(location, "demo:1+IMG+IMG.0");
                Ok(vec![0, 1, 2, 255])
            }
        }
        let bytes = FoxmlSerializer::new(TranslationConfig::default())
            .render(&sample_object(), TranslationContext::Archival, &Bytes)
            .unwrap();
        let back = parse(std::str::from_utf8(&bytes).unwrap()).unwrap();
        let img = back.datastream("IMG").unwrap().current().unwrap();
        assert_eq!(
            img.content,
            Content::Managed(ManagedContent::Embedded(vec![0, 1, 2, 255]))
        );
        // Referenced content is untouched.
        let ext = back.datastream("EXT").unwrap().current().unwrap();
        assert_eq!(ext.content, Content::Referenced("http://example/x.txt".into()));
    }

    #[test]
    fn public_and_migration_rewrite_managed_locations() {
        let public = write(&sample_object(), TranslationContext::Public);
        assert!(public.contains(
            "REF=\"http://localhost:8080/fedora/get/demo:1/IMG/2023-11-14T22:13:22.000Z\""
        ));
        let migration = write(&sample_object(), TranslationContext::Migration);
        assert!(migration.contains("REF=\"/get/demo:1/IMG/2023-11-14T22:13:22.000Z\""));
        assert!(migration.contains("REF=\"http://example/x.txt\""));
        // Relative migration paths parse back as managed locations.
        let back = parse(&migration).unwrap();
        assert_eq!(
            back.datastream("IMG").unwrap().current().unwrap().content.location(),
            Some("/get/demo:1/IMG/2023-11-14T22:13:22.000Z")
        );
    }

    // -----------------------------------------------------------------------
    // Inline content and namespaces
    // -----------------------------------------------------------------------

    #[test]
    fn root_prefix_is_redeclared_on_fragment() {
        let doc = format!(
            r#"{HEADER}
<foxml:digitalObject VERSION="1.1" PID="demo:e"
    xmlns:foxml="info:fedora/fedora-system:def/foxml#"
    xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"
    xmlns:dc="http://purl.org/dc/elements/1.1/">
  <foxml:datastream ID="DC" CONTROL_GROUP="X" STATE="A" VERSIONABLE="true">
    <foxml:datastreamVersion ID="DC.0" LABEL="Dublin Core" CREATED="2024-01-01T00:00:00.000Z" MIMETYPE="text/xml">
      <foxml:xmlContent>
        <oai_dc:dc><dc:title>Scenario E</dc:title></oai_dc:dc>
      </foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
</foxml:digitalObject>"#
        );
        let obj = parse(&doc).unwrap();
        let content = obj.datastream("DC").unwrap().current().unwrap().content.clone();
        let Content::Inline(bytes) = content else {
            panic!("expected inline content");
        };
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            concat!(
                r#"<oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/""#,
                r#" xmlns:dc="http://purl.org/dc/elements/1.1/">"#,
                "<dc:title>Scenario E</dc:title></oai_dc:dc>"
            )
        );
        assert_eq!(
            obj.namespaces.get("dc").map(String::as_str),
            Some("http://purl.org/dc/elements/1.1/")
        );
        assert!(!obj.namespaces.contains_key("foxml"));

        // The fragment is now self-contained, so another pass leaves it alone.
        let again = parse(&write(&obj, TranslationContext::Store)).unwrap();
        assert_eq!(again, obj);
    }

    #[test]
    fn prefix_declared_inside_fragment_is_left_alone() {
        let doc = document(
            r#"<foxml:datastream ID="DC" CONTROL_GROUP="X">
    <foxml:datastreamVersion ID="DC.0" CREATED="2024-01-01T00:00:00.000Z">
      <foxml:xmlContent><x:a xmlns:x="urn:x"><x:b/></x:a></foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>"#,
        );
        let obj = parse(&doc).unwrap();
        assert_eq!(
            obj.datastream("DC").unwrap().current().unwrap().content,
            Content::Inline(br#"<x:a xmlns:x="urn:x"><x:b/></x:a>"#.to_vec())
        );
    }

    #[test]
    fn undeclared_prefix_fails() {
        let doc = document(
            r#"<foxml:datastream ID="DC" CONTROL_GROUP="X">
    <foxml:datastreamVersion ID="DC.0" CREATED="2024-01-01T00:00:00.000Z">
      <foxml:xmlContent><nope:a/></foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>"#,
        );
        assert!(matches!(parse(&doc), Err(TranslationError::ObjectIntegrity(_))));
    }

    #[test]
    fn nested_document_is_captured_opaquely() {
        let doc = document(
            r#"<foxml:datastream ID="COPY" CONTROL_GROUP="X">
    <foxml:datastreamVersion ID="COPY.0" CREATED="2024-01-01T00:00:00.000Z">
      <foxml:xmlContent>
        <foxml:digitalObject PID="demo:inner">
          <foxml:datastream ID="INNER" CONTROL_GROUP="X">
            <foxml:datastreamVersion ID="INNER.0">
              <foxml:xmlContent><foxml:xmlContent/></foxml:xmlContent>
            </foxml:datastreamVersion>
          </foxml:datastream>
        </foxml:digitalObject>
      </foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>"#,
        );
        let obj = parse(&doc).unwrap();
        assert_eq!(obj.datastream_ids(), vec!["COPY".to_string()]);
        let Content::Inline(bytes) = &obj.datastream("COPY").unwrap().current().unwrap().content
        else {
            panic!("expected inline content");
        };
        let text = std::str::from_utf8(bytes).unwrap();
        assert!(text.contains(r#"PID="demo:inner""#));
        assert!(text.contains("xmlns:foxml=\"info:fedora/fedora-system:def/foxml#\""));
    }

    #[test]
    fn audit_block_becomes_records() {
        let doc = document(
            r#"<foxml:datastream ID="AUDIT" CONTROL_GROUP="X" VERSIONABLE="false">
    <foxml:datastreamVersion ID="AUDIT.0" CREATED="2024-01-01T00:00:00.000Z">
      <foxml:xmlContent>
        <audit:auditTrail xmlns:audit="info:fedora/fedora-system:def/audit#">
          <audit:record ID="AUDREC1">
            <audit:process type="Fedora API-M"/>
            <audit:action>addDatastream</audit:action>
            <audit:componentID>DS1</audit:componentID>
            <audit:responsibility>fedoraAdmin</audit:responsibility>
            <audit:date>2024-01-02T00:00:00.000Z</audit:date>
            <audit:justification>added</audit:justification>
          </audit:record>
        </audit:auditTrail>
      </foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>"#,
        );
        let obj = parse(&doc).unwrap();
        assert!(!obj.has_datastream("AUDIT"));
        let records = obj.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "AUDREC1");
        assert_eq!(records[0].action, "addDatastream");
        assert_eq!(records[0].component_id.as_deref(), Some("DS1"));
    }

    // -----------------------------------------------------------------------
    // Attribute handling
    // -----------------------------------------------------------------------

    #[test]
    fn datastream_attributes_default_versions() {
        let doc = document(
            r#"<foxml:datastream ID="DOC" CONTROL_GROUP="E" MIMETYPE="application/pdf"
      FORMAT_URI="info:fedora/fedora-system:format/xml.mets.rightsMD.OTHER" ALT_IDS="a b">
    <foxml:datastreamVersion ID="DOC.0" CREATED="2024-01-01T00:00:00.000Z">
      <foxml:contentDigest TYPE="SHA-1" DIGEST="abc"/>
      <foxml:contentLocation TYPE="URL" REF="http://example/doc.pdf"/>
    </foxml:datastreamVersion>
    <foxml:datastreamVersion ID="DOC.1" CREATED="2024-01-02T00:00:00.000Z" MIMETYPE="text/plain">
      <foxml:contentLocation TYPE="URL" REF="http://example/doc.txt"/>
    </foxml:datastreamVersion>
  </foxml:datastream>"#,
        );
        let obj = parse(&doc).unwrap();
        let ds = obj.datastream("DOC").unwrap();
        assert_eq!(ds.control_group, ControlGroup::Referenced);
        let first = &ds.versions()[0];
        assert_eq!(first.mime_type, "application/pdf");
        assert_eq!(first.alt_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(first.checksum.kind, ChecksumType::Sha1);
        assert_eq!(
            first.legacy_metadata.as_ref().map(|m| m.class),
            Some(MetadataClass::Rights)
        );
        assert_eq!(ds.versions()[1].mime_type, "text/plain");
    }

    #[test]
    fn empty_pid_leaves_identity_unassigned() {
        let doc = format!(
            r#"{HEADER}<foxml:digitalObject PID="" xmlns:foxml="info:fedora/fedora-system:def/foxml#"/>"#
        );
        assert_eq!(parse(&doc).unwrap().pid, None);
    }

    #[test]
    fn service_urls_use_placeholder_at_rest() {
        let doc = format!(
            r#"{HEADER}
<foxml:digitalObject PID="demo:mech" xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="http://www.w3.org/1999/02/22-rdf-syntax-ns#type" VALUE="FedoraBMechObject"/>
  </foxml:objectProperties>
  <foxml:datastream ID="WSDL" CONTROL_GROUP="X">
    <foxml:datastreamVersion ID="WSDL.0" CREATED="2024-01-01T00:00:00.000Z">
      <foxml:xmlContent><port location="http://localhost:8080/fedora/svc"/></foxml:xmlContent>
    </foxml:datastreamVersion>
  </foxml:datastream>
</foxml:digitalObject>"#
        );
        let obj = parse(&doc).unwrap();
        assert_eq!(obj.object_type, ObjectType::BehaviorMechanism);
        assert_eq!(
            obj.datastream("WSDL").unwrap().current().unwrap().content,
            Content::Inline(br#"<port location="http://local.repository.server/svc"/>"#.to_vec())
        );
        assert!(write(&obj, TranslationContext::Public)
            .contains(r#"<port location="http://localhost:8080/fedora/svc"/>"#));
        assert!(write(&obj, TranslationContext::Migration)
            .contains(r#"<port location="http://local.repository.server/svc"/>"#));
    }

    // -----------------------------------------------------------------------
    // Structural failures
    // -----------------------------------------------------------------------

    #[test]
    fn structural_violations_fail() {
        let version = |content: &str| {
            document(&format!(
                r#"<foxml:datastream ID="DS" CONTROL_GROUP="M">
    <foxml:datastreamVersion ID="DS.0" CREATED="2024-01-01T00:00:00.000Z">{content}</foxml:datastreamVersion>
  </foxml:datastream>"#
            ))
        };
        let cases = vec![
            (
                "missing pid",
                format!(r#"{HEADER}<foxml:digitalObject xmlns:foxml="x"/>"#),
            ),
            ("not xml", "<foxml:digitalObject PID=\"demo:1\"><oops>".to_string()),
            (
                "wrong root",
                format!(r#"{HEADER}<other PID="demo:1"/>"#),
            ),
            (
                "unknown control group",
                document(r#"<foxml:datastream ID="DS" CONTROL_GROUP="Q"/>"#),
            ),
            ("no content", version("")),
            (
                "two content elements",
                version(
                    r#"<foxml:contentLocation REF="http://a/b"/><foxml:contentLocation REF="http://a/c"/>"#,
                ),
            ),
            (
                "bad location",
                version(r#"<foxml:contentLocation REF="not a location"/>"#),
            ),
            ("inline in managed", version("<foxml:xmlContent><a/></foxml:xmlContent>")),
            (
                "bad base64",
                version("<foxml:binaryContent>!!!</foxml:binaryContent>"),
            ),
            (
                "binding without key",
                document(
                    r#"<foxml:disseminator ID="D" BDEF_CONTRACT_PID="demo:bdef">
    <foxml:disseminatorVersion ID="D.0" BMECH_SERVICE_PID="demo:bmech">
      <foxml:serviceInputMap><foxml:datastreamBinding DATASTREAM_ID="DC"/></foxml:serviceInputMap>
    </foxml:disseminatorVersion>
  </foxml:disseminator>"#,
                ),
            ),
        ];
        for (what, doc) in cases {
            assert!(
                matches!(parse(&doc), Err(TranslationError::ObjectIntegrity(_))),
                "{what} should fail with an integrity error"
            );
        }
    }

    #[test]
    fn binary_content_becomes_embedded_bytes() {
        let doc = document(
            r#"<foxml:datastream ID="BIN" CONTROL_GROUP="M">
    <foxml:datastreamVersion ID="BIN.0" CREATED="2024-01-01T00:00:00.000Z">
      <foxml:binaryContent>
        aGVsbG8=
      </foxml:binaryContent>
    </foxml:datastreamVersion>
  </foxml:datastream>"#,
        );
        let obj = parse(&doc).unwrap();
        assert_eq!(
            obj.datastream("BIN").unwrap().current().unwrap().content,
            Content::Managed(ManagedContent::Embedded(b"hello".to_vec()))
        );
    }

    #[test]
    fn declared_non_utf8_encoding_is_rejected() {
        let doc = r#"<?xml version="1.0" encoding="ISO-8859-1"?><foxml:digitalObject PID="demo:1" xmlns:foxml="x"/>"#;
        assert!(matches!(
            parse(doc),
            Err(TranslationError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn failed_parse_leaves_target_untouched() {
        let mut target = sample_object();
        let mut de = FoxmlDeserializer::new(TranslationConfig::default());
        let result = de.deserialize(
            &mut &b"<foxml:digitalObject>"[..],
            &mut target,
            TranslationContext::Store,
        );
        assert!(result.is_err());
        assert_eq!(target, sample_object());
    }

    #[test]
    fn serializer_refuses_object_without_pid() {
        let mut sink = Vec::new();
        let err = FoxmlSerializer::new(TranslationConfig::default())
            .serialize(
                &DigitalObject::default(),
                &mut sink,
                TranslationContext::Store,
                &NoContentResolver,
            )
            .unwrap_err();
        assert!(matches!(err, TranslationError::ObjectIntegrity(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn serializer_refuses_broken_inline_content() {
        let broken: [&[u8]; 4] = [
            b"<dc>",
            b"<dc x=1/>",
            br#"<dc a="1" a="2"/>"#,
            b"<dc:title>t</dc:title>",
        ];
        for content in broken {
            let mut obj = DigitalObject::new(pid("demo:1"));
            let mut ds = Datastream::new("DC", ControlGroup::Inline);
            ds.push_version(DatastreamVersion::new(
                "DC.0",
                ts(0),
                Content::Inline(content.to_vec()),
            ))
            .unwrap();
            obj.put_datastream(ds);
            for ctx in [TranslationContext::Store, TranslationContext::Migration] {
                let mut sink = Vec::new();
                let result = FoxmlSerializer::new(TranslationConfig::default()).serialize(
                    &obj,
                    &mut sink,
                    ctx,
                    &NoContentResolver,
                );
                assert!(
                    matches!(result, Err(TranslationError::ObjectIntegrity(_))),
                    "{}",
                    String::from_utf8_lossy(content)
                );
                assert!(sink.is_empty());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn round_trip_preserves_object(
            label in "[A-Za-z0-9 .,&<>]{0,24}",
            owner in "[a-z]{1,10}",
            texts in proptest::collection::vec("[A-Za-z0-9 ]{0,16}", 1..4),
            versionable in any::<bool>(),
        ) {
            let mut obj = DigitalObject::new(pid("demo:prop"));
            obj.label = label;
            obj.owner_id = owner;
            let mut ds = Datastream::new("NOTE", ControlGroup::Inline);
            ds.versionable = versionable;
            for (n, text) in texts.iter().enumerate() {
                let body = format!("<note>{text}</note>").into_bytes();
                let mut v = DatastreamVersion::new(
                    format!("NOTE.{n}"),
                    ts(n as i64 * 1_000),
                    Content::Inline(body.clone()),
                );
                v.size = body.len() as u64;
                v.checksum = Checksum::compute(ChecksumType::Sha256, &body);
                ds.push_version(v).unwrap();
            }
            obj.put_datastream(ds);

            let back = parse(&write(&obj, TranslationContext::Store)).unwrap();
            prop_assert_eq!(back, obj);
        }
    }
}
