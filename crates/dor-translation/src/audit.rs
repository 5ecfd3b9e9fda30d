//! The audit trail as carried inline in the AUDIT datastream.

use quick_xml::events::Event;
use quick_xml::Reader;

use dor_model::AuditRecord;
use dor_types::Timestamp;

use crate::error::{TranslationError, TranslationResult};
use crate::namespace::{AUDIT_NS, AUDIT_PREFIX};
use crate::xml::{self, XmlOut};

/// Write one `audit:record`. `declare` adds the audit namespace declaration
/// to the record element itself.
pub(crate) fn write_record(
    out: &mut XmlOut,
    record: &AuditRecord,
    declare: bool,
) -> TranslationResult<()> {
    let ns_attr = format!("xmlns:{AUDIT_PREFIX}");
    let mut attrs = vec![("ID", record.id.as_str())];
    if declare {
        attrs.insert(0, (ns_attr.as_str(), AUDIT_NS));
    }
    out.start("audit:record", &attrs)?;
    out.empty("audit:process", &[("type", record.process_type.as_str())])?;
    out.text_element("audit:action", &[], &record.action)?;
    out.text_element(
        "audit:componentID",
        &[],
        record.component_id.as_deref().unwrap_or(""),
    )?;
    out.text_element("audit:responsibility", &[], &record.responsibility)?;
    out.text_element("audit:date", &[], &record.date.to_string())?;
    out.text_element("audit:justification", &[], &record.justification)?;
    out.end("audit:record")
}

/// Write the whole trail, declaring the audit namespace on its root.
pub(crate) fn write_trail(out: &mut XmlOut, records: &[AuditRecord]) -> TranslationResult<()> {
    let ns_attr = format!("xmlns:{AUDIT_PREFIX}");
    out.start("audit:auditTrail", &[(ns_attr.as_str(), AUDIT_NS)])?;
    for record in records {
        write_record(out, record, false)?;
    }
    out.end("audit:auditTrail")
}

#[derive(Default)]
struct PartialRecord {
    id: String,
    process_type: String,
    action: String,
    component_id: String,
    responsibility: String,
    date: String,
    justification: String,
}

impl PartialRecord {
    fn field(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "action" => Some(&mut self.action),
            "componentID" => Some(&mut self.component_id),
            "responsibility" => Some(&mut self.responsibility),
            "date" => Some(&mut self.date),
            "justification" => Some(&mut self.justification),
            _ => None,
        }
    }

    fn finish(self) -> TranslationResult<AuditRecord> {
        if self.id.is_empty() {
            return Err(TranslationError::integrity("audit record without ID"));
        }
        let date = Timestamp::parse(self.date.trim()).map_err(|e| {
            TranslationError::integrity(format!("audit record {}: {e}", self.id))
        })?;
        let component_id = Some(self.component_id.trim().to_string()).filter(|c| !c.is_empty());
        Ok(AuditRecord {
            id: self.id,
            process_type: self.process_type,
            action: self.action.trim().to_string(),
            component_id,
            responsibility: self.responsibility.trim().to_string(),
            date,
            justification: self.justification.trim().to_string(),
        })
    }
}

/// Decode the records of an inline audit trail.
pub(crate) fn decode_trail(bytes: &[u8]) -> TranslationResult<Vec<AuditRecord>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut current: Option<PartialRecord> = None;
    let mut field: Option<String> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(xml::read_err)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let name = xml::local_name(e);
                let attrs = xml::attributes(e)?;
                match name.as_str() {
                    "record" => {
                        if current.is_some() {
                            return Err(TranslationError::integrity("nested audit record"));
                        }
                        current = Some(PartialRecord {
                            id: xml::required_attr(&attrs, "ID", "audit:record")?.to_string(),
                            ..Default::default()
                        });
                    }
                    "process" => {
                        if let Some(rec) = current.as_mut() {
                            rec.process_type =
                                xml::attr(&attrs, "type").unwrap_or_default().to_string();
                        }
                    }
                    other if matches!(event, Event::Start(_)) => {
                        field = Some(other.to_string());
                    }
                    _ => {}
                }
            }
            Event::Text(_) | Event::CData(_) => {
                if let (Some(rec), Some(name)) = (current.as_mut(), field.as_deref()) {
                    if let Some(slot) = rec.field(name) {
                        slot.push_str(&xml::text_of(&event)?);
                    }
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "record" {
                    if let Some(rec) = current.take() {
                        records.push(rec.finish()?);
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(records)
}
