//! Mechanism data contracts.
//!
//! A behavior mechanism declares, in its inline `DSINPUTSPEC` datastream,
//! which binding keys it takes, how many datastreams each key accepts, and
//! which MIME types they may have. A disseminator's binding map must satisfy
//! that contract.

use std::collections::HashSet;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use dor_model::{BindingMap, Content, DigitalObject};
use dor_store::{ObjectStore, ReadView};
use dor_types::Pid;

use crate::error::{ManagementError, ManagementResult};

/// Datastream of a mechanism object that holds its contract.
pub const INPUT_SPEC_DATASTREAM: &str = "DSINPUTSPEC";

/// Constraints on the datastreams bound to one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRule {
    pub key: String,
    pub label: String,
    pub min: u32,
    /// `None` means unbounded.
    pub max: Option<u32>,
    /// Whether bindings for this key carry a meaningful order.
    pub ordered: bool,
    /// Acceptable MIME types. Empty accepts anything.
    pub mime_types: Vec<String>,
}

impl InputRule {
    fn from_element(e: &BytesStart<'_>) -> ManagementResult<Self> {
        let mut rule = InputRule {
            key: String::new(),
            label: String::new(),
            min: 0,
            max: None,
            ordered: false,
            mime_types: Vec::new(),
        };
        for attr in e.attributes() {
            let attr = attr.map_err(malformed)?;
            let value = attr.unescape_value().map_err(malformed)?;
            match attr.key.local_name().as_ref() {
                b"wsdlMsgPartName" => rule.key = value.into_owned(),
                b"DSMin" => rule.min = parse_count(&value)?.unwrap_or(0),
                b"DSMax" => rule.max = parse_count(&value)?,
                b"DSOrdinality" => rule.ordered = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        if rule.key.is_empty() {
            return Err(malformed("DSInput without wsdlMsgPartName"));
        }
        Ok(rule)
    }

    pub fn accepts(&self, mime_type: &str) -> bool {
        if self.mime_types.is_empty() {
            return true;
        }
        let mime = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.mime_types.iter().any(|allowed| {
            let allowed = allowed.to_ascii_lowercase();
            match allowed.strip_suffix("/*") {
                Some("*") => true,
                Some(major) => mime.split('/').next() == Some(major),
                None => allowed == mime,
            }
        })
    }
}

/// Negative counts mean "no bound".
fn parse_count(value: &str) -> ManagementResult<Option<u32>> {
    let n: i64 = value
        .trim()
        .parse()
        .map_err(|_| malformed(format!("bad count '{value}'")))?;
    Ok(u32::try_from(n).ok())
}

fn malformed(e: impl std::fmt::Display) -> ManagementError {
    ManagementError::general(format!("invalid {INPUT_SPEC_DATASTREAM}: {e}"))
}

#[derive(Clone, Copy)]
enum Field {
    Label,
    Mime,
}

/// The binding contract of one behavior mechanism.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataContract {
    pub label: String,
    pub inputs: Vec<InputRule>,
}

impl DataContract {
    /// Read a `DSInputSpec` document.
    pub fn parse(xml: &[u8]) -> ManagementResult<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut contract = DataContract::default();
        let mut current: Option<InputRule> = None;
        let mut field: Option<Field> = None;
        let mut seen_root = false;

        loop {
            match reader.read_event_into(&mut buf).map_err(malformed)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"DSInputSpec" => {
                        seen_root = true;
                        for attr in e.attributes() {
                            let attr = attr.map_err(malformed)?;
                            if attr.key.local_name().as_ref() == b"label" {
                                contract.label =
                                    attr.unescape_value().map_err(malformed)?.into_owned();
                            }
                        }
                    }
                    b"DSInput" => current = Some(InputRule::from_element(&e)?),
                    b"DSInputLabel" => field = Some(Field::Label),
                    b"DSMIME" => field = Some(Field::Mime),
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"DSInputSpec" => seen_root = true,
                    b"DSInput" => contract.inputs.push(InputRule::from_element(&e)?),
                    _ => {}
                },
                Event::Text(t) => {
                    if let (Some(rule), Some(field)) = (current.as_mut(), field) {
                        let text = t.unescape().map_err(malformed)?;
                        match field {
                            Field::Label => rule.label = text.into_owned(),
                            Field::Mime => rule
                                .mime_types
                                .extend(text.split_whitespace().map(str::to_string)),
                        }
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"DSInput" => {
                        if let Some(rule) = current.take() {
                            contract.inputs.push(rule);
                        }
                    }
                    b"DSInputLabel" | b"DSMIME" => field = None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(malformed("no DSInputSpec element"));
        }
        Ok(contract)
    }

    pub fn rule(&self, key: &str) -> Option<&InputRule> {
        self.inputs.iter().find(|r| r.key == key)
    }

    /// Check `map` against the contract, resolving bound datastreams on
    /// `object`. Returns the first problem found.
    pub fn check(
        &self,
        object: &DigitalObject,
        map: &BindingMap,
        default_target: &str,
    ) -> Result<(), String> {
        for binding in &map.bindings {
            if self.rule(&binding.bind_key).is_none() {
                return Err(format!(
                    "binding key {} is not part of the mechanism contract",
                    binding.bind_key
                ));
            }
        }

        for rule in &self.inputs {
            let bound = map.for_key(&rule.key);
            let count = bound.len() as u32;
            if count < rule.min {
                return Err(format!(
                    "{} requires at least {} binding(s), found {count}",
                    rule.key, rule.min
                ));
            }
            if let Some(max) = rule.max {
                if count > max {
                    return Err(format!(
                        "{} allows at most {max} binding(s), found {count}",
                        rule.key
                    ));
                }
            }
            if rule.ordered {
                let mut orders = HashSet::new();
                if !bound.iter().all(|b| orders.insert(b.order)) {
                    return Err(format!("{} bindings must have distinct orders", rule.key));
                }
            }
            for binding in bound {
                let dsid = binding.resolved_datastream_id(default_target);
                let mime = object
                    .datastream(dsid)
                    .and_then(|ds| ds.current())
                    .map(|v| v.mime_type.as_str())
                    .ok_or_else(|| format!("{} is bound to missing datastream {dsid}", rule.key))?;
                if !rule.accepts(mime) {
                    return Err(format!(
                        "datastream {dsid} has MIME type '{mime}', {} accepts {}",
                        rule.key,
                        rule.mime_types.join(" ")
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Looks up the data contract of a behavior mechanism.
pub trait ContractResolver: Send + Sync {
    fn resolve(&self, bmech: &Pid) -> ManagementResult<DataContract>;
}

/// Reads contracts from mechanism objects in the object store.
pub struct StoreContractResolver {
    store: Arc<dyn ObjectStore>,
}

impl StoreContractResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl ContractResolver for StoreContractResolver {
    fn resolve(&self, bmech: &Pid) -> ManagementResult<DataContract> {
        let mechanism = self.store.read(bmech, ReadView::Cached).map_err(|e| {
            ManagementError::general(format!("behavior mechanism {bmech} is not available: {e}"))
        })?;
        let spec = mechanism
            .datastream(INPUT_SPEC_DATASTREAM)
            .and_then(|ds| ds.current())
            .ok_or_else(|| {
                ManagementError::general(format!(
                    "behavior mechanism {bmech} has no {INPUT_SPEC_DATASTREAM} datastream"
                ))
            })?;
        match &spec.content {
            Content::Inline(xml) => DataContract::parse(xml),
            _ => Err(ManagementError::general(format!(
                "{INPUT_SPEC_DATASTREAM} of {bmech} is not inline XML"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dor_model::{Binding, Datastream, DatastreamVersion};
    use dor_types::{ControlGroup, Timestamp};

    const SPEC: &str = r#"<fbs:DSInputSpec xmlns:fbs="http://fedora.comm.nsdlib.org/service/bindspec" label="Image contract">
  <fbs:DSInput wsdlMsgPartName="IMAGE" DSMin="1" DSMax="1" DSOrdinality="false">
    <fbs:DSInputLabel>Source image</fbs:DSInputLabel>
    <fbs:DSMIME>image/jpeg image/png</fbs:DSMIME>
  </fbs:DSInput>
  <fbs:DSInput wsdlMsgPartName="PAGES" DSMin="0" DSMax="-1" DSOrdinality="true">
    <fbs:DSMIME>text/*</fbs:DSMIME>
  </fbs:DSInput>
</fbs:DSInputSpec>"#;

    fn object() -> DigitalObject {
        let mut obj = DigitalObject::new(Pid::parse("demo:1").unwrap());
        for (id, mime) in [("IMG", "image/png"), ("P1", "text/plain"), ("P2", "text/html")] {
            let mut ds = Datastream::new(id, ControlGroup::Referenced);
            let mut v = DatastreamVersion::new(
                format!("{id}.0"),
                Timestamp::from_millis(1_700_000_000_000),
                Content::Referenced(format!("http://example/{id}")),
            );
            v.mime_type = mime.into();
            ds.push_version(v).unwrap();
            obj.put_datastream(ds);
        }
        obj
    }

    #[test]
    fn parses_rules() {
        let c = DataContract::parse(SPEC.as_bytes()).unwrap();
        assert_eq!(c.label, "Image contract");
        assert_eq!(c.inputs.len(), 2);
        let image = c.rule("IMAGE").unwrap();
        assert_eq!((image.min, image.max), (1, Some(1)));
        assert_eq!(image.label, "Source image");
        assert_eq!(image.mime_types, vec!["image/jpeg", "image/png"]);
        let pages = c.rule("PAGES").unwrap();
        assert_eq!(pages.max, None);
        assert!(pages.ordered);
    }

    #[test]
    fn mime_matching() {
        let c = DataContract::parse(SPEC.as_bytes()).unwrap();
        let pages = c.rule("PAGES").unwrap();
        assert!(pages.accepts("text/plain; charset=utf-8"));
        assert!(!pages.accepts("image/png"));
        assert!(c.rule("IMAGE").unwrap().accepts("IMAGE/PNG"));
    }

    #[test]
    fn satisfied_map_passes() {
        let c = DataContract::parse(SPEC.as_bytes()).unwrap();
        let map = BindingMap::new(vec![
            Binding::new("IMAGE", "IMG"),
            Binding::new("PAGES", "P1").with_order(1),
            Binding::new("PAGES", "P2").with_order(2),
        ]);
        assert!(c.check(&object(), &map, "DC").is_ok());
    }

    #[test]
    fn violations_are_reported() {
        let c = DataContract::parse(SPEC.as_bytes()).unwrap();
        let obj = object();

        let missing = BindingMap::new(vec![]);
        assert!(c.check(&obj, &missing, "DC").unwrap_err().contains("at least 1"));

        let too_many = BindingMap::new(vec![Binding::new("IMAGE", "IMG"), Binding::new("IMAGE", "IMG")]);
        assert!(c.check(&obj, &too_many, "DC").unwrap_err().contains("at most 1"));

        let wrong_mime = BindingMap::new(vec![Binding::new("IMAGE", "P1")]);
        assert!(c.check(&obj, &wrong_mime, "DC").unwrap_err().contains("MIME type"));

        let same_order = BindingMap::new(vec![
            Binding::new("IMAGE", "IMG"),
            Binding::new("PAGES", "P1").with_order(1),
            Binding::new("PAGES", "P2").with_order(1),
        ]);
        assert!(c.check(&obj, &same_order, "DC").unwrap_err().contains("distinct"));

        let unknown = BindingMap::new(vec![Binding::new("IMAGE", "IMG"), Binding::new("THUMB", "IMG")]);
        assert!(c.check(&obj, &unknown, "DC").unwrap_err().contains("THUMB"));
    }

    #[test]
    fn implicit_binding_uses_default_target() {
        let c = DataContract::parse(SPEC.as_bytes()).unwrap();
        let map = BindingMap::new(vec![Binding::new("IMAGE", "")]);
        assert!(c.check(&object(), &map, "IMG").is_ok());
        assert!(c.check(&object(), &map, "DC").unwrap_err().contains("missing datastream DC"));
    }

    #[test]
    fn document_without_spec_is_rejected() {
        assert!(DataContract::parse(b"<other/>").is_err());
    }
}
