//! Thin helpers over quick-xml shared by the readers and writers.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{TranslationError, TranslationResult};
use crate::namespace::{self, ScopeStack};

fn write_err(e: impl std::fmt::Display) -> TranslationError {
    TranslationError::integrity(format!("xml write: {e}"))
}

pub(crate) fn read_err(e: impl std::fmt::Display) -> TranslationError {
    TranslationError::integrity(format!("malformed xml: {e}"))
}

/// Attributes of an element as `(qualified name, unescaped value)` pairs.
pub(crate) fn attributes(e: &BytesStart<'_>) -> TranslationResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    let mut iter = e.attributes();
    iter.with_checks(true);
    for attr in iter {
        let attr = attr.map_err(read_err)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(read_err)?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

pub(crate) fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

pub(crate) fn required_attr<'a>(
    attrs: &'a [(String, String)],
    name: &str,
    element: &str,
) -> TranslationResult<&'a str> {
    attr(attrs, name).ok_or_else(|| {
        TranslationError::integrity(format!("<{element}> is missing required attribute {name}"))
    })
}

/// Borrow owned attribute pairs in the shape the builder takes.
pub(crate) fn borrowed(attrs: &[(String, String)]) -> Vec<(&str, &str)> {
    attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

pub(crate) fn qname(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

pub(crate) fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Namespace declarations among `attrs`, as `(prefix, uri)` pairs.
pub(crate) fn declarations(attrs: &[(String, String)]) -> Vec<(String, String)> {
    attrs
        .iter()
        .filter_map(|(k, v)| namespace::declared_prefix(k).map(|p| (p.to_string(), v.clone())))
        .collect()
}

/// Prefixes an element's name and attributes refer to. `xml` is implicit.
pub(crate) fn used_prefixes(element: &BytesStart<'_>, attrs: &[(String, String)]) -> Vec<String> {
    let mut used = Vec::new();
    let name = qname(element);
    if let (Some(prefix), _) = namespace::split_qname(&name) {
        used.push(prefix.to_string());
    }
    for (key, _) in attrs {
        if namespace::declared_prefix(key).is_some() {
            continue;
        }
        if let (Some(prefix), _) = namespace::split_qname(key) {
            used.push(prefix.to_string());
        }
    }
    used.retain(|p| p != "xml");
    used
}

/// Check that `bytes` is a well-formed, namespace-complete sequence of XML
/// content: every element closed, end tags matching, attributes quoted and
/// unique, and every prefix declared within `bytes` itself.
pub fn check_well_formed(bytes: &[u8]) -> TranslationResult<()> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut scopes = ScopeStack::default();
    loop {
        match reader.read_event_into(&mut buf).map_err(read_err)? {
            Event::Start(e) => {
                scopes.push(check_element(&e, &scopes)?);
            }
            Event::Empty(e) => {
                check_element(&e, &scopes)?;
            }
            Event::End(_) => {
                if scopes.depth() == 0 {
                    return Err(read_err("unexpected end tag"));
                }
                scopes.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if scopes.depth() != 0 {
        return Err(read_err(format!("{} element(s) left open", scopes.depth())));
    }
    Ok(())
}

/// Check one start or empty tag against the scopes enclosing it and return
/// the declarations it opens.
fn check_element(
    element: &BytesStart<'_>,
    enclosing: &ScopeStack,
) -> TranslationResult<Vec<(String, String)>> {
    let attrs = attributes(element)?;
    let declared = declarations(&attrs);
    for prefix in used_prefixes(element, &attrs) {
        let in_scope = declared.iter().any(|(p, _)| *p == prefix)
            || enclosing.resolve(&prefix).is_some();
        if !in_scope {
            return Err(read_err(format!(
                "<{}> uses undeclared namespace prefix '{prefix}'",
                qname(element)
            )));
        }
    }
    Ok(declared)
}

/// Validate a finished document and hand it to the sink.
pub(crate) fn emit(document: &[u8], sink: &mut dyn Write) -> TranslationResult<()> {
    check_well_formed(document)?;
    sink.write_all(document)
        .and_then(|_| sink.flush())
        .map_err(TranslationError::StreamWrite)
}

/// Document builder. Output is indented except inside raw fragments.
pub(crate) struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    pub(crate) fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    pub(crate) fn decl(&mut self) -> TranslationResult<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_err)
    }

    fn element<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
        let mut e = BytesStart::new(name);
        for &(k, v) in attrs {
            e.push_attribute((k, v));
        }
        e
    }

    pub(crate) fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> TranslationResult<()> {
        self.writer
            .write_event(Event::Start(Self::element(name, attrs)))
            .map_err(write_err)
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> TranslationResult<()> {
        self.writer
            .write_event(Event::Empty(Self::element(name, attrs)))
            .map_err(write_err)
    }

    pub(crate) fn end(&mut self, name: &str) -> TranslationResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(write_err)
    }

    pub(crate) fn text(&mut self, text: &str) -> TranslationResult<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_err)
    }

    /// `<name attrs>text</name>`
    pub(crate) fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> TranslationResult<()> {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end(name)
    }

    /// Copy an already well-formed fragment verbatim.
    pub(crate) fn fragment(&mut self, bytes: &[u8]) -> TranslationResult<()> {
        check_well_formed(bytes)?;
        self.writer
            .get_mut()
            .write_all(bytes)
            .map_err(TranslationError::StreamWrite)
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        bytes
    }
}

/// Build a fragment from owned events without indentation.
pub(crate) fn write_fragment(events: &[Event<'static>]) -> TranslationResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer.write_event(event.borrow()).map_err(write_err)?;
    }
    Ok(writer.into_inner())
}

/// Text of an event with entity references resolved.
pub(crate) fn text_of(event: &Event<'_>) -> TranslationResult<String> {
    match event {
        Event::Text(t) => Ok(t.unescape().map_err(read_err)?.into_owned()),
        Event::CData(c) => Ok(String::from_utf8_lossy(c).into_owned()),
        _ => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_accepts_fragments() {
        assert!(check_well_formed(b"<a><b/>text</a>").is_ok());
        assert!(check_well_formed(b"<a/><b/>").is_ok());
        assert!(check_well_formed(b"").is_ok());
    }

    #[test]
    fn well_formed_rejects_broken() {
        assert!(check_well_formed(b"<a><b></a>").is_err());
        assert!(check_well_formed(b"<a>").is_err());
        assert!(check_well_formed(b"</a>").is_err());
    }

    #[test]
    fn well_formed_checks_attributes() {
        assert!(check_well_formed(br#"<dc x="1"/>"#).is_ok());
        assert!(check_well_formed(b"<dc x=1/>").is_err());
        assert!(check_well_formed(br#"<dc a="1" a="2"/>"#).is_err());
        assert!(check_well_formed(br#"<dc><t a="1" a="1">x</t></dc>"#).is_err());
    }

    #[test]
    fn well_formed_requires_declared_prefixes() {
        assert!(check_well_formed(b"<dc:title>t</dc:title>").is_err());
        assert!(check_well_formed(br#"<dc x:lang="en"/>"#).is_err());
        assert!(check_well_formed(br#"<dc:title xmlns:dc="urn:dc">t</dc:title>"#).is_ok());
        assert!(check_well_formed(
            br#"<oai_dc:dc xmlns:oai_dc="urn:o" xmlns:dc="urn:dc"><dc:title xml:lang="en">t</dc:title></oai_dc:dc>"#
        )
        .is_ok());
        // a declaration does not outlive its element
        assert!(check_well_formed(br#"<a xmlns:p="urn:p"/><p:b/>"#).is_err());
    }

    #[test]
    fn builder_escapes_attribute_and_text() {
        let mut out = XmlOut::new();
        out.text_element("t", &[("k", "a<b")], "x & y").unwrap();
        let s = String::from_utf8(out.into_bytes()).unwrap();
        assert!(s.contains("k=\"a&lt;b\""));
        assert!(s.contains("x &amp; y"));
    }

    #[test]
    fn fragment_is_copied_verbatim() {
        let mut out = XmlOut::new();
        out.start("wrap", &[]).unwrap();
        out.fragment(b"<dc>A</dc>").unwrap();
        out.end("wrap").unwrap();
        let s = String::from_utf8(out.into_bytes()).unwrap();
        assert!(s.contains("<wrap><dc>A</dc>"));
    }

    #[test]
    fn broken_fragment_is_refused() {
        let mut out = XmlOut::new();
        assert!(out.fragment(b"<dc>").is_err());
        assert!(out.fragment(b"<dc x=1/>").is_err());
        assert!(out.fragment(b"<dc:title>t</dc:title>").is_err());
        assert!(out.into_bytes().len() <= 1);
    }
}
