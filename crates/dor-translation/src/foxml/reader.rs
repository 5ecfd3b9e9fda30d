//! Pull parser for FOXML documents.
//!
//! All state lives in [`ParseContext`]: the event source, the namespace
//! scopes of the structural elements read so far, and the object under
//! construction. Each structural element has its own method that consumes
//! events up to and including the element's end tag.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use tracing::debug;

use dor_crypto::{Checksum, ChecksumType};
use dor_model::{
    Binding, BindingMap, Content, Datastream, DatastreamVersion, DigitalObject, Disseminator,
    DisseminatorVersion, ManagedContent,
};
use dor_types::{
    is_reserved_datastream_id, validate_component_id, ControlGroup, ObjectType, Pid, State,
    Timestamp,
};

use crate::audit;
use crate::context::{TranslationConfig, TranslationContext};
use crate::error::{check_encoding, TranslationError, TranslationResult};
use crate::location;
use crate::namespace::{self, ScopeStack};
use crate::render::{decode_base64, is_service_datastream};
use crate::xml::{self, declarations, used_prefixes};

type Attrs = Vec<(String, String)>;

/// An element boundary met in a structural position.
enum Node {
    Open {
        element: BytesStart<'static>,
        attrs: Attrs,
        empty: bool,
    },
    Close,
}

/// Attributes a `datastream` element supplies to versions lacking their own.
#[derive(Default)]
struct VersionDefaults {
    mime_type: Option<String>,
    format_uri: Option<String>,
    alt_ids: Option<String>,
}

fn integrity(msg: impl Into<String>) -> TranslationError {
    TranslationError::integrity(msg)
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(|b| b.is_ascii_whitespace())
}

fn parse_bool(value: Option<&str>, default: bool, what: &str) -> TranslationResult<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" => Ok(true),
        Some(v) if v == "false" => Ok(false),
        Some(v) => Err(integrity(format!("{what}: expected true or false, found '{v}'"))),
    }
}

fn parse_state(value: Option<&str>, what: &str) -> TranslationResult<State> {
    value
        .map(State::parse)
        .transpose()
        .map_err(|e| integrity(format!("{what}: {e}")))
        .map(Option::unwrap_or_default)
}

fn parse_created(value: Option<&str>, what: &str) -> TranslationResult<Timestamp> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => Timestamp::parse(v).map_err(|e| integrity(format!("{what}: {e}"))),
        None => Ok(Timestamp::now()),
    }
}

fn parse_pid(value: &str, what: &str) -> TranslationResult<Pid> {
    Pid::parse(value).map_err(|e| integrity(format!("{what}: {e}")))
}

/// Prefixes an element uses for its own name and its attributes.
pub(crate) struct ParseContext<'a> {
    config: &'a TranslationConfig,
    context: TranslationContext,
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    scopes: ScopeStack,
    object: DigitalObject,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(
        input: &'a [u8],
        config: &'a TranslationConfig,
        context: TranslationContext,
    ) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(false);
        Self {
            config,
            context,
            reader,
            buf: Vec::new(),
            scopes: ScopeStack::default(),
            object: DigitalObject::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Event plumbing
    // -----------------------------------------------------------------------

    fn next_event(&mut self) -> TranslationResult<Event<'static>> {
        self.buf.clear();
        let event = self
            .reader
            .read_event_into(&mut self.buf)
            .map_err(xml::read_err)?;
        Ok(event.into_owned())
    }

    /// Next element boundary, skipping whitespace, comments and
    /// processing instructions. Opening a non-empty element pushes its
    /// namespace scope; closing one pops it.
    fn next_node(&mut self) -> TranslationResult<Node> {
        loop {
            match self.next_event()? {
                Event::Start(element) => {
                    let attrs = xml::attributes(&element)?;
                    self.scopes.push(declarations(&attrs));
                    return Ok(Node::Open {
                        element,
                        attrs,
                        empty: false,
                    });
                }
                Event::Empty(element) => {
                    let attrs = xml::attributes(&element)?;
                    return Ok(Node::Open {
                        element,
                        attrs,
                        empty: true,
                    });
                }
                Event::End(_) => {
                    self.scopes.pop();
                    return Ok(Node::Close);
                }
                Event::Text(text) if is_blank(&text) => {}
                Event::Text(_) | Event::CData(_) => {
                    return Err(integrity("unexpected character data between elements"))
                }
                Event::Decl(decl) => {
                    if let Some(encoding) = decl.encoding() {
                        let encoding = encoding.map_err(xml::read_err)?;
                        check_encoding(&String::from_utf8_lossy(&encoding))?;
                    }
                }
                Event::Eof => return Err(integrity("unexpected end of document")),
                _ => {}
            }
        }
    }

    /// Consume the rest of an opened element.
    fn skip(&mut self) -> TranslationResult<()> {
        let mut depth = 1usize;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        self.scopes.pop();
                        return Ok(());
                    }
                }
                Event::Eof => return Err(integrity("unexpected end of document")),
                _ => {}
            }
        }
    }

    /// Character content of an opened element that must not have children.
    fn read_text(&mut self, element: &str) -> TranslationResult<String> {
        let mut text = String::new();
        loop {
            let event = self.next_event()?;
            match &event {
                Event::Text(_) | Event::CData(_) => text.push_str(&xml::text_of(&event)?),
                Event::End(_) => {
                    self.scopes.pop();
                    return Ok(text);
                }
                Event::Start(_) | Event::Empty(_) => {
                    return Err(integrity(format!("<{element}> may only contain text")))
                }
                Event::Eof => return Err(integrity("unexpected end of document")),
                _ => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inline content
    // -----------------------------------------------------------------------

    /// Capture everything inside an opened `xmlContent` element without
    /// interpreting it, then re-serialize it as a self-contained fragment.
    fn capture_inline(&mut self) -> TranslationResult<Vec<u8>> {
        let mut events = Vec::new();
        let mut depth = 0usize;
        loop {
            let event = self.next_event()?;
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Event::Text(text) if depth == 0 && is_blank(text) => continue,
                Event::Decl(_) | Event::DocType(_) => continue,
                Event::Eof => return Err(integrity("unterminated inline content")),
                _ => {}
            }
            events.push(event);
        }
        self.reconcile_namespaces(&mut events)?;
        self.scopes.pop();
        xml::write_fragment(&events)
    }

    /// Re-declare, on each top-level element of a fragment, every prefix the
    /// fragment uses but only the enclosing document declares.
    fn reconcile_namespaces(&self, events: &mut [Event<'static>]) -> TranslationResult<()> {
        let mut local = ScopeStack::default();
        let mut root = 0usize;
        let mut needed: Vec<String> = Vec::new();
        let mut patches: Vec<(usize, Vec<String>)> = Vec::new();

        for (i, event) in events.iter().enumerate() {
            let (element, opens) = match event {
                Event::Start(e) => (e, true),
                Event::Empty(e) => (e, false),
                Event::End(_) => {
                    local.pop();
                    if local.depth() == 0 {
                        patches.push((root, std::mem::take(&mut needed)));
                    }
                    continue;
                }
                _ => continue,
            };
            if local.depth() == 0 {
                root = i;
            }
            let attrs = xml::attributes(element)?;
            local.push(declarations(&attrs));
            for prefix in used_prefixes(element, &attrs) {
                if local.resolve(&prefix).is_none() && !needed.contains(&prefix) {
                    needed.push(prefix);
                }
            }
            if !opens {
                local.pop();
                if local.depth() == 0 {
                    patches.push((root, std::mem::take(&mut needed)));
                }
            }
        }

        for (index, prefixes) in patches {
            for prefix in prefixes {
                let uri = self.scopes.resolve(&prefix).ok_or_else(|| {
                    integrity(format!(
                        "inline content uses undeclared namespace prefix '{prefix}'"
                    ))
                })?;
                debug!(prefix = %prefix, uri, "re-declaring namespace on inline fragment");
                if let Event::Start(e) | Event::Empty(e) = &mut events[index] {
                    e.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Document
    // -----------------------------------------------------------------------

    pub(crate) fn parse(mut self) -> TranslationResult<DigitalObject> {
        let (root, attrs, empty) = match self.next_node()? {
            Node::Open {
                element,
                attrs,
                empty,
            } => (element, attrs, empty),
            Node::Close => return Err(integrity("document has no root element")),
        };
        if xml::local_name(&root) != "digitalObject" {
            return Err(integrity(format!(
                "expected digitalObject root, found <{}>",
                xml::qname(&root)
            )));
        }
        let pid = xml::required_attr(&attrs, "PID", "digitalObject")?.trim();
        if !pid.is_empty() {
            self.object.pid = Some(parse_pid(pid, "digitalObject PID")?);
        }
        for (prefix, uri) in declarations(&attrs) {
            if !namespace::is_standard_declaration(&prefix, &uri) {
                self.object.namespaces.insert(prefix, uri);
            }
        }

        if !empty {
            loop {
                match self.next_node()? {
                    Node::Close => break,
                    Node::Open {
                        element,
                        attrs,
                        empty,
                    } => match xml::local_name(&element).as_str() {
                        "objectProperties" if !empty => self.parse_properties()?,
                        "datastream" => self.parse_datastream(&attrs, empty)?,
                        "disseminator" => self.parse_disseminator(&attrs, empty)?,
                        other => {
                            debug!(element = other, "skipping unrecognized element");
                            if !empty {
                                self.skip()?;
                            }
                        }
                    },
                }
            }
        }

        loop {
            match self.next_event()? {
                Event::Eof => break,
                Event::Text(text) if is_blank(&text) => {}
                Event::Comment(_) | Event::PI(_) => {}
                _ => return Err(integrity("content after the root element")),
            }
        }

        debug!(
            pid = self.object.pid().map(Pid::as_str).unwrap_or("-"),
            context = %self.context,
            datastreams = self.object.datastream_ids().len(),
            audit_records = self.object.audit_records().len(),
            "foxml document parsed"
        );
        Ok(self.object)
    }

    // -----------------------------------------------------------------------
    // Object properties
    // -----------------------------------------------------------------------

    fn parse_properties(&mut self) -> TranslationResult<()> {
        loop {
            let (element, attrs, empty) = match self.next_node()? {
                Node::Close => return Ok(()),
                Node::Open {
                    element,
                    attrs,
                    empty,
                } => (element, attrs, empty),
            };
            if !empty {
                self.skip()?;
            }
            let local = xml::local_name(&element);
            if local != "property" && local != "extproperty" {
                continue;
            }
            let name = xml::required_attr(&attrs, "NAME", &local)?;
            let value = xml::required_attr(&attrs, "VALUE", &local)?;
            if local == "property" {
                self.apply_property(name, value)?;
            } else {
                self.object
                    .properties
                    .insert(name.to_string(), value.to_string());
            }
        }
    }

    fn apply_property(&mut self, name: &str, value: &str) -> TranslationResult<()> {
        let bad = |e: dor_types::TypeError| integrity(format!("property {name}: {e}"));
        match name {
            namespace::PROP_STATE => self.object.state = State::parse(value).map_err(bad)?,
            namespace::PROP_LABEL => self.object.label = value.to_string(),
            namespace::PROP_OWNER => self.object.owner_id = value.to_string(),
            namespace::PROP_CONTENT_MODEL => self.object.content_model_id = value.to_string(),
            namespace::PROP_CREATED => {
                self.object.create_date = Some(Timestamp::parse(value).map_err(bad)?)
            }
            namespace::PROP_LAST_MODIFIED => {
                self.object.last_mod_date = Some(Timestamp::parse(value).map_err(bad)?)
            }
            namespace::RDF_TYPE => {
                self.object.object_type = ObjectType::from_rdf_type(value).map_err(bad)?
            }
            _ => {
                self.object
                    .properties
                    .insert(name.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Datastreams
    // -----------------------------------------------------------------------

    fn parse_datastream(&mut self, attrs: &[(String, String)], empty: bool) -> TranslationResult<()> {
        let id = xml::required_attr(attrs, "ID", "datastream")?.to_string();
        validate_component_id(&id).map_err(|e| integrity(e.to_string()))?;
        let control_group =
            ControlGroup::from_code(xml::required_attr(attrs, "CONTROL_GROUP", "datastream")?)
                .map_err(|e| integrity(format!("datastream {id}: {e}")))?;
        let what = format!("datastream {id}");
        let mut datastream = Datastream::new(&id, control_group);
        datastream.state = parse_state(xml::attr(attrs, "STATE"), &what)?;
        datastream.versionable = parse_bool(xml::attr(attrs, "VERSIONABLE"), true, &what)?;
        let defaults = VersionDefaults {
            mime_type: xml::attr(attrs, "MIMETYPE").map(str::to_string),
            format_uri: xml::attr(attrs, "FORMAT_URI").map(str::to_string),
            alt_ids: xml::attr(attrs, "ALT_IDS").map(str::to_string),
        };
        if empty {
            return Err(integrity(format!("{what} has no versions")));
        }

        let is_audit = is_reserved_datastream_id(&id);
        if is_audit && control_group != ControlGroup::Inline {
            return Err(integrity(format!("{what} must be inline")));
        }

        loop {
            let (element, attrs, empty) = match self.next_node()? {
                Node::Close => break,
                Node::Open {
                    element,
                    attrs,
                    empty,
                } => (element, attrs, empty),
            };
            if xml::local_name(&element) != "datastreamVersion" {
                if !empty {
                    self.skip()?;
                }
                continue;
            }
            let version =
                self.parse_datastream_version(&id, control_group, &defaults, &attrs, empty)?;
            if is_audit {
                if let Content::Inline(trail) = &version.content {
                    for record in audit::decode_trail(trail)? {
                        self.object.restore_audit(record);
                    }
                }
            } else {
                datastream
                    .push_version(version)
                    .map_err(|e| integrity(e.to_string()))?;
            }
        }

        if is_audit {
            return Ok(());
        }
        if datastream.is_empty() {
            return Err(integrity(format!("{what} has no versions")));
        }
        if self.object.has_datastream(&id) {
            return Err(integrity(format!("{what} appears twice")));
        }
        self.object.put_datastream(datastream);
        Ok(())
    }

    fn parse_datastream_version(
        &mut self,
        dsid: &str,
        control_group: ControlGroup,
        defaults: &VersionDefaults,
        attrs: &[(String, String)],
        empty: bool,
    ) -> TranslationResult<DatastreamVersion> {
        let version_id = xml::required_attr(attrs, "ID", "datastreamVersion")?.to_string();
        let what = format!("datastream version {version_id}");
        let created = parse_created(xml::attr(attrs, "CREATED"), &what)?;
        let size = match xml::attr(attrs, "SIZE") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| integrity(format!("{what}: bad SIZE '{s}'")))?,
            None => 0,
        };
        if empty {
            return Err(integrity(format!("{what} has no content")));
        }

        let mut checksum = Checksum::disabled();
        let mut content: Option<Content> = None;
        loop {
            let (element, inner, empty) = match self.next_node()? {
                Node::Close => break,
                Node::Open {
                    element,
                    attrs,
                    empty,
                } => (element, attrs, empty),
            };
            let local = xml::local_name(&element);
            let found = match local.as_str() {
                "contentDigest" => {
                    if !empty {
                        self.skip()?;
                    }
                    let kind = ChecksumType::parse(xml::required_attr(&inner, "TYPE", &local)?)
                        .map_err(|e| integrity(format!("{what}: {e}")))?;
                    let digest = xml::attr(&inner, "DIGEST").unwrap_or_default();
                    checksum = if kind.is_enabled() {
                        Checksum {
                            kind,
                            value: digest.to_string(),
                        }
                    } else {
                        Checksum::disabled()
                    };
                    continue;
                }
                "xmlContent" => {
                    let mut bytes = if empty {
                        Vec::new()
                    } else {
                        self.capture_inline()?
                    };
                    if is_service_datastream(self.object.object_type, dsid) {
                        bytes = self.config.to_placeholder(&bytes);
                    }
                    Content::Inline(bytes)
                }
                "contentLocation" => {
                    if !empty {
                        self.skip()?;
                    }
                    let reference = xml::required_attr(&inner, "REF", &local)?.to_string();
                    location::classify(&reference)
                        .map_err(|e| integrity(format!("{what}: {e}")))?;
                    match control_group {
                        ControlGroup::Managed => Content::Managed(ManagedContent::Location(reference)),
                        ControlGroup::Referenced => Content::Referenced(reference),
                        ControlGroup::Inline => {
                            return Err(integrity(format!(
                                "{what}: inline datastream cannot have a content location"
                            )))
                        }
                    }
                }
                "binaryContent" => {
                    let text = if empty {
                        String::new()
                    } else {
                        self.read_text(&local)?
                    };
                    let bytes = decode_base64(&text)
                        .map_err(|e| integrity(format!("{what}: bad base64: {e}")))?;
                    Content::Managed(ManagedContent::Embedded(bytes))
                }
                _ => {
                    if !empty {
                        self.skip()?;
                    }
                    continue;
                }
            };
            if content.is_some() {
                return Err(integrity(format!("{what} has more than one content element")));
            }
            content = Some(found);
        }

        let content = content.ok_or_else(|| integrity(format!("{what} has no content")))?;
        if content.control_group() != control_group {
            return Err(integrity(format!(
                "{what}: {:?} content in a {:?} datastream",
                content.control_group(),
                control_group
            )));
        }

        let mut version = DatastreamVersion::new(version_id, created, content);
        version.label = xml::attr(attrs, "LABEL").unwrap_or_default().to_string();
        version.mime_type = xml::attr(attrs, "MIMETYPE")
            .map(str::to_string)
            .or_else(|| defaults.mime_type.clone())
            .unwrap_or_default();
        version.set_format_uri(
            xml::attr(attrs, "FORMAT_URI")
                .map(str::to_string)
                .or_else(|| defaults.format_uri.clone())
                .filter(|f| !f.is_empty()),
        );
        version.alt_ids = xml::attr(attrs, "ALT_IDS")
            .map(str::to_string)
            .or_else(|| defaults.alt_ids.clone())
            .map(|ids| ids.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        version.size = size;
        version.checksum = checksum;
        Ok(version)
    }

    // -----------------------------------------------------------------------
    // Disseminators
    // -----------------------------------------------------------------------

    fn parse_disseminator(&mut self, attrs: &[(String, String)], empty: bool) -> TranslationResult<()> {
        let id = xml::required_attr(attrs, "ID", "disseminator")?.to_string();
        validate_component_id(&id).map_err(|e| integrity(e.to_string()))?;
        let what = format!("disseminator {id}");
        let bdef = parse_pid(
            xml::required_attr(attrs, "BDEF_CONTRACT_PID", "disseminator")?,
            &what,
        )?;
        let mut disseminator = Disseminator::new(&id, bdef);
        disseminator.state = parse_state(xml::attr(attrs, "STATE"), &what)?;
        disseminator.versionable = parse_bool(xml::attr(attrs, "VERSIONABLE"), true, &what)?;
        if empty {
            return Err(integrity(format!("{what} has no versions")));
        }

        loop {
            let (element, attrs, empty) = match self.next_node()? {
                Node::Close => break,
                Node::Open {
                    element,
                    attrs,
                    empty,
                } => (element, attrs, empty),
            };
            if xml::local_name(&element) != "disseminatorVersion" {
                if !empty {
                    self.skip()?;
                }
                continue;
            }
            let version = self.parse_disseminator_version(&attrs, empty)?;
            disseminator
                .push_version(version)
                .map_err(|e| integrity(e.to_string()))?;
        }

        if disseminator.is_empty() {
            return Err(integrity(format!("{what} has no versions")));
        }
        if self.object.disseminator(&id).is_some() {
            return Err(integrity(format!("{what} appears twice")));
        }
        self.object.put_disseminator(disseminator);
        Ok(())
    }

    fn parse_disseminator_version(
        &mut self,
        attrs: &[(String, String)],
        empty: bool,
    ) -> TranslationResult<DisseminatorVersion> {
        let version_id = xml::required_attr(attrs, "ID", "disseminatorVersion")?.to_string();
        let what = format!("disseminator version {version_id}");
        let bmech_pid = parse_pid(
            xml::required_attr(attrs, "BMECH_SERVICE_PID", "disseminatorVersion")?,
            &what,
        )?;
        let created = parse_created(xml::attr(attrs, "CREATED"), &what)?;
        let mut binding_map = BindingMap::default();

        if !empty {
            loop {
                let (element, inner, empty) = match self.next_node()? {
                    Node::Close => break,
                    Node::Open {
                        element,
                        attrs,
                        empty,
                    } => (element, attrs, empty),
                };
                if xml::local_name(&element) != "serviceInputMap" {
                    if !empty {
                        self.skip()?;
                    }
                    continue;
                }
                binding_map.label = xml::attr(&inner, "LABEL").unwrap_or_default().to_string();
                if !empty {
                    binding_map.bindings = self.parse_bindings()?;
                }
            }
        }

        Ok(DisseminatorVersion {
            version_id,
            label: xml::attr(attrs, "LABEL").unwrap_or_default().to_string(),
            bmech_pid,
            created,
            binding_map,
        })
    }

    fn parse_bindings(&mut self) -> TranslationResult<Vec<Binding>> {
        let mut bindings = Vec::new();
        loop {
            let (element, attrs, empty) = match self.next_node()? {
                Node::Close => return Ok(bindings),
                Node::Open {
                    element,
                    attrs,
                    empty,
                } => (element, attrs, empty),
            };
            if !empty {
                self.skip()?;
            }
            if xml::local_name(&element) != "datastreamBinding" {
                continue;
            }
            let key = xml::required_attr(&attrs, "KEY", "datastreamBinding")?;
            let order = match xml::attr(&attrs, "ORDER") {
                Some(o) if !o.trim().is_empty() => o
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| integrity(format!("binding {key}: bad ORDER '{o}'")))?,
                _ => 0,
            };
            bindings.push(
                Binding::new(key, xml::attr(&attrs, "DATASTREAM_ID").unwrap_or_default())
                    .with_label(xml::attr(&attrs, "LABEL").unwrap_or_default())
                    .with_order(order),
            );
        }
    }
}
