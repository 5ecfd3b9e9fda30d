//! Namespace URIs and prefixes of the wire formats.

pub const FOXML_NS: &str = "info:fedora/fedora-system:def/foxml#";
pub const FOXML_PREFIX: &str = "foxml";
pub const AUDIT_NS: &str = "info:fedora/fedora-system:def/audit#";
pub const AUDIT_PREFIX: &str = "audit";
pub const METS_NS: &str = "http://www.loc.gov/METS/";
pub const METS_PREFIX: &str = "METS";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const THREAD_NS: &str = "http://purl.org/syndication/thread/1.0";

pub const MODEL_NS: &str = "info:fedora/fedora-system:def/model#";
pub const VIEW_NS: &str = "info:fedora/fedora-system:def/view#";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const PROP_STATE: &str = "info:fedora/fedora-system:def/model#state";
pub const PROP_LABEL: &str = "info:fedora/fedora-system:def/model#label";
pub const PROP_OWNER: &str = "info:fedora/fedora-system:def/model#ownerId";
pub const PROP_CREATED: &str = "info:fedora/fedora-system:def/model#createdDate";
pub const PROP_CONTENT_MODEL: &str = "info:fedora/fedora-system:def/model#contentModel";
pub const PROP_LAST_MODIFIED: &str = "info:fedora/fedora-system:def/view#lastModifiedDate";

pub const AUDIT_FORMAT_URI: &str = "info:fedora/fedora-system:format/xml.fedora.audit";

/// Declarations every FOXML document carries on its root. They are not
/// recorded in an object's namespace map since the serializer always emits
/// them.
pub const STANDARD_DECLARATIONS: &[(&str, &str)] =
    &[(FOXML_PREFIX, FOXML_NS), (AUDIT_PREFIX, AUDIT_NS)];

pub fn is_standard_declaration(prefix: &str, uri: &str) -> bool {
    STANDARD_DECLARATIONS
        .iter()
        .any(|(p, u)| *p == prefix && *u == uri)
}

/// Split a qualified name into prefix and local part.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// If `attr` is a namespace declaration, the prefix it declares (`""` for
/// the default namespace).
pub fn declared_prefix(attr: &str) -> Option<&str> {
    if attr == "xmlns" {
        Some("")
    } else {
        attr.strip_prefix("xmlns:")
    }
}

/// Stack of namespace scopes opened by structural elements.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Vec<(String, String)>>,
}

impl ScopeStack {
    pub fn push(&mut self, declarations: Vec<(String, String)>) {
        self.scopes.push(declarations);
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Innermost binding of `prefix`.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut stack = ScopeStack::default();
        stack.push(vec![("dc".into(), "outer".into())]);
        stack.push(vec![("dc".into(), "inner".into())]);
        assert_eq!(stack.resolve("dc"), Some("inner"));
        stack.pop();
        assert_eq!(stack.resolve("dc"), Some("outer"));
        assert_eq!(stack.resolve("x"), None);
    }

    #[test]
    fn qname_and_declarations() {
        assert_eq!(split_qname("dc:title"), (Some("dc"), "title"));
        assert_eq!(split_qname("title"), (None, "title"));
        assert_eq!(declared_prefix("xmlns:dc"), Some("dc"));
        assert_eq!(declared_prefix("xmlns"), Some(""));
        assert_eq!(declared_prefix("ID"), None);
        assert!(is_standard_declaration("foxml", FOXML_NS));
        assert!(!is_standard_declaration("foxml", "other"));
    }
}
