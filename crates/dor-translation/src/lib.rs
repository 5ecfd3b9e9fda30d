//! Wire-format translation for digital objects.
//!
//! FOXML 1.1 is the canonical format and is both read and written. METS and
//! Atom are written only. Every translator is call-scoped: the
//! [`TranslatorRegistry`] builds a fresh instance per call, so a single
//! registry serves any number of threads.
//!
//! # Translation contexts
//!
//! A [`TranslationContext`] decides how locations of managed content are
//! rendered on output:
//!
//! | Context   | Managed content rendered as                         |
//! |-----------|-----------------------------------------------------|
//! | Store     | internal id, unchanged                              |
//! | Public    | `{public_base_url}/get/{pid}/{dsid}/{created}`      |
//! | Migration | `/get/{pid}/{dsid}/{created}`                       |
//! | Archival  | base64 bytes from the caller's [`ContentResolver`]  |
//!
//! Referenced URLs are emitted unchanged in every context.
//!
//! # Failure
//!
//! Readers return no partial object. Writers build the whole document in
//! memory and check it before the first byte reaches the sink.

pub mod atom;
mod audit;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod foxml;
pub mod location;
pub mod mets;
pub mod namespace;
mod render;
mod xml;

pub use atom::AtomSerializer;
pub use context::{
    ContentResolver, NoContentResolver, TranslationConfig, TranslationContext,
    SERVICE_PLACEHOLDER,
};
pub use dispatch::{Deserializer, Serializer, TranslatorRegistry};
pub use error::{check_encoding, TranslationError, TranslationResult};
pub use foxml::{FoxmlDeserializer, FoxmlSerializer};
pub use location::{classify, LocationKind};
pub use mets::MetsSerializer;
pub use xml::check_well_formed;
