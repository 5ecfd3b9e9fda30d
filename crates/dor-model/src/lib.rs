//! The versioned object graph of the digital object repository.
//!
//! A [`DigitalObject`] owns two id-keyed collections of version histories,
//! [`Datastream`]s (content) and [`Disseminator`]s (service bindings), plus
//! an append-only [`AuditRecord`] log. Histories only grow by appending
//! versions; a purge removes a bounded version range.
//!
//! # Invariants
//!
//! 1. Every version of a datastream carries content of the datastream's
//!    [`ControlGroup`](dor_types::ControlGroup).
//! 2. Version ids are unique within a history and derived from the
//!    component id plus an ordinal (`DC.0`, `DC.1`, ...).
//! 3. Versions are ordered by creation date and never edited in place.
//! 4. Every binding in a disseminator's binding map names a datastream that
//!    exists on the same object (see [`validation`]).
//! 5. The `AUDIT` id is never a client datastream; provenance lives in the
//!    audit log.

pub mod audit;
pub mod datastream;
pub mod disseminator;
pub mod error;
pub mod legacy;
pub mod object;
pub mod validation;

pub use audit::AuditRecord;
pub use datastream::{Content, Datastream, DatastreamVersion, ManagedContent};
pub use disseminator::{Binding, BindingMap, Disseminator, DisseminatorVersion};
pub use error::{ModelError, ModelResult};
pub use legacy::{LegacyMetadata, MetadataClass};
pub use object::{DigitalObject, DEFAULT_BINDING_TARGET};
pub use validation::{IntegrityReport, IntegrityValidator, Violation, ViolationKind};
