//! Mutation layer for the digital object repository.
//!
//! [`Management`] is the single entry point clients use to ingest, export,
//! read and change objects. It ties together the object and content stores,
//! the authorization gate, the translator registry and the mechanism data
//! contracts.
//!
//! # Quick Start
//!
//! ```rust
//! use dor_gate::CallContext;
//! use dor_management::{Management, NewDatastream, RepositoryConfig};
//!
//! let repo = Management::in_memory(RepositoryConfig::default()).unwrap();
//! let ctx = CallContext::new("fedoraAdmin");
//! let doc = r#"<foxml:digitalObject VERSION="1.1" PID="demo:1"
//!     xmlns:foxml="info:fedora/fedora-system:def/foxml#">
//!   <foxml:objectProperties>
//!     <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Active"/>
//!   </foxml:objectProperties>
//! </foxml:digitalObject>"#;
//! let pid = repo
//!     .ingest(&ctx, &mut doc.as_bytes(), "foxml1.1", "UTF-8", "created")
//!     .unwrap();
//! let id = repo
//!     .add_datastream(&ctx, &pid, NewDatastream::inline("DC", "<dc>A</dc>"))
//!     .unwrap();
//! assert_eq!(id, "DC");
//! ```
//!
//! # Rules
//!
//! 1. Every mutation holds one writer handle for its pid for the whole call
//!    and commits at most once.
//! 2. Every committed mutation appends exactly one audit record.
//! 3. The `AUDIT` datastream is never created, modified or purged by
//!    clients.
//! 4. A supplied checksum must match the content that is finally stored.
//! 5. A datastream cannot lose its last version while any disseminator, in
//!    any state or version, binds it.

pub mod config;
mod content;
pub mod contract;
mod datastream;
mod disseminator;
pub mod error;
pub mod fetch;
mod repository;
pub mod request;

pub use config::RepositoryConfig;
pub use contract::{
    ContractResolver, DataContract, InputRule, StoreContractResolver, INPUT_SPEC_DATASTREAM,
};
pub use datastream::CHECKSUM_VALIDATION_ERROR;
pub use error::{Fault, ManagementError, ManagementResult};
pub use fetch::{ContentFetcher, NoFetcher, StaticFetcher};
pub use repository::Management;
pub use request::{
    DatastreamSnapshot, DatastreamUpdate, DisseminatorSnapshot, DisseminatorUpdate,
    LocationUpdate, NewDatastream, NewDisseminator,
};

pub use dor_gate::CallContext;
pub use dor_store::ReadView;
pub use dor_translation::TranslationContext;
