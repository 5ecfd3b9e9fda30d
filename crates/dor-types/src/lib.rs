//! Foundation types for the digital object repository (DOR).
//!
//! This crate provides the identity, classification, and temporal types used
//! throughout the DOR workspace. Every other DOR crate depends on `dor-types`.
//!
//! # Key Types
//!
//! - [`Pid`]: Persistent, globally unique object identifier (`namespace:id`)
//! - [`State`]: Lifecycle state shared by objects, datastreams, and disseminators
//! - [`ControlGroup`]: Storage mode of a datastream (inline, managed, referenced)
//! - [`ObjectType`]: Role of an object (data, behavior definition, mechanism, content model)
//! - [`Timestamp`]: Millisecond-precision UTC instant with the repository wire format

pub mod control_group;
pub mod error;
pub mod ident;
pub mod object_type;
pub mod pid;
pub mod state;
pub mod temporal;

pub use control_group::ControlGroup;
pub use error::TypeError;
pub use ident::{
    is_reserved_datastream_id, validate_component_id, AUDIT_DATASTREAM_ID, RESERVED_DATASTREAM_IDS,
    STAGING_SCHEME,
};
pub use object_type::ObjectType;
pub use pid::Pid;
pub use state::State;
pub use temporal::Timestamp;
