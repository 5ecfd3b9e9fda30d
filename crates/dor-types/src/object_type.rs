use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The role an object plays in the repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[default]
    DataObject,
    /// Declares an abstract service contract.
    BehaviorDefinition,
    /// Implements a behavior definition; carries the data contract.
    BehaviorMechanism,
    ContentModel,
}

impl ObjectType {
    /// RDF type name used in object properties and packaging headers.
    pub fn rdf_type(&self) -> &'static str {
        match self {
            Self::DataObject => "FedoraObject",
            Self::BehaviorDefinition => "FedoraBDefObject",
            Self::BehaviorMechanism => "FedoraBMechObject",
            Self::ContentModel => "FedoraCModelObject",
        }
    }

    pub fn from_rdf_type(value: &str) -> Result<Self, TypeError> {
        match value {
            "FedoraObject" => Ok(Self::DataObject),
            "FedoraBDefObject" => Ok(Self::BehaviorDefinition),
            "FedoraBMechObject" => Ok(Self::BehaviorMechanism),
            "FedoraCModelObject" => Ok(Self::ContentModel),
            other => Err(TypeError::InvalidObjectType(other.to_string())),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rdf_type())
    }
}
