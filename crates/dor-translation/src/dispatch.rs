use std::collections::HashMap;
use std::io::{Read, Write};

use tracing::debug;

use dor_model::DigitalObject;

use crate::atom::{self, AtomSerializer};
use crate::context::{ContentResolver, TranslationConfig, TranslationContext};
use crate::error::{check_encoding, TranslationError, TranslationResult};
use crate::foxml::{self, FoxmlDeserializer, FoxmlSerializer};
use crate::mets::{self, MetsSerializer};

/// Reads a wire document into an object.
pub trait Deserializer {
    /// Replace `target` with the object read from `input`. On failure
    /// `target` is left untouched.
    fn deserialize(
        &mut self,
        input: &mut dyn Read,
        target: &mut DigitalObject,
        context: TranslationContext,
    ) -> TranslationResult<()>;
}

/// Writes an object as a wire document.
pub trait Serializer {
    /// Build the whole document, validate it, then write it to `sink`.
    /// Nothing is written on failure.
    fn serialize(
        &mut self,
        object: &DigitalObject,
        sink: &mut dyn Write,
        context: TranslationContext,
        resolver: &dyn ContentResolver,
    ) -> TranslationResult<()>;
}

pub type DeserializerFactory = fn(&TranslationConfig) -> Box<dyn Deserializer>;
pub type SerializerFactory = fn(&TranslationConfig) -> Box<dyn Serializer>;

fn foxml_deserializer(config: &TranslationConfig) -> Box<dyn Deserializer> {
    Box::new(FoxmlDeserializer::new(config.clone()))
}

fn foxml_serializer(config: &TranslationConfig) -> Box<dyn Serializer> {
    Box::new(FoxmlSerializer::new(config.clone()))
}

fn mets_serializer(config: &TranslationConfig) -> Box<dyn Serializer> {
    Box::new(MetsSerializer::new(config.clone()))
}

fn atom_serializer(config: &TranslationConfig) -> Box<dyn Serializer> {
    Box::new(AtomSerializer::new(config.clone()))
}

#[derive(Clone, Copy)]
struct Formats {
    deserializer: Option<DeserializerFactory>,
    serializer: Option<SerializerFactory>,
}

/// Format name to translator factories.
///
/// Every call builds a fresh translator, so one registry can serve any
/// number of threads.
pub struct TranslatorRegistry {
    config: TranslationConfig,
    formats: HashMap<String, Formats>,
}

impl TranslatorRegistry {
    /// A registry with no formats.
    pub fn empty(config: TranslationConfig) -> Self {
        Self {
            config,
            formats: HashMap::new(),
        }
    }

    /// A registry with the built-in formats: `foxml1.1` (alias `foxml`),
    /// and serialize-only `mets` and `atom`.
    pub fn new(config: TranslationConfig) -> Self {
        let mut registry = Self::empty(config);
        for name in [foxml::FORMAT, foxml::FORMAT_ALIAS] {
            registry.register(name, Some(foxml_deserializer), Some(foxml_serializer));
        }
        registry.register(mets::FORMAT, None, Some(mets_serializer));
        registry.register(atom::FORMAT, None, Some(atom_serializer));
        registry
    }

    pub fn register(
        &mut self,
        format: &str,
        deserializer: Option<DeserializerFactory>,
        serializer: Option<SerializerFactory>,
    ) {
        self.formats.insert(
            format.to_string(),
            Formats {
                deserializer,
                serializer,
            },
        );
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    /// Registered format names, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn can_deserialize(&self, format: &str) -> bool {
        self.formats
            .get(format)
            .is_some_and(|f| f.deserializer.is_some())
    }

    pub fn can_serialize(&self, format: &str) -> bool {
        self.formats
            .get(format)
            .is_some_and(|f| f.serializer.is_some())
    }

    pub fn deserialize(
        &self,
        input: &mut dyn Read,
        target: &mut DigitalObject,
        format: &str,
        encoding: &str,
        context: TranslationContext,
    ) -> TranslationResult<()> {
        let factory = self
            .formats
            .get(format)
            .and_then(|f| f.deserializer)
            .ok_or_else(|| TranslationError::UnsupportedTranslation {
                format: format.to_string(),
                direction: "deserializer",
            })?;
        check_encoding(encoding)?;
        debug!(format, %context, "deserializing");
        factory(&self.config).deserialize(input, target, context)
    }

    pub fn serialize(
        &self,
        object: &DigitalObject,
        sink: &mut dyn Write,
        format: &str,
        encoding: &str,
        context: TranslationContext,
        resolver: &dyn ContentResolver,
    ) -> TranslationResult<()> {
        let factory = self
            .formats
            .get(format)
            .and_then(|f| f.serializer)
            .ok_or_else(|| TranslationError::UnsupportedTranslation {
                format: format.to_string(),
                direction: "serializer",
            })?;
        check_encoding(encoding)?;
        debug!(format, %context, "serializing");
        factory(&self.config).serialize(object, sink, context, resolver)
    }
}

impl Default for TranslatorRegistry {
    fn default() -> Self {
        Self::new(TranslationConfig::default())
    }
}
