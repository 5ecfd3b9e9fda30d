/// Errors from translating objects to and from wire documents.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    /// The document (or the object being rendered) is structurally invalid.
    #[error("object integrity: {0}")]
    ObjectIntegrity(String),

    /// No translator is registered for this format and direction.
    #[error("unsupported translation: no {direction} registered for format '{format}'")]
    UnsupportedTranslation {
        format: String,
        direction: &'static str,
    },

    /// Only UTF-8 documents are read and written.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("stream read failed: {0}")]
    StreamRead(#[source] std::io::Error),

    #[error("stream write failed: {0}")]
    StreamWrite(#[source] std::io::Error),
}

impl TranslationError {
    pub(crate) fn integrity(msg: impl Into<String>) -> Self {
        Self::ObjectIntegrity(msg.into())
    }
}

/// Result alias for translation operations.
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Reject any encoding other than UTF-8.
pub fn check_encoding(encoding: &str) -> TranslationResult<()> {
    match encoding.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Ok(()),
        _ => Err(TranslationError::UnsupportedEncoding(encoding.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_utf8_is_accepted() {
        assert!(check_encoding("UTF-8").is_ok());
        assert!(check_encoding("utf8").is_ok());
        assert!(matches!(
            check_encoding("ISO-8859-1"),
            Err(TranslationError::UnsupportedEncoding(_))
        ));
    }
}
