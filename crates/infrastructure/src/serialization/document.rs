//! Encoding and decoding of JSON documents stored on disk.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// A document could not be written or read.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The value could not be encoded.
    #[error("cannot encode document: {0}")]
    Encode(#[source] serde_json::Error),

    /// The file content is not a valid document of the expected type.
    #[error("malformed document at line {line}, column {column}: {source}")]
    Decode {
        /// Line of the first error (1-based).
        line: usize,
        /// Column of the first error (1-based).
        column: usize,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
}

/// Encodes a value as a file document.
///
/// # Errors
///
/// Returns `DocumentError::Encode` if the value cannot be represented as
/// JSON (for example a map with non-string keys).
pub fn encode_document<T: Serialize>(value: &T) -> Result<Vec<u8>, DocumentError> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"  "));
    value
        .serialize(&mut serializer)
        .map_err(DocumentError::Encode)?;
    buffer.push(b'\n');
    Ok(buffer)
}

/// Decodes a file document. An empty or whitespace-only file decodes as
/// `T::default()`.
///
/// # Errors
///
/// Returns `DocumentError::Decode` with the position of the first error.
pub fn decode_document<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, DocumentError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|source| DocumentError::Decode {
        line: source.line(),
        column: source.column(),
        source,
    })
}
