//! Persisted form of the intermediate automata.
//!
//! A compact binary encoding used for inspection and cross-tool handoff.
//! Round-trips are exact: nodes, edges, outputs, and metadata come back
//! structurally identical, ids included.

use crate::automata::Automata;

/// Encoding version, bumped on any incompatible model change.
pub const FORMAT_VERSION: u16 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("failed to encode automata: {0}")]
    Encode(#[source] postcard::Error),

    #[error("failed to decode automata: {0}")]
    Decode(#[source] postcard::Error),

    #[error("unsupported automata format version {found} (expected {FORMAT_VERSION})")]
    Version { found: u16 },
}

/// Encode an automata, prefixed with the format version.
pub fn to_bytes(automata: &Automata) -> Result<Vec<u8>, SerializeError> {
    let mut bytes = postcard::to_allocvec(&FORMAT_VERSION).map_err(SerializeError::Encode)?;
    let body = postcard::to_allocvec(automata).map_err(SerializeError::Encode)?;
    bytes.extend(body);
    Ok(bytes)
}

/// Decode an automata produced by [`to_bytes`].
pub fn from_bytes(bytes: &[u8]) -> Result<Automata, SerializeError> {
    let (version, rest) =
        postcard::take_from_bytes::<u16>(bytes).map_err(SerializeError::Decode)?;
    if version != FORMAT_VERSION {
        return Err(SerializeError::Version { found: version });
    }
    postcard::from_bytes(rest).map_err(SerializeError::Decode)
}
