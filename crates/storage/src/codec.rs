//! JSON encoding shared by every backend.
//!
//! Session payloads carry a format version; anything that does not decode
//! under the current version reads back as absent.

use donish_core::model::{Question, SessionState};
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

pub const SESSION_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    state: &'a SessionState,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    state: SessionState,
}

/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_state(state: &SessionState) -> Result<String, StorageError> {
    serde_json::to_string(&EnvelopeRef {
        version: SESSION_FORMAT_VERSION,
        state,
    })
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

#[must_use]
pub fn decode_state(raw: &str) -> Option<SessionState> {
    let envelope: Envelope = serde_json::from_str(raw).ok()?;
    (envelope.version == SESSION_FORMAT_VERSION).then_some(envelope.state)
}

/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_question(question: &Question) -> Result<String, StorageError> {
    serde_json::to_string(question).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Bank entries are authoritative, so a bad payload is an error rather than absence.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the payload is not a valid question.
pub fn decode_question(raw: &str) -> Result<Question, StorageError> {
    let question: Question =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    question
        .validate()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(question)
}
