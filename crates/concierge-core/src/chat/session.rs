//! Session identifier resolution.
//!
//! Sessions are opaque UUID-v4 identifiers minted by the backend. A caller
//! may continue a session by echoing the id back; anything that is not a
//! well-formed v4 UUID is rejected rather than silently replaced, so a
//! widget bug cannot fork a conversation.

use concierge_types::error::InvalidSessionId;
use uuid::{Uuid, Version};

/// Resolve a session id from an optional candidate.
///
/// A present candidate must parse as a version-4 UUID; an absent one yields
/// a fresh cryptographically random id. Pure function, no I/O.
pub fn resolve_session(candidate: Option<&str>) -> Result<Uuid, InvalidSessionId> {
    match candidate {
        Some(raw) => validate_session_id(raw),
        None => Ok(Uuid::new_v4()),
    }
}

/// Validate that a string is a well-formed UUID-v4 session id.
pub fn validate_session_id(raw: &str) -> Result<Uuid, InvalidSessionId> {
    let id: Uuid = raw
        .parse()
        .map_err(|_| InvalidSessionId(raw.to_string()))?;
    if id.get_version() != Some(Version::Random) {
        return Err(InvalidSessionId(raw.to_string()));
    }
    Ok(id)
}
