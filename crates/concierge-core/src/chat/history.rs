//! History window retrieval.
//!
//! Fetches the bounded recent slice of a session's prior turns that goes
//! into a new prompt. The window bounds prompt size independent of how
//! long the session has run; a storage failure here degrades to an empty
//! window rather than failing the request.

use concierge_types::turn::Turn;
use tracing::warn;
use uuid::Uuid;

use super::repository::ConversationRepository;

/// Fetch the most recent `window` turns of a session, ascending by time.
///
/// Empty for unknown or new sessions. On a repository error the window is
/// empty too: the reply is generated without history, and the failure is
/// logged instead of propagated.
pub async fn fetch_window<R: ConversationRepository>(
    repo: &R,
    session_id: &Uuid,
    window: u32,
) -> Vec<Turn> {
    match repo.latest_window(session_id, window).await {
        Ok(turns) => turns,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "history window fetch failed, continuing without history");
            Vec::new()
        }
    }
}
