//! Prompt composition.
//!
//! Assembles the ordered message sequence sent to the provider. The order
//! is fixed: one system policy message, the history window as alternating
//! user/assistant pairs oldest first, system context notes derived from
//! the request context, and the new user message last. These groups are
//! never reordered or interleaved.

use concierge_types::llm::Message;
use concierge_types::turn::{Turn, TurnContext};

/// Standing instructions for the assistant's role and behavior.
pub const SYSTEM_POLICY: &str = "You are a helpful customer support assistant. \
Answer the user's question accurately and concisely. If you do not have enough \
information to answer, say so politely and suggest contacting the support team. \
Never invent product details, prices, or policies.";

/// Build the provider message sequence for one chat request.
///
/// The caller's history window already bounds the turn count; no further
/// truncation happens here. Should a provider ever impose a hard input
/// limit, the policy is to drop the oldest history turns first, never the
/// system policy or the new message.
pub fn compose(history: &[Turn], context: Option<&TurnContext>, new_message: &str) -> Vec<Message> {
    // 1 policy + 2 per turn + up to 3 context notes + the new message
    let mut messages = Vec::with_capacity(history.len() * 2 + 5);

    messages.push(Message::system(SYSTEM_POLICY));

    for turn in history {
        messages.push(Message::user(turn.user_message.clone()));
        messages.push(Message::assistant(turn.ai_response.clone()));
    }

    if let Some(ctx) = context {
        messages.extend(context_notes(ctx));
    }

    messages.push(Message::user(new_message));

    messages
}

/// Derive system-role context notes from the supplied request context.
///
/// Each known field becomes its own note; unknown extras are ignored here
/// (they are persisted with the turn but carry no prompt meaning).
fn context_notes(ctx: &TurnContext) -> Vec<Message> {
    let mut notes = Vec::new();
    if let Some(page) = &ctx.page {
        notes.push(Message::system(format!(
            "The user is currently on the page: {page}"
        )));
    }
    if let Some(agent) = &ctx.user_agent {
        notes.push(Message::system(format!("The user's client is: {agent}")));
    }
    if let Some(referrer) = &ctx.referrer {
        notes.push(Message::system(format!(
            "The user arrived from: {referrer}"
        )));
    }
    notes
}
