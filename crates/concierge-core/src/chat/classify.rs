//! Reply classification.
//!
//! Tags an outgoing reply with a descriptive [`ReplyKind`] and an optional
//! confidence for client display (icon, badge). Classification is purely
//! cosmetic: it never alters how a request is handled.

use concierge_types::turn::ReplyKind;

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOrigin {
    /// A short greeting answered by the provider.
    Greeting,
    /// Matched a static FAQ entry (upstream classification source).
    Faq,
    /// Produced by retrieval-augmented generation (upstream source).
    Rag,
    /// An ordinary provider completion.
    Provider,
    /// The canned reply substituted after a provider failure.
    Fallback,
}

/// A reply's display tag and clamped confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub kind: ReplyKind,
    pub confidence: Option<f64>,
}

/// Tag a reply by origin, clamping any supplied confidence to [0, 1].
pub fn classify(origin: ReplyOrigin, confidence: Option<f64>) -> Classification {
    let kind = match origin {
        ReplyOrigin::Greeting => ReplyKind::Greeting,
        ReplyOrigin::Faq => ReplyKind::Faq,
        ReplyOrigin::Rag => ReplyKind::Rag,
        ReplyOrigin::Provider => ReplyKind::Bot,
        ReplyOrigin::Fallback => ReplyKind::Error,
    };
    Classification {
        kind,
        confidence: confidence.map(|c| c.clamp(0.0, 1.0)),
    }
}

/// Whether a message is a bare greeting ("hi", "hello there", ...).
///
/// Used only to pick the `greeting` display tag for a provider reply.
pub fn is_greeting(message: &str) -> bool {
    let normalized = message.trim().trim_end_matches(['!', '.', '?']).to_lowercase();
    if normalized.split_whitespace().count() > 3 {
        return false;
    }
    const GREETINGS: &[&str] = &[
        "hi", "hello", "hey", "hi there", "hello there", "hey there", "good morning",
        "good afternoon", "good evening", "howdy",
    ];
    GREETINGS.contains(&normalized.as_str())
}
