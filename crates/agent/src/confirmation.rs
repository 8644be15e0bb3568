//! Operator confirmation detection

/// Replies that grant approval for the current cycle
pub const CONFIRMATIONS: &[&str] = &[
    "yes", "y", "confirm", "approve", "go ahead", "do it", "ok", "proceed", "sure", "yeah",
    "yep",
];

/// True when `text` is a bare affirmative reply.
///
/// Whitespace is trimmed, case is ignored and any run of trailing `!`, `.`
/// or `,` is dropped before an exact match against [`CONFIRMATIONS`].
/// Anything longer or hedged ("I guess so", "yes but wait") is not a
/// confirmation.
pub fn is_confirmation(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    let normalized = normalized.trim_end_matches(['!', '.', ',']);
    CONFIRMATIONS.contains(&normalized)
}
