//! Conversation title derivation
//!
//! Titles come from the first user input; conversations opened through the
//! explicit new-chat action get a placeholder instead.

/// Title given to conversations created before any input exists
pub const PLACEHOLDER_TITLE: &str = "New Conversation";

/// Longest title kept verbatim, in characters
pub const MAX_TITLE_CHARS: usize = 50;

/// Marker appended to truncated titles
pub const ELLIPSIS: &str = "...";

/// Derive a conversation title from the first user message.
///
/// Inputs up to [`MAX_TITLE_CHARS`] characters are used as-is. Longer inputs
/// keep their first [`MAX_TITLE_CHARS`] characters followed by [`ELLIPSIS`].
/// Counting is per `char`, so multi-byte text is never cut mid-character.
pub fn derive_title(text: &str) -> String {
    let mut chars = text.char_indices();
    match chars.nth(MAX_TITLE_CHARS) {
        Some((cut, _)) => {
            let mut title = text.get(..cut).unwrap_or(text).to_string();
            title.push_str(ELLIPSIS);
            title
        }
        None => text.to_string(),
    }
}
