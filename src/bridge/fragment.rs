//! Outbound text splitting.

/// Longest chat fragment sent to the game, in characters.
pub const MAX_FRAGMENT_CHARS: usize = 255;

/// Split `text` into consecutive fragments of at most `max_chars` characters.
///
/// Splits on character boundaries only, so the fragments concatenate back to
/// `text`. Empty text yields no fragments.
pub fn split_fragments(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            fragments.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        fragments.push(&text[start..]);
    }
    fragments
}
