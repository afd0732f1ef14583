/// Return the longest prefix of `text` holding at most `max_chars` characters.
///
/// Cuts on a `char` boundary so multi-byte text never panics.
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text.get(..byte_index).unwrap_or(text),
        None => text,
    }
}
