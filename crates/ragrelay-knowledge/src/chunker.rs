//! Passage splitting.

/// A blank-line delimited block of the knowledge text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Passage<'a> {
    /// Position among the non-empty blocks, in document order.
    pub position: usize,
    /// Block text exactly as it appears in the source.
    pub text: &'a str,
}

/// Split `text` on blank lines, dropping whitespace-only blocks.
///
/// Runs of more than two line breaks still produce a single boundary since
/// the empty blocks between them are discarded.
pub fn split_passages(text: &str) -> Vec<Passage<'_>> {
    text.split("\n\n")
        .flat_map(|block| block.split("\r\n\r\n"))
        .filter(|block| !block.trim().is_empty())
        .enumerate()
        .map(|(position, text)| Passage { position, text })
        .collect()
}
