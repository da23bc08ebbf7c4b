//! Estimated reading time for a post body.

use crate::types::ContentBlock;

/// Reading speed used for the estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Total whitespace-delimited words across every fragment of every block.
///
/// Headings are not counted.
pub fn word_count(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .flat_map(|block| &block.body)
        .map(|fragment| fragment.text.split_whitespace().count())
        .sum()
}

/// Minutes needed to read `content`, rounded up. Empty content reads in 0.
pub fn reading_time(content: &[ContentBlock]) -> usize {
    word_count(content).div_ceil(WORDS_PER_MINUTE)
}
