//! Position-derived word ids: `"{line}-{wordIndex}-{line * wordIndex}"`.
//!
//! The third segment is the sort key. It is a product, so distinct positions
//! can share a key (`2-3-6` and `3-2-6`); ties keep insertion order.

/// Build the id of the word at `word_index` on subtitle `line`.
pub fn word_id(line: u32, word_index: u32) -> String {
    format!(
        "{}-{}-{}",
        line,
        word_index,
        u64::from(line) * u64::from(word_index)
    )
}

/// Sort key of an id (its third segment). `None` for malformed ids.
pub fn sequential_id(id: &str) -> Option<u64> {
    id.split('-').nth(2)?.parse().ok()
}

/// Key used to order marked items; malformed ids sort last.
pub(crate) fn sort_key(id: &str) -> u64 {
    sequential_id(id).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_embeds_position_and_product() {
        assert_eq!(word_id(1, 2), "1-2-2");
        assert_eq!(word_id(7, 0), "7-0-0");
        assert_eq!(sequential_id("4-5-20"), Some(20));
    }

    #[test]
    fn swapped_positions_share_a_sort_key() {
        assert_eq!(
            sequential_id(&word_id(2, 3)),
            sequential_id(&word_id(3, 2))
        );
    }

    #[test]
    fn malformed_ids_have_no_sequential_id() {
        assert_eq!(sequential_id("word"), None);
        assert_eq!(sequential_id("1-2-x"), None);
        assert_eq!(sort_key("1-2"), u64::MAX);
    }

    #[test]
    fn large_positions_do_not_overflow() {
        assert_eq!(
            sequential_id(&word_id(u32::MAX, 2)),
            Some(u64::from(u32::MAX) * 2)
        );
    }
}
